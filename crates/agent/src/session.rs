//! Session Manager
//!
//! Owns one call from connect to teardown:
//!
//! ```text
//! Connecting ──start──▶ Active ──media ended──▶ Ending ──persisted──▶ Closed
//!      └──────────────── media ended ────────────▲
//! ```
//!
//! Teardown runs exactly once no matter how many disconnect signals
//! arrive, and persistence never blocks it for longer than the configured
//! store timeout.

use futures::StreamExt;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use receptionist_config::{AgentConfig, Settings, TurnConfig};
use receptionist_core::{
    AudioFrame, CallRecord, CallRecordStore, CallSession, CallState, LanguageModel,
    MediaTransport, SpeechToText, TextToSpeech, TranscriptResult, TransportEvent,
};
use receptionist_tools::ToolRegistry;

use crate::call_tracker::CallTracker;
use crate::conversation::{ConversationContext, TranscriptPolicy};
use crate::turn::{TurnCoordinator, TurnEvent, TurnServices};
use crate::AgentError;

/// Inbound audio frames buffered ahead of the recognizer
const AUDIO_BUFFER_FRAMES: usize = 256;

const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;

/// Collaborators shared by every call
#[derive(Clone)]
pub struct CallServices {
    pub llm: Arc<dyn LanguageModel>,
    pub stt: Arc<dyn SpeechToText>,
    pub tts: Arc<dyn TextToSpeech>,
    /// Call log gateway; `None` means records are logged but not stored
    pub store: Option<Arc<dyn CallRecordStore>>,
}

/// Per-call configuration
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub agent: AgentConfig,
    pub turn: TurnConfig,
    pub store_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            agent: AgentConfig::default(),
            turn: TurnConfig::default(),
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
        }
    }
}

impl SessionOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            agent: settings.agent.clone(),
            turn: settings.turn.clone(),
            store_timeout: Duration::from_millis(settings.persistence.store_timeout_ms),
        }
    }
}

/// Session events
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Started { call_id: String, caller_id: String },
    StateChanged { old: CallState, new: CallState },
    PartialTranscript { text: String },
    FinalTranscript { text: String },
    /// Record produced at teardown, whether or not it was stored
    Finalized { record: CallRecord },
    Ended { reason: String },
}

/// One live call
pub struct SessionManager {
    session: RwLock<CallSession>,
    context: Arc<ConversationContext>,
    tracker: Arc<CallTracker>,
    turns: TurnCoordinator,
    stt: Arc<dyn SpeechToText>,
    transport: Arc<dyn MediaTransport>,
    store: Option<Arc<dyn CallRecordStore>>,
    options: SessionOptions,
    finalized: AtomicBool,
    audio_tx: Mutex<Option<mpsc::Sender<AudioFrame>>>,
    shutdown: CancellationToken,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl SessionManager {
    pub fn new(
        call_id: impl Into<String>,
        caller_id: Option<String>,
        transport: Arc<dyn MediaTransport>,
        services: CallServices,
        tools: Arc<ToolRegistry>,
        options: SessionOptions,
    ) -> Arc<Self> {
        let session = CallSession::new(call_id, caller_id);
        let policy = TranscriptPolicy::from_config(&options.agent);
        let context = Arc::new(ConversationContext::new(
            options.agent.system_prompt.clone(),
            tools.definitions(),
        ));
        let tracker = Arc::new(CallTracker::new(
            session.call_id.clone(),
            session.caller_id.clone(),
            policy,
        ));
        let turns = TurnCoordinator::new(
            session.call_id.clone(),
            Arc::clone(&context),
            Arc::clone(&tracker),
            TurnServices {
                llm: services.llm,
                tts: services.tts,
                transport: Arc::clone(&transport),
                tools,
            },
            options.turn.clone(),
            options.agent.repeat_prompt.clone(),
        );
        let (event_tx, _) = broadcast::channel(100);

        Arc::new(Self {
            session: RwLock::new(session),
            context,
            tracker,
            turns,
            stt: services.stt,
            transport,
            store: services.store,
            options,
            finalized: AtomicBool::new(false),
            audio_tx: Mutex::new(None),
            shutdown: CancellationToken::new(),
            event_tx,
        })
    }

    /// Activate the call: start recognition and greet the caller
    pub async fn start(self: &Arc<Self>) -> Result<(), AgentError> {
        if !self.transition(CallState::Active) {
            return Err(AgentError::Session(format!(
                "cannot start call in state {}",
                self.state()
            )));
        }

        let (call_id, caller_id) = {
            let session = self.session.read();
            (session.call_id.clone(), session.caller_id.clone())
        };
        tracing::info!(call_id = %call_id, caller_id = %caller_id, "Call session started");
        metrics::counter!("receptionist_calls_started_total").increment(1);
        self.emit(SessionEvent::Started { call_id, caller_id });

        self.spawn_recognizer();
        self.turns.greet(&self.options.agent.greeting_instruction).await
    }

    /// Forward inbound caller audio to the recognizer
    pub async fn on_audio_frame(&self, frame: AudioFrame) {
        let sender = self.audio_tx.lock().clone();
        match sender {
            Some(sender) => {
                if sender.send(frame).await.is_err() {
                    tracing::debug!(call_id = %self.call_id(), "Recognizer input closed, dropping audio");
                }
            },
            None => tracing::trace!(call_id = %self.call_id(), "Audio before start or after end, dropping"),
        }
    }

    /// Route a recognizer result
    ///
    /// Partial results only drive barge-in; final results become caller turns.
    pub async fn on_transcript(&self, result: TranscriptResult) {
        if result.is_blank() {
            return;
        }
        if result.is_final {
            self.emit(SessionEvent::FinalTranscript {
                text: result.text.clone(),
            });
            if let Err(e) = self.turns.on_final_transcript(&result.text).await {
                tracing::warn!(call_id = %self.call_id(), error = %e, "Dropped caller utterance");
            }
        } else {
            self.emit(SessionEvent::PartialTranscript {
                text: result.text.clone(),
            });
            self.turns.on_partial_transcript(&result.text).await;
        }
    }

    /// Tear the call down and produce its record
    ///
    /// Idempotent: only the first call finalizes and returns the record,
    /// later calls return `None`. Persistence failures and timeouts are
    /// logged and never propagated.
    pub async fn on_media_stream_ended(&self, reason: &str) -> Option<CallRecord> {
        if self
            .finalized
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!(call_id = %self.call_id(), reason, "Call already finalized");
            return None;
        }

        self.transition(CallState::Ending);
        self.shutdown.cancel();
        self.audio_tx.lock().take();
        self.turns.shutdown();
        if let Err(e) = self.transport.close().await {
            tracing::debug!(call_id = %self.call_id(), error = %e, "Transport close failed");
        }

        let record = self.tracker.finalize();
        tracing::info!(
            call_id = %record.call_id,
            caller_id = %record.caller_id,
            intent = %record.detected_intent,
            duration_secs = record.duration_secs,
            reason,
            "Call finalized"
        );
        metrics::counter!("receptionist_calls_finalized_total").increment(1);
        metrics::histogram!("receptionist_call_duration_seconds").record(record.duration_secs as f64);

        self.persist(&record).await;

        self.transition(CallState::Closed);
        self.emit(SessionEvent::Finalized {
            record: record.clone(),
        });
        self.emit(SessionEvent::Ended {
            reason: reason.to_string(),
        });
        Some(record)
    }

    /// Drive the call from transport events until it ends
    ///
    /// Also ends the call when playback finds the transport closed. Returns
    /// `None` when the call was finalized elsewhere (operator hang-up,
    /// server shutdown).
    pub async fn run(
        self: Arc<Self>,
        mut events: mpsc::Receiver<TransportEvent>,
    ) -> Option<CallRecord> {
        let mut turn_events = self.turns.subscribe();
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::debug!(call_id = %self.call_id(), "Call finalized elsewhere, stopping event loop");
                    return None;
                },
                event = events.recv() => match event {
                    Some(TransportEvent::AudioReceived(frame)) => self.on_audio_frame(frame).await,
                    Some(TransportEvent::Connected { caller_id }) => {
                        tracing::debug!(call_id = %self.call_id(), ?caller_id, "Transport connected");
                    },
                    Some(TransportEvent::Disconnected { reason }) => {
                        return self.on_media_stream_ended(&reason).await;
                    },
                    None => return self.on_media_stream_ended("transport event channel closed").await,
                },
                event = turn_events.recv() => match event {
                    Ok(TurnEvent::TransportClosed) => {
                        return self.on_media_stream_ended("transport closed").await;
                    },
                    Ok(_) => {},
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(call_id = %self.call_id(), skipped, "Turn events lagged");
                    },
                    Err(broadcast::error::RecvError::Closed) => {
                        return self.on_media_stream_ended("turn coordinator closed").await;
                    },
                },
            }
        }
    }

    fn spawn_recognizer(self: &Arc<Self>) {
        let (tx, rx) = mpsc::channel(AUDIO_BUFFER_FRAMES);
        *self.audio_tx.lock() = Some(tx);
        let session = Arc::clone(self);
        tokio::spawn(async move { session.consume_transcripts(rx).await });
    }

    /// Process recognizer output one result at a time, in order
    async fn consume_transcripts(self: Arc<Self>, audio: mpsc::Receiver<AudioFrame>) {
        let stt = Arc::clone(&self.stt);
        let mut results = stt.transcribe_stream(Box::pin(ReceiverStream::new(audio)));
        loop {
            let next = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                next = results.next() => next,
            };
            match next {
                Some(Ok(result)) => self.on_transcript(result).await,
                Some(Err(e)) => {
                    tracing::warn!(call_id = %self.call_id(), error = %e, "Speech recognition error");
                },
                None => break,
            }
        }
        tracing::debug!(call_id = %self.call_id(), stt = stt.model_name(), "Transcript consumer stopped");
    }

    async fn persist(&self, record: &CallRecord) {
        let Some(store) = &self.store else {
            tracing::warn!(
                call_id = %record.call_id,
                "No call log store configured, call record not persisted"
            );
            metrics::counter!("receptionist_call_records_persisted_total", "outcome" => "skipped")
                .increment(1);
            return;
        };

        let timeout = self.options.store_timeout;
        let outcome = match tokio::time::timeout(timeout, store.store(record)).await {
            Ok(Ok(())) => {
                tracing::info!(
                    call_id = %record.call_id,
                    backend = store.backend_name(),
                    "Call record persisted"
                );
                "ok"
            },
            Ok(Err(e)) => {
                tracing::error!(call_id = %record.call_id, error = %e, "Failed to persist call record");
                "error"
            },
            Err(_) => {
                tracing::error!(
                    call_id = %record.call_id,
                    timeout_ms = timeout.as_millis() as u64,
                    "Persisting call record timed out"
                );
                "timeout"
            },
        };
        metrics::counter!("receptionist_call_records_persisted_total", "outcome" => outcome)
            .increment(1);
    }

    /// Apply a lifecycle transition if legal; returns whether it happened
    fn transition(&self, next: CallState) -> bool {
        let old = {
            let mut session = self.session.write();
            if !session.state.can_transition_to(next) {
                tracing::warn!(
                    call_id = %session.call_id,
                    from = %session.state,
                    to = %next,
                    "Invalid call state transition"
                );
                return false;
            }
            std::mem::replace(&mut session.state, next)
        };
        tracing::debug!(call_id = %self.call_id(), from = %old, to = %next, "Call state changed");
        self.emit(SessionEvent::StateChanged { old, new: next });
        true
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.event_tx.send(event);
    }

    pub fn call_id(&self) -> String {
        self.session.read().call_id.clone()
    }

    pub fn caller_id(&self) -> String {
        self.session.read().caller_id.clone()
    }

    pub fn state(&self) -> CallState {
        self.session.read().state
    }

    pub fn session(&self) -> CallSession {
        self.session.read().clone()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized.load(Ordering::Acquire)
    }

    pub fn context(&self) -> &Arc<ConversationContext> {
        &self.context
    }

    pub fn tracker(&self) -> &Arc<CallTracker> {
        &self.tracker
    }

    pub fn turns(&self) -> &TurnCoordinator {
        &self.turns
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }
}
