//! Turn Coordinator
//!
//! Drives one call's turn-taking state machine:
//!
//! ```text
//!            final transcript / greeting
//!   Idle ───────────────────────────────▶ Generating ──tool calls──▶ AwaitingTool
//!    ▲                                       │   ▲                        │
//!    │            playback done              │   └──── results appended ──┘
//!    └──────────── Speaking ◀── reply ───────┘
//! ```
//!
//! Each turn runs in its own task with a cancellation token. Barge-in
//! cancels the token: model streams and playback stop at the next await
//! point, while tool handlers that already started run to completion and
//! their results are still appended before the next turn begins.

use futures::StreamExt;
use parking_lot::Mutex as SyncMutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use receptionist_config::TurnConfig;
use receptionist_core::{
    Error, FinishReason, LanguageModel, MediaTransport, Message, ModelStream, Result,
    StreamChunk, TextToSpeech, ToolCall, UpstreamStage,
};
use receptionist_tools::{ToolInvocation, ToolRegistry};

use crate::call_tracker::CallTracker;
use crate::conversation::ConversationContext;
use crate::AgentError;

/// Turn-taking state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Generating,
    AwaitingTool,
    Speaking,
}

/// Turn coordinator events
#[derive(Debug, Clone)]
pub enum TurnEvent {
    StateChanged { old: TurnState, new: TurnState },
    /// Caller spoke over an in-flight turn
    BargeIn { interrupted: TurnState },
    ToolDispatched {
        name: String,
        correlation_id: String,
        success: bool,
        duration_ms: u64,
    },
    /// Reply text about to be spoken
    Reply { text: String },
    SpeechCompleted,
    Failed { error: String },
    /// Outbound audio hit a closed transport
    TransportClosed,
}

/// Collaborators a turn drives
#[derive(Clone)]
pub struct TurnServices {
    pub llm: Arc<dyn LanguageModel>,
    pub tts: Arc<dyn TextToSpeech>,
    pub transport: Arc<dyn MediaTransport>,
    pub tools: Arc<ToolRegistry>,
}

enum TurnOutcome {
    Completed,
    Interrupted,
}

#[derive(Debug, Default)]
struct ModelReply {
    text: String,
    tool_calls: Vec<ToolCall>,
    finish_reason: FinishReason,
}

/// State tagged with the turn that owns it; stale turns cannot overwrite it
#[derive(Debug)]
struct TurnStatus {
    epoch: u64,
    state: TurnState,
}

struct ActiveTurn {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

struct TurnRunner {
    call_id: String,
    context: Arc<ConversationContext>,
    tracker: Arc<CallTracker>,
    services: TurnServices,
    config: TurnConfig,
    repeat_prompt: Option<String>,
    status: SyncMutex<TurnStatus>,
    /// Parent of every turn token; cancelled once on shutdown
    shutdown: CancellationToken,
    event_tx: broadcast::Sender<TurnEvent>,
}

/// Turn-taking for one call
pub struct TurnCoordinator {
    runner: Arc<TurnRunner>,
    /// Serializes turn starts; holds the in-flight turn
    active: Mutex<Option<ActiveTurn>>,
}

impl TurnCoordinator {
    pub fn new(
        call_id: impl Into<String>,
        context: Arc<ConversationContext>,
        tracker: Arc<CallTracker>,
        services: TurnServices,
        config: TurnConfig,
        repeat_prompt: Option<String>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            runner: Arc::new(TurnRunner {
                call_id: call_id.into(),
                context,
                tracker,
                services,
                config,
                repeat_prompt,
                status: SyncMutex::new(TurnStatus {
                    epoch: 0,
                    state: TurnState::Idle,
                }),
                shutdown: CancellationToken::new(),
                event_tx,
            }),
            active: Mutex::new(None),
        }
    }

    pub fn state(&self) -> TurnState {
        self.runner.status.lock().state
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TurnEvent> {
        self.runner.event_tx.subscribe()
    }

    pub fn is_shut_down(&self) -> bool {
        self.runner.shutdown.is_cancelled()
    }

    /// Append the greeting instruction and let the model open the call
    pub async fn greet(&self, instruction: &str) -> std::result::Result<(), AgentError> {
        let mut active = self.active.lock().await;
        self.ensure_open()?;
        if let Some(previous) = active.take() {
            previous.cancel.cancel();
            self.runner.drain(previous).await;
        }
        self.runner.context.append(Message::system(instruction))?;
        self.begin_turn(&mut active)
    }

    /// Handle a provisional transcript
    ///
    /// Only used for barge-in detection; nothing is appended. Returns true
    /// when the in-flight turn was interrupted.
    pub async fn on_partial_transcript(&self, text: &str) -> bool {
        let config = &self.runner.config;
        if !config.barge_in_enabled || text.trim().chars().count() < config.barge_in_min_chars {
            return false;
        }
        let interrupted = self.state();
        if interrupted == TurnState::Idle {
            return false;
        }

        let active = self.active.lock().await;
        match active.as_ref() {
            Some(turn) if !turn.cancel.is_cancelled() => {
                turn.cancel.cancel();
                self.runner.barge_in(interrupted);
                true
            },
            _ => false,
        }
    }

    /// Handle a finalized caller utterance
    ///
    /// Interrupts any in-flight turn, waits for already-started tool
    /// handlers to settle, appends the utterance and starts generating.
    pub async fn on_final_transcript(&self, text: &str) -> std::result::Result<(), AgentError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        self.ensure_open()?;
        self.runner.tracker.record_user_utterance(text);

        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            let interrupted = self.state();
            if interrupted != TurnState::Idle && !previous.cancel.is_cancelled() {
                self.runner.barge_in(interrupted);
            }
            // The interrupted turn may no longer touch the state
            self.runner.status.lock().epoch += 1;
            previous.cancel.cancel();
            self.runner.drain(previous).await;
        }

        self.runner.context.append(Message::user(text))?;
        self.begin_turn(&mut active)
    }

    /// Wait for the in-flight turn to finish on its own
    pub async fn join_active_turn(&self) {
        let mut active = self.active.lock().await;
        if let Some(turn) = active.take() {
            self.runner.drain(turn).await;
        }
    }

    /// Cancel any in-flight turn and refuse new ones
    ///
    /// Does not wait: tool handlers already running finish in the background.
    pub fn shutdown(&self) {
        self.runner.shutdown.cancel();
        let mut status = self.runner.status.lock();
        status.epoch += 1;
        let old = std::mem::replace(&mut status.state, TurnState::Idle);
        drop(status);
        self.runner.state_changed(old, TurnState::Idle);
    }

    fn ensure_open(&self) -> std::result::Result<(), AgentError> {
        if self.runner.shutdown.is_cancelled() {
            return Err(AgentError::SessionClosed);
        }
        Ok(())
    }

    fn begin_turn(&self, slot: &mut Option<ActiveTurn>) -> std::result::Result<(), AgentError> {
        self.ensure_open()?;
        let epoch = {
            let mut status = self.runner.status.lock();
            status.epoch += 1;
            let old = std::mem::replace(&mut status.state, TurnState::Generating);
            let epoch = status.epoch;
            drop(status);
            self.runner.state_changed(old, TurnState::Generating);
            epoch
        };

        let cancel = self.runner.shutdown.child_token();
        let runner = Arc::clone(&self.runner);
        let handle = tokio::spawn(runner.run(epoch, cancel.clone()));
        *slot = Some(ActiveTurn { cancel, handle });

        metrics::counter!("receptionist_turns_total").increment(1);
        Ok(())
    }
}

impl TurnRunner {
    async fn run(self: Arc<Self>, epoch: u64, cancel: CancellationToken) {
        match self.execute(epoch, &cancel).await {
            Ok(TurnOutcome::Completed) => {
                tracing::debug!(call_id = %self.call_id, "Turn completed");
            },
            Ok(TurnOutcome::Interrupted) => {
                tracing::debug!(call_id = %self.call_id, "Turn interrupted");
            },
            Err(e) => self.recover(epoch, e, &cancel).await,
        }
        self.set_state_if_current(epoch, TurnState::Idle);
    }

    async fn execute(&self, epoch: u64, cancel: &CancellationToken) -> Result<TurnOutcome> {
        let max_rounds = self.config.max_tool_rounds;
        for round in 0..=max_rounds {
            self.set_state_if_current(epoch, TurnState::Generating);

            let reply = match self.generate(cancel).await? {
                Some(reply) => reply,
                None => return Ok(TurnOutcome::Interrupted),
            };
            tracing::debug!(
                call_id = %self.call_id,
                round,
                finish_reason = ?reply.finish_reason,
                tool_calls = reply.tool_calls.len(),
                "Model turn complete"
            );

            if reply.tool_calls.is_empty() {
                return self.say(epoch, reply.text.trim(), cancel).await;
            }
            if round == max_rounds {
                tracing::warn!(
                    call_id = %self.call_id,
                    max_rounds,
                    "Tool round limit reached, abandoning turn"
                );
                return Ok(TurnOutcome::Completed);
            }

            self.run_tools(epoch, reply).await?;
            if cancel.is_cancelled() {
                return Ok(TurnOutcome::Interrupted);
            }
        }
        Ok(TurnOutcome::Completed)
    }

    /// Stream one model turn, bounded by the model deadline
    ///
    /// Returns `None` when cancelled; partial output is discarded.
    async fn generate(&self, cancel: &CancellationToken) -> Result<Option<ModelReply>> {
        let request = self
            .context
            .snapshot()
            .to_request()
            .with_max_tokens(self.config.max_tokens)
            .with_temperature(self.config.temperature);
        let timeout_ms = self.config.model_timeout_ms;
        let stream = self.services.llm.generate_stream(request, cancel.child_token());

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Ok(None),
            collected = tokio::time::timeout(Duration::from_millis(timeout_ms), collect_reply(stream)) => {
                match collected {
                    Ok(reply) => reply.map(Some),
                    Err(_) => Err(Error::timeout(UpstreamStage::Model, timeout_ms)),
                }
            }
        }
    }

    /// Append the tool-call request, dispatch concurrently and append
    /// results in request order
    ///
    /// Not cancellable: once dispatched, results always reach the context.
    async fn run_tools(&self, epoch: u64, reply: ModelReply) -> Result<()> {
        let invocations: Vec<ToolInvocation> = reply
            .tool_calls
            .iter()
            .map(|call| ToolInvocation::from_tool_call(call, &self.call_id))
            .collect();

        self.context
            .append(Message::assistant_with_tools(reply.text, reply.tool_calls))?;
        self.set_state_if_current(epoch, TurnState::AwaitingTool);

        let snapshot = self.context.snapshot();
        let outcomes = self
            .services
            .tools
            .dispatch_all(&invocations, self.tracker.as_ref(), snapshot.messages())
            .await;

        for outcome in outcomes {
            let success = outcome.is_success();
            metrics::counter!(
                "receptionist_tool_calls_total",
                "tool" => outcome.name.clone(),
                "outcome" => if success { "ok" } else { "error" }
            )
            .increment(1);
            self.emit(TurnEvent::ToolDispatched {
                name: outcome.name.clone(),
                correlation_id: outcome.correlation_id.clone(),
                success,
                duration_ms: outcome.duration_ms,
            });
            self.context.append(outcome.into_message())?;
        }
        Ok(())
    }

    /// Commit a reply to the conversation and play it
    async fn say(&self, epoch: u64, text: &str, cancel: &CancellationToken) -> Result<TurnOutcome> {
        if text.is_empty() {
            tracing::warn!(call_id = %self.call_id, "Model returned an empty reply");
            return Ok(TurnOutcome::Completed);
        }
        if cancel.is_cancelled() {
            return Ok(TurnOutcome::Interrupted);
        }

        self.context.append(Message::assistant(text))?;
        self.tracker.record_assistant_utterance(text);
        self.emit(TurnEvent::Reply {
            text: text.to_string(),
        });
        self.set_state_if_current(epoch, TurnState::Speaking);
        self.speak(text, cancel).await
    }

    /// Stream synthesized audio to the transport until done or cancelled
    async fn speak(&self, text: &str, cancel: &CancellationToken) -> Result<TurnOutcome> {
        let timeout_ms = self.config.synthesis_timeout_ms;
        let deadline = Duration::from_millis(timeout_ms);
        let mut audio = self.services.tts.synthesize_stream(text, cancel.child_token());

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(TurnOutcome::Interrupted),
                next = tokio::time::timeout(deadline, audio.next()) => next,
            };
            let frame = match next {
                Err(_) => return Err(Error::timeout(UpstreamStage::Synthesis, timeout_ms)),
                Ok(None) => break,
                Ok(Some(frame)) => frame?,
            };
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(TurnOutcome::Interrupted),
                sent = self.services.transport.send_audio(frame) => sent?,
            }
        }

        self.emit(TurnEvent::SpeechCompleted);
        Ok(TurnOutcome::Completed)
    }

    /// Report a failed turn; after a model timeout, ask the caller to repeat
    async fn recover(&self, epoch: u64, error: Error, cancel: &CancellationToken) {
        self.report(&error);
        let model_timed_out = matches!(
            error,
            Error::UpstreamTimeout {
                stage: UpstreamStage::Model,
                ..
            }
        );
        if !model_timed_out || cancel.is_cancelled() {
            return;
        }
        if let Some(prompt) = &self.repeat_prompt {
            if let Err(e) = self.say(epoch, prompt, cancel).await {
                self.report(&e);
            }
        }
    }

    fn report(&self, error: &Error) {
        match error {
            Error::TransportClosed => {
                tracing::warn!(call_id = %self.call_id, "Transport closed during playback");
                self.emit(TurnEvent::TransportClosed);
            },
            Error::UpstreamTimeout { .. } => {
                tracing::warn!(call_id = %self.call_id, error = %error, "Turn timed out");
                self.emit(TurnEvent::Failed {
                    error: error.to_string(),
                });
            },
            _ => {
                tracing::error!(call_id = %self.call_id, error = %error, "Turn failed");
                self.emit(TurnEvent::Failed {
                    error: error.to_string(),
                });
            },
        }
    }

    async fn drain(&self, turn: ActiveTurn) {
        if let Err(e) = turn.handle.await {
            if e.is_panic() {
                tracing::error!(call_id = %self.call_id, "Turn task panicked");
            }
        }
    }

    fn barge_in(&self, interrupted: TurnState) {
        tracing::info!(call_id = %self.call_id, interrupted = ?interrupted, "Barge-in");
        metrics::counter!("receptionist_barge_ins_total").increment(1);
        self.emit(TurnEvent::BargeIn { interrupted });
    }

    fn set_state_if_current(&self, epoch: u64, new: TurnState) {
        let mut status = self.status.lock();
        if status.epoch != epoch {
            return;
        }
        let old = std::mem::replace(&mut status.state, new);
        drop(status);
        self.state_changed(old, new);
    }

    fn state_changed(&self, old: TurnState, new: TurnState) {
        if old != new {
            tracing::debug!(call_id = %self.call_id, old = ?old, new = ?new, "Turn state changed");
            self.emit(TurnEvent::StateChanged { old, new });
        }
    }

    fn emit(&self, event: TurnEvent) {
        let _ = self.event_tx.send(event);
    }
}

/// Collect a model turn up to its `Done` chunk
async fn collect_reply(mut stream: ModelStream<'_>) -> Result<ModelReply> {
    let mut reply = ModelReply::default();
    while let Some(chunk) = stream.next().await {
        match chunk? {
            StreamChunk::Text { delta } => reply.text.push_str(&delta),
            StreamChunk::ToolCall { call } => reply.tool_calls.push(call),
            StreamChunk::Done { finish_reason } => {
                reply.finish_reason = finish_reason;
                return Ok(reply);
            },
        }
    }
    Err(Error::Llm(
        "model stream ended before turn complete".to_string(),
    ))
}
