//! Scripted collaborators for session tests

#![allow(dead_code)]

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use receptionist_agent::{CallServices, SessionManager, SessionOptions};
use receptionist_config::BusinessProfile;
use receptionist_core::{
    AudioFrame, AudioStream, CallRecord, CallRecordStore, Error, FinishReason, GenerateRequest,
    LanguageModel, MediaTransport, Message, ModelStream, Result, Role, SpeechToText, StreamChunk,
    TextToSpeech, ToolCall, TranscriptResult, TranscriptStream,
};
use receptionist_tools::{create_receptionist_registry, ToolRegistry};

/// What the scripted model does for one request
pub enum ModelScript {
    Chunks(Vec<StreamChunk>),
    /// Never yields; only cancellation or a deadline ends the turn
    Hang,
}

pub fn reply(text: &str) -> ModelScript {
    ModelScript::Chunks(vec![
        StreamChunk::text(text),
        StreamChunk::final_chunk(FinishReason::Stop),
    ])
}

pub fn call_tools(calls: Vec<ToolCall>) -> ModelScript {
    let mut chunks: Vec<StreamChunk> = calls.into_iter().map(StreamChunk::tool_call).collect();
    chunks.push(StreamChunk::final_chunk(FinishReason::ToolCalls));
    ModelScript::Chunks(chunks)
}

type Script = dyn Fn(&GenerateRequest) -> ModelScript + Send + Sync;

/// Language model driven by a closure over the request
pub struct ScriptedModel {
    script: Box<Script>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedModel {
    pub fn new(script: impl Fn(&GenerateRequest) -> ModelScript + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().clone()
    }
}

impl LanguageModel for ScriptedModel {
    fn generate_stream<'a>(
        &'a self,
        request: GenerateRequest,
        _cancel: CancellationToken,
    ) -> ModelStream<'a> {
        let script = (self.script)(&request);
        self.requests.lock().push(request);
        match script {
            ModelScript::Chunks(chunks) => Box::pin(futures::stream::iter(chunks.into_iter().map(Ok::<_, Error>))),
            ModelScript::Hang => Box::pin(futures::stream::pending::<Result<StreamChunk>>()),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Last message of the request, as (role, content)
pub fn last(request: &GenerateRequest) -> (Role, String) {
    request
        .last_message()
        .map(|m| (m.role, m.content.clone()))
        .unwrap_or((Role::System, String::new()))
}

/// One frame per word, `frame_delay` apart
pub struct WordSynth {
    pub frame_delay: Duration,
}

impl TextToSpeech for WordSynth {
    fn synthesize_stream<'a>(
        &'a self,
        text: &'a str,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Stream<Item = Result<AudioFrame>> + Send + 'a>> {
        let delay = self.frame_delay;
        Box::pin(async_stream::stream! {
            for (sequence, word) in text.split_whitespace().enumerate() {
                tokio::time::sleep(delay).await;
                if cancel.is_cancelled() {
                    break;
                }
                yield Ok::<_, Error>(AudioFrame::new(word.as_bytes().to_vec(), sequence as u64));
            }
        })
    }

    fn model_name(&self) -> &str {
        "word-synth"
    }
}

/// Recognizer reading `partial:` / `final:` text payloads
pub struct TextRecognizer;

impl SpeechToText for TextRecognizer {
    fn transcribe_stream<'a>(&'a self, audio_stream: AudioStream<'a>) -> TranscriptStream<'a> {
        Box::pin(audio_stream.filter_map(|frame| {
            let payload = String::from_utf8(frame.data).unwrap_or_default();
            let result = if let Some(text) = payload.strip_prefix("final:") {
                Some(Ok::<_, Error>(TranscriptResult::final_result(text)))
            } else {
                payload
                    .strip_prefix("partial:")
                    .map(|text| Ok::<_, Error>(TranscriptResult::partial(text)))
            };
            futures::future::ready(result)
        }))
    }

    fn model_name(&self) -> &str {
        "text-recognizer"
    }
}

pub fn speech(text: &str) -> AudioFrame {
    AudioFrame::new(text.as_bytes().to_vec(), 0)
}

/// Transport capturing outbound audio
pub struct RecordingTransport {
    frames: Mutex<Vec<AudioFrame>>,
    connected: AtomicBool,
    /// Sends wait while this is false
    accepting: watch::Sender<bool>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            frames: Mutex::new(Vec::new()),
            connected: AtomicBool::new(true),
            accepting: watch::channel(true).0,
        }
    }

    /// Hold every send until `resume`, like a carrier applying backpressure
    pub fn stall(&self) {
        self.accepting.send_replace(false);
    }

    pub fn resume(&self) {
        self.accepting.send_replace(true);
    }

    pub fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Words played to the caller, in order
    pub fn spoken(&self) -> Vec<String> {
        self.frames
            .lock()
            .iter()
            .map(|f| String::from_utf8_lossy(&f.data).into_owned())
            .collect()
    }
}

#[async_trait]
impl MediaTransport for RecordingTransport {
    async fn send_audio(&self, frame: AudioFrame) -> Result<()> {
        let mut accepting = self.accepting.subscribe();
        if accepting.wait_for(|open| *open).await.is_err() {
            return Err(Error::TransportClosed);
        }
        if !self.is_connected() {
            return Err(Error::TransportClosed);
        }
        self.frames.lock().push(frame);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Call log store with optional latency and failure
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<CallRecord>>,
    delay: Option<Duration>,
    fail: bool,
}

impl MemoryStore {
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn records(&self) -> Vec<CallRecord> {
        self.records.lock().clone()
    }
}

#[async_trait]
impl CallRecordStore for MemoryStore {
    async fn store(&self, record: &CallRecord) -> Result<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(Error::PersistenceFailure("cluster unavailable".to_string()));
        }
        self.records.lock().push(record.clone());
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<CallRecord>> {
        Ok(self.records.lock().iter().rev().take(limit).cloned().collect())
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}

/// A session wired to scripted collaborators
pub struct Harness {
    pub session: Arc<SessionManager>,
    pub model: Arc<ScriptedModel>,
    pub transport: Arc<RecordingTransport>,
    pub store: Arc<MemoryStore>,
}

pub struct HarnessBuilder {
    model: ScriptedModel,
    store: Option<Arc<MemoryStore>>,
    tools: Option<ToolRegistry>,
    options: SessionOptions,
    frame_delay: Duration,
}

impl HarnessBuilder {
    pub fn new(model: ScriptedModel) -> Self {
        Self {
            model,
            store: Some(Arc::new(MemoryStore::default())),
            tools: None,
            options: SessionOptions::default(),
            frame_delay: Duration::from_millis(50),
        }
    }

    pub fn store(mut self, store: MemoryStore) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    pub fn without_store(mut self) -> Self {
        self.store = None;
        self
    }

    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn options(mut self, edit: impl FnOnce(&mut SessionOptions)) -> Self {
        edit(&mut self.options);
        self
    }

    pub fn frame_delay(mut self, delay: Duration) -> Self {
        self.frame_delay = delay;
        self
    }

    pub fn build(self) -> Harness {
        let model = Arc::new(self.model);
        let transport = Arc::new(RecordingTransport::new());
        let recorded = self.store.clone().unwrap_or_default();
        let tools = self.tools.unwrap_or_else(|| {
            create_receptionist_registry(&BusinessProfile::default(), Duration::from_secs(10))
        });
        let services = CallServices {
            llm: model.clone(),
            stt: Arc::new(TextRecognizer),
            tts: Arc::new(WordSynth {
                frame_delay: self.frame_delay,
            }),
            store: self.store.map(|s| s as Arc<dyn CallRecordStore>),
        };
        let session = SessionManager::new(
            "call-test",
            Some("+15550100".to_string()),
            transport.clone(),
            services,
            Arc::new(tools),
            self.options,
        );
        Harness {
            session,
            model,
            transport,
            store: recorded,
        }
    }
}

/// Greets, then answers every caller line with `answer`
pub fn greeting_model(answer: &'static str) -> ScriptedModel {
    ScriptedModel::new(move |request| match last(request) {
        (Role::System, _) => reply("Hello, thank you for calling Acme Corp."),
        _ => reply(answer),
    })
}

pub fn tool_messages(messages: &[Message]) -> Vec<(String, String)> {
    messages
        .iter()
        .filter(|m| m.role == Role::Tool)
        .map(|m| (m.tool_call_id.clone().unwrap_or_default(), m.content.clone()))
        .collect()
}
