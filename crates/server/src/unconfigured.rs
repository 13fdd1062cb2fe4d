//! Collaborators for a server with no vendor adapters linked in
//!
//! Model and synthesis requests fail with upstream errors, which the turn
//! coordinator reports without ending the call. The recognizer drains
//! caller audio and never produces a transcript.

use futures::StreamExt;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use receptionist_agent::CallServices;
use receptionist_core::{
    AudioFrame, AudioStream, CallRecordStore, Error, GenerateRequest, LanguageModel, ModelStream,
    Result, SpeechToText, StreamChunk, TextToSpeech, TranscriptResult, TranscriptStream,
};

pub struct UnconfiguredModel;

impl LanguageModel for UnconfiguredModel {
    fn generate_stream<'a>(
        &'a self,
        _request: GenerateRequest,
        _cancel: CancellationToken,
    ) -> ModelStream<'a> {
        Box::pin(futures::stream::once(async {
            Err::<StreamChunk, _>(Error::Llm("no language model configured".to_string()))
        }))
    }

    fn model_name(&self) -> &str {
        "unconfigured"
    }
}

pub struct UnconfiguredSpeech;

impl SpeechToText for UnconfiguredSpeech {
    fn transcribe_stream<'a>(&'a self, audio_stream: AudioStream<'a>) -> TranscriptStream<'a> {
        Box::pin(audio_stream.filter_map(|_| futures::future::ready(None::<Result<TranscriptResult>>)))
    }

    fn model_name(&self) -> &str {
        "unconfigured"
    }
}

impl TextToSpeech for UnconfiguredSpeech {
    fn synthesize_stream<'a>(
        &'a self,
        _text: &'a str,
        _cancel: CancellationToken,
    ) -> Pin<Box<dyn futures::Stream<Item = Result<AudioFrame>> + Send + 'a>> {
        Box::pin(futures::stream::once(async {
            Err::<AudioFrame, _>(Error::Speech("no synthesizer configured".to_string()))
        }))
    }

    fn model_name(&self) -> &str {
        "unconfigured"
    }
}

/// Services backed by the unconfigured collaborators
pub fn unconfigured_services(store: Option<Arc<dyn CallRecordStore>>) -> CallServices {
    let speech = Arc::new(UnconfiguredSpeech);
    CallServices {
        llm: Arc::new(UnconfiguredModel),
        stt: speech.clone(),
        tts: speech,
        store,
    }
}
