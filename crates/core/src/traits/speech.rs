//! Speech processing traits

use futures::Stream;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

use crate::{AudioFrame, Result, TranscriptResult};

/// Inbound caller audio
pub type AudioStream<'a> = Pin<Box<dyn Stream<Item = AudioFrame> + Send + 'a>>;

/// Recognizer output, partial and final
pub type TranscriptStream<'a> = Pin<Box<dyn Stream<Item = Result<TranscriptResult>> + Send + 'a>>;

/// Speech-to-Text interface
///
/// Consumes raw caller audio and yields provisional partial transcripts
/// (`is_final = false`) and finalized utterances (`is_final = true`).
/// Final results must be yielded in the order the caller spoke them.
pub trait SpeechToText: Send + Sync + 'static {
    /// Stream transcription as audio arrives
    fn transcribe_stream<'a>(&'a self, audio_stream: AudioStream<'a>) -> TranscriptStream<'a>;

    /// Get model name for logging
    fn model_name(&self) -> &str;
}

/// Text-to-Speech interface
///
/// Synthesis is streamed so playback can start before the reply is fully
/// rendered. Cancelling the token (or dropping the stream) must stop
/// synthesis; no frame may be yielded after cancellation is observed.
pub trait TextToSpeech: Send + Sync + 'static {
    /// Stream synthesized audio for `text`
    fn synthesize_stream<'a>(
        &'a self,
        text: &'a str,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Stream<Item = Result<AudioFrame>> + Send + 'a>>;

    /// Get model name for logging
    fn model_name(&self) -> &str;
}
