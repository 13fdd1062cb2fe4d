//! Core traits and types for the receptionist call agent
//!
//! This crate provides foundational types used across all other crates:
//! - Collaborator traits (language model, speech, media transport, storage)
//! - Chat message and tool-call types
//! - Call lifecycle types and the finalized call record
//! - Error taxonomy

pub mod audio;
pub mod call;
pub mod error;
pub mod llm_types;
pub mod traits;
pub mod transcript;

pub use audio::{AudioEncoding, AudioFrame, SampleRate};
pub use call::{
    normalize_caller_id, CallRecord, CallSession, CallState, UNKNOWN_CALLER, UNKNOWN_INTENT,
};
pub use error::{Error, Result, UpstreamStage};
pub use llm_types::{
    FinishReason, GenerateRequest, Message, Role, StreamChunk, ToolArguments, ToolCall,
    ToolDefinition,
};
pub use transcript::TranscriptResult;

pub use traits::{
    AudioStream, CallRecordStore, LanguageModel, MediaTransport, ModelStream, SpeechToText,
    TextToSpeech, TranscriptStream, TransportEvent,
};
