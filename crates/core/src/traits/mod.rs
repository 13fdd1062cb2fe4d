//! Collaborator traits
//!
//! External services the call core drives. Vendor adapters implement
//! these; the agent crate only sees the traits.

mod llm;
mod persistence;
mod speech;
mod transport;

pub use llm::{LanguageModel, ModelStream};
pub use persistence::CallRecordStore;
pub use speech::{AudioStream, SpeechToText, TextToSpeech, TranscriptStream};
pub use transport::{MediaTransport, TransportEvent};
