//! Call session orchestration
//!
//! Features:
//! - Per-call conversation context with tool-call ordering checks
//! - Turn-taking with barge-in cancellation
//! - Tool dispatch through the shared registry
//! - Transcript and intent tracking for the call log
//! - Session lifecycle with idempotent teardown and bounded persistence

pub mod call_tracker;
pub mod conversation;
pub mod session;
pub mod table;
pub mod turn;

use thiserror::Error;

pub use call_tracker::CallTracker;
pub use conversation::{render_transcript, ContextSnapshot, ConversationContext, TranscriptPolicy};
pub use session::{CallServices, SessionEvent, SessionManager, SessionOptions};
pub use table::SessionTable;
pub use turn::{TurnCoordinator, TurnEvent, TurnServices, TurnState};

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Session error: {0}")]
    Session(String),

    #[error("Session capacity reached ({0} calls)")]
    CapacityReached(usize),

    #[error("Session closed")]
    SessionClosed,

    #[error(transparent)]
    Core(#[from] receptionist_core::Error),
}
