//! Call lifecycle types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Caller id used when the transport does not supply one
pub const UNKNOWN_CALLER: &str = "unknown";

/// Intent recorded when no tool classified the call
pub const UNKNOWN_INTENT: &str = "unknown";

/// Lifecycle of one phone call
///
/// Transitions are forward-only: `Connecting → Active → Ending → Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CallState {
    #[default]
    Connecting,
    Active,
    Ending,
    Closed,
}

impl CallState {
    /// Whether `next` is a legal successor of `self`
    pub fn can_transition_to(self, next: CallState) -> bool {
        matches!(
            (self, next),
            (CallState::Connecting, CallState::Active)
                | (CallState::Connecting, CallState::Ending)
                | (CallState::Active, CallState::Ending)
                | (CallState::Ending, CallState::Closed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, CallState::Closed)
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallState::Connecting => "connecting",
            CallState::Active => "active",
            CallState::Ending => "ending",
            CallState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// One phone call from connect to close
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSession {
    pub call_id: String,
    pub caller_id: String,
    pub started_at: DateTime<Utc>,
    pub state: CallState,
}

impl CallSession {
    pub fn new(call_id: impl Into<String>, caller_id: Option<String>) -> Self {
        Self {
            call_id: call_id.into(),
            caller_id: normalize_caller_id(caller_id),
            started_at: Utc::now(),
            state: CallState::Connecting,
        }
    }
}

/// Trimmed caller id, or [`UNKNOWN_CALLER`] when absent or blank
pub fn normalize_caller_id(caller_id: Option<String>) -> String {
    caller_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| UNKNOWN_CALLER.to_string())
}

/// Persistable summary of a finished call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRecord {
    pub call_id: String,
    pub caller_id: String,
    /// Newline-separated, speaker-labelled transcript
    pub transcript: String,
    pub detected_intent: String,
    /// Whole seconds between session start and finalize
    pub duration_secs: u64,
    pub created_at: DateTime<Utc>,
}
