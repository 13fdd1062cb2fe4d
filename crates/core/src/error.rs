//! Error types shared across the call agent

use std::fmt;
use thiserror::Error;

/// Upstream dependency that exceeded its deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamStage {
    Model,
    Tool,
    Synthesis,
    Persistence,
}

impl fmt::Display for UpstreamStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UpstreamStage::Model => "model",
            UpstreamStage::Tool => "tool",
            UpstreamStage::Synthesis => "synthesis",
            UpstreamStage::Persistence => "persistence",
        };
        f.write_str(name)
    }
}

/// Core error taxonomy
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Model requested a tool that is not registered
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Appending would break role ordering or tool-call correlation
    #[error("Invalid message order: {0}")]
    InvalidMessageOrder(String),

    #[error("Upstream {stage} timed out after {timeout_ms}ms")]
    UpstreamTimeout {
        stage: UpstreamStage,
        timeout_ms: u64,
    },

    /// Media channel is gone; never retried
    #[error("Transport closed")]
    TransportClosed,

    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Speech error: {0}")]
    Speech(String),

    #[error("Tool error: {0}")]
    Tool(String),
}

impl Error {
    pub fn timeout(stage: UpstreamStage, timeout_ms: u64) -> Self {
        Error::UpstreamTimeout { stage, timeout_ms }
    }

    pub fn order(message: impl Into<String>) -> Self {
        Error::InvalidMessageOrder(message.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::UpstreamTimeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
