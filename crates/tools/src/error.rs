//! Tool execution errors

use receptionist_core::{Error, UpstreamStage};
use thiserror::Error;

/// Failure of a single tool invocation
///
/// Every variant is reported back to the model as a tool result so the
/// conversation can recover.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("Tool {tool} timed out after {timeout_ms}ms")]
    Timeout { tool: String, timeout_ms: u64 },

    #[error("Tool {tool} failed: {message}")]
    Failed { tool: String, message: String },
}

impl ToolError {
    pub fn invalid_params(tool: &str, message: impl Into<String>) -> Self {
        ToolError::InvalidArguments {
            tool: tool.to_string(),
            message: message.into(),
        }
    }

    pub fn failed(tool: &str, message: impl Into<String>) -> Self {
        ToolError::Failed {
            tool: tool.to_string(),
            message: message.into(),
        }
    }

    /// Text placed in the tool-result message
    pub fn to_model_content(&self) -> String {
        format!("Error: {}", self)
    }
}

impl From<ToolError> for Error {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::UnknownTool(name) => Error::UnknownTool(name),
            ToolError::Timeout { timeout_ms, .. } => Error::timeout(UpstreamStage::Tool, timeout_ms),
            other => Error::Tool(other.to_string()),
        }
    }
}
