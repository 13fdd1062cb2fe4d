//! Speech recognition results

use serde::{Deserialize, Serialize};

/// Transcript emitted by a speech recognizer
///
/// Partial results (`is_final = false`) are provisional and may be revised
/// by later results. Only final results enter the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptResult {
    pub text: String,
    pub is_final: bool,
    /// Recognizer confidence (0.0 - 1.0)
    #[serde(default = "default_confidence")]
    pub confidence: f32,
}

fn default_confidence() -> f32 {
    1.0
}

impl TranscriptResult {
    pub fn partial(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
            confidence: default_confidence(),
        }
    }

    pub fn final_result(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
            confidence: default_confidence(),
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Whether the transcript carries any speech
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}
