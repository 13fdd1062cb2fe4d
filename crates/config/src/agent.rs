//! Agent and turn-taking configuration

use serde::{Deserialize, Serialize};

const DEFAULT_SYSTEM_PROMPT: &str = "You are a friendly, natural-sounding receptionist for Acme Corp.

When someone calls:
1. Greet them warmly: \"Hello, thank you for calling Acme Corp. How can I help you today?\"
2. Listen carefully to their request.
3. If they want sales: Call transfer_to_sales, then say you're connecting them.
4. If they want support: Call transfer_to_support, ask them to briefly describe their issue.
5. If they ask about hours: Call get_business_hours and share the info conversationally.
6. If they ask about location: Call get_location and share the address naturally.
7. For pricing, trials, refunds or plan questions: Call get_faq_answer.
8. If unclear: Say \"I'm sorry, I didn't quite catch that. Could you say that again?\"

IMPORTANT CONVERSATION RULES:
- After helping with any request, always ask: \"Is there anything else I can help you with?\"
- If they say \"no\", \"that's all\", \"thanks\", \"goodbye\", etc., respond with:
  \"Thank you for calling Acme Corp. Have a wonderful day! Goodbye.\"
- Remember what was discussed earlier in the call.
- Keep responses brief and conversational. Sound warm, not robotic.
- Your output will be converted to audio, so avoid special characters or formatting.";

/// Agent persona and transcript labelling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// First message of every conversation context
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// System instruction appended when the call connects to trigger the greeting
    #[serde(default = "default_greeting_instruction")]
    pub greeting_instruction: String,

    /// Transcript label for caller utterances
    #[serde(default = "default_caller_label")]
    pub caller_label: String,

    /// Transcript label for assistant utterances
    #[serde(default = "default_assistant_label")]
    pub assistant_label: String,

    /// Render tool results into the context transcript
    #[serde(default)]
    pub include_tool_notes: bool,

    /// Spoken when the model times out; `None` stays silent
    #[serde(default = "default_repeat_prompt")]
    pub repeat_prompt: Option<String>,
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}
fn default_greeting_instruction() -> String {
    "A caller just connected. Greet them warmly.".to_string()
}
fn default_caller_label() -> String {
    "Caller".to_string()
}
fn default_assistant_label() -> String {
    "Receptionist".to_string()
}
fn default_repeat_prompt() -> Option<String> {
    Some("I'm sorry, I didn't quite catch that. Could you say that again?".to_string())
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            greeting_instruction: default_greeting_instruction(),
            caller_label: default_caller_label(),
            assistant_label: default_assistant_label(),
            include_tool_notes: false,
            repeat_prompt: default_repeat_prompt(),
        }
    }
}

/// Turn coordinator deadlines and barge-in policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnConfig {
    /// Deadline for one complete model turn (ms)
    #[serde(default = "default_model_timeout_ms")]
    pub model_timeout_ms: u64,

    /// Deadline for a single tool handler (ms)
    #[serde(default = "default_tool_timeout_ms")]
    pub tool_timeout_ms: u64,

    /// Maximum wait for the next synthesized audio frame (ms)
    #[serde(default = "default_synthesis_timeout_ms")]
    pub synthesis_timeout_ms: u64,

    /// Tool round-trips allowed before the turn is abandoned
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,

    #[serde(default = "default_true")]
    pub barge_in_enabled: bool,

    /// Minimum partial-transcript length that counts as caller speech
    #[serde(default = "default_barge_in_min_chars")]
    pub barge_in_min_chars: usize,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_model_timeout_ms() -> u64 {
    15_000
}
fn default_tool_timeout_ms() -> u64 {
    10_000
}
fn default_synthesis_timeout_ms() -> u64 {
    10_000
}
fn default_max_tool_rounds() -> usize {
    4
}
fn default_true() -> bool {
    true
}
fn default_barge_in_min_chars() -> usize {
    2
}
fn default_max_tokens() -> u32 {
    256
}
fn default_temperature() -> f32 {
    0.7
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            model_timeout_ms: default_model_timeout_ms(),
            tool_timeout_ms: default_tool_timeout_ms(),
            synthesis_timeout_ms: default_synthesis_timeout_ms(),
            max_tool_rounds: default_max_tool_rounds(),
            barge_in_enabled: true,
            barge_in_min_chars: default_barge_in_min_chars(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}
