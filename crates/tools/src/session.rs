//! Call-scoped view handed to tool handlers

/// The parts of a live call a tool handler may read or annotate
///
/// Implemented by the call tracker; handlers never see the session
/// manager or the conversation context directly.
pub trait ToolSession: Send + Sync {
    fn call_id(&self) -> &str;

    fn caller_id(&self) -> &str;

    /// Record the caller's intent; the last write wins
    fn set_intent(&self, intent: &str);

    /// Append an annotation line to the call transcript
    fn add_note(&self, note: &str);
}
