//! Conversation Context Store
//!
//! Ordered message history for one call, shared between the speech-input
//! path and the turn coordinator. Appends go through a single lock and are
//! validated against role ordering and tool-call correlation; readers get
//! immutable snapshots.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use receptionist_config::AgentConfig;
use receptionist_core::{Error, GenerateRequest, Message, Result, Role, ToolDefinition};

/// Speaker labels used when rendering transcripts
#[derive(Debug, Clone)]
pub struct TranscriptPolicy {
    pub caller_label: String,
    pub assistant_label: String,
    /// Render tool results as `[Tool: name] result` lines
    pub include_tool_notes: bool,
}

impl TranscriptPolicy {
    pub fn from_config(config: &AgentConfig) -> Self {
        Self {
            caller_label: config.caller_label.clone(),
            assistant_label: config.assistant_label.clone(),
            include_tool_notes: config.include_tool_notes,
        }
    }

    pub fn caller_line(&self, text: &str) -> String {
        format!("{}: {}", self.caller_label, text)
    }

    pub fn assistant_line(&self, text: &str) -> String {
        format!("{}: {}", self.assistant_label, text)
    }
}

impl Default for TranscriptPolicy {
    fn default() -> Self {
        Self::from_config(&AgentConfig::default())
    }
}

/// Render a message history as a speaker-labelled transcript
///
/// System messages are omitted. Assistant messages that only carry tool
/// calls are omitted; tool results appear only when the policy asks.
pub fn render_transcript(messages: &[Message], policy: &TranscriptPolicy) -> String {
    let mut tool_names: HashMap<&str, &str> = HashMap::new();
    let mut lines = Vec::new();

    for message in messages {
        match message.role {
            Role::System => {},
            Role::User => lines.push(policy.caller_line(&message.content)),
            Role::Assistant => {
                for call in &message.tool_calls {
                    tool_names.insert(call.id.as_str(), call.name.as_str());
                }
                if !message.content.trim().is_empty() {
                    lines.push(policy.assistant_line(&message.content));
                }
            },
            Role::Tool => {
                if policy.include_tool_notes {
                    let name = message
                        .tool_call_id
                        .as_deref()
                        .and_then(|id| tool_names.get(id).copied())
                        .unwrap_or("tool");
                    lines.push(format!("[Tool: {}] {}", name, message.content));
                }
            },
        }
    }

    lines.join("\n")
}

/// Immutable view of the context at one point in time
#[derive(Debug, Clone)]
pub struct ContextSnapshot {
    messages: Arc<[Message]>,
    tools: Arc<[ToolDefinition]>,
}

impl ContextSnapshot {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Model request carrying the full history and tool set
    pub fn to_request(&self) -> GenerateRequest {
        GenerateRequest::new(self.messages.to_vec()).with_tools(self.tools.to_vec())
    }
}

#[derive(Debug, Default)]
struct ContextState {
    messages: Vec<Message>,
    /// Requested tool calls awaiting results, in request order
    pending: VecDeque<String>,
    /// Every correlation id ever requested in this conversation
    seen: HashSet<String>,
}

impl ContextState {
    fn validate(&self, message: &Message) -> Result<()> {
        if message.role != Role::Tool && !self.pending.is_empty() {
            return Err(Error::order(format!(
                "{:?} message while {} tool result(s) outstanding",
                message.role,
                self.pending.len()
            )));
        }

        match message.role {
            Role::System | Role::User => Ok(()),
            Role::Assistant => {
                let mut batch = HashSet::new();
                for call in &message.tool_calls {
                    if call.id.trim().is_empty() {
                        return Err(Error::order(format!(
                            "tool call '{}' has an empty correlation id",
                            call.name
                        )));
                    }
                    if self.seen.contains(&call.id) || !batch.insert(call.id.as_str()) {
                        return Err(Error::order(format!(
                            "correlation id '{}' reused",
                            call.id
                        )));
                    }
                }
                Ok(())
            },
            Role::Tool => {
                let id = message
                    .tool_call_id
                    .as_deref()
                    .ok_or_else(|| Error::order("tool result without correlation id"))?;
                match self.pending.front() {
                    Some(expected) if expected == id => Ok(()),
                    Some(expected) => Err(Error::order(format!(
                        "tool result '{}' out of request order, expected '{}'",
                        id, expected
                    ))),
                    None if self.seen.contains(id) => Err(Error::order(format!(
                        "duplicate tool result for '{}'",
                        id
                    ))),
                    None => Err(Error::order(format!(
                        "tool result '{}' has no matching request",
                        id
                    ))),
                }
            },
        }
    }

    fn apply(&mut self, message: Message) {
        match message.role {
            Role::Assistant => {
                for call in &message.tool_calls {
                    self.seen.insert(call.id.clone());
                    self.pending.push_back(call.id.clone());
                }
            },
            Role::Tool => {
                self.pending.pop_front();
            },
            Role::System | Role::User => {},
        }
        self.messages.push(message);
    }
}

/// Conversation context for one call
pub struct ConversationContext {
    state: Mutex<ContextState>,
    tools: Arc<[ToolDefinition]>,
}

impl ConversationContext {
    /// Start a conversation with the system prompt and available tools
    pub fn new(system_prompt: impl Into<String>, tools: Vec<ToolDefinition>) -> Self {
        let state = ContextState {
            messages: vec![Message::system(system_prompt)],
            ..Default::default()
        };
        Self {
            state: Mutex::new(state),
            tools: tools.into(),
        }
    }

    /// Append a message, rejecting it if it would break ordering or
    /// tool-call correlation. A rejected message leaves the context unchanged.
    pub fn append(&self, message: Message) -> Result<()> {
        let mut state = self.state.lock();
        if let Err(e) = state.validate(&message) {
            tracing::error!(error = %e, role = ?message.role, "Rejected context append");
            return Err(e);
        }
        state.apply(message);
        Ok(())
    }

    pub fn snapshot(&self) -> ContextSnapshot {
        let state = self.state.lock();
        ContextSnapshot {
            messages: state.messages.as_slice().into(),
            tools: self.tools.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().messages.len()
    }

    /// Never true: the system prompt is always present
    pub fn is_empty(&self) -> bool {
        self.state.lock().messages.is_empty()
    }

    /// Correlation ids still awaiting a tool result
    pub fn pending_tool_calls(&self) -> Vec<String> {
        self.state.lock().pending.iter().cloned().collect()
    }

    pub fn render_transcript(&self, policy: &TranscriptPolicy) -> String {
        render_transcript(self.snapshot().messages(), policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use receptionist_core::ToolCall;

    fn context() -> ConversationContext {
        ConversationContext::new(
            "You are a receptionist.",
            vec![ToolDefinition::without_parameters("get_location", "Where we are")],
        )
    }

    #[test]
    fn test_starts_with_system_prompt() {
        let ctx = context();
        let snapshot = ctx.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.messages()[0].role, Role::System);
        assert_eq!(snapshot.tools().len(), 1);
    }

    #[test]
    fn test_user_utterances_keep_order() {
        let ctx = context();
        for text in ["first", "second", "third"] {
            ctx.append(Message::user(text)).unwrap();
        }
        let users: Vec<_> = ctx
            .snapshot()
            .messages()
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .collect();
        assert_eq!(users, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_snapshot_is_immutable() {
        let ctx = context();
        ctx.append(Message::user("hello")).unwrap();
        let snapshot = ctx.snapshot();
        ctx.append(Message::assistant("hi there")).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(ctx.len(), 3);
    }

    #[test]
    fn test_tool_exchange_round_trip() {
        let ctx = context();
        ctx.append(Message::user("where are you?")).unwrap();
        ctx.append(Message::assistant_with_tools(
            "",
            vec![ToolCall::new("t1", "get_location"), ToolCall::new("t2", "get_location")],
        ))
        .unwrap();
        assert_eq!(ctx.pending_tool_calls(), vec!["t1", "t2"]);

        ctx.append(Message::tool("123 Main St", "t1")).unwrap();
        ctx.append(Message::tool("123 Main St", "t2")).unwrap();
        assert!(ctx.pending_tool_calls().is_empty());
        ctx.append(Message::assistant("We're at 123 Main Street.")).unwrap();
    }

    #[test]
    fn test_orphan_tool_result_rejected() {
        let ctx = context();
        let err = ctx.append(Message::tool("result", "nope")).unwrap_err();
        assert!(matches!(err, Error::InvalidMessageOrder(_)));
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    fn test_out_of_order_result_rejected() {
        let ctx = context();
        ctx.append(Message::assistant_with_tools(
            "",
            vec![ToolCall::new("t1", "a"), ToolCall::new("t2", "b")],
        ))
        .unwrap();
        assert!(ctx.append(Message::tool("b", "t2")).is_err());
        assert!(ctx.append(Message::tool("a", "t1")).is_ok());
    }

    #[test]
    fn test_reused_correlation_id_rejected() {
        let ctx = context();
        ctx.append(Message::assistant_with_tools("", vec![ToolCall::new("t1", "a")]))
            .unwrap();
        ctx.append(Message::tool("ok", "t1")).unwrap();

        let err = ctx
            .append(Message::assistant_with_tools("", vec![ToolCall::new("t1", "a")]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidMessageOrder(_)));

        let err = ctx
            .append(Message::assistant_with_tools(
                "",
                vec![ToolCall::new("t2", "a"), ToolCall::new("t2", "b")],
            ))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidMessageOrder(_)));
        assert!(ctx.pending_tool_calls().is_empty());
    }

    #[test]
    fn test_duplicate_tool_result_rejected() {
        let ctx = context();
        ctx.append(Message::assistant_with_tools("", vec![ToolCall::new("t1", "a")]))
            .unwrap();
        ctx.append(Message::tool("ok", "t1")).unwrap();
        assert!(ctx.append(Message::tool("again", "t1")).is_err());
    }

    #[test]
    fn test_user_blocked_while_results_outstanding() {
        let ctx = context();
        ctx.append(Message::assistant_with_tools("", vec![ToolCall::new("t1", "a")]))
            .unwrap();
        assert!(ctx.append(Message::user("hello?")).is_err());
        ctx.append(Message::tool("ok", "t1")).unwrap();
        assert!(ctx.append(Message::user("hello?")).is_ok());
    }

    #[test]
    fn test_render_transcript_labels() {
        let ctx = context();
        ctx.append(Message::system("A caller just connected.")).unwrap();
        ctx.append(Message::assistant("Hello, thank you for calling.")).unwrap();
        ctx.append(Message::user("Where are you?")).unwrap();
        ctx.append(Message::assistant_with_tools("", vec![ToolCall::new("t1", "get_location")]))
            .unwrap();
        ctx.append(Message::tool("123 Main St", "t1")).unwrap();
        ctx.append(Message::assistant("We're on Main Street.")).unwrap();

        let policy = TranscriptPolicy::default();
        assert_eq!(
            ctx.render_transcript(&policy),
            "Receptionist: Hello, thank you for calling.\n\
             Caller: Where are you?\n\
             Receptionist: We're on Main Street."
        );

        let verbose = TranscriptPolicy {
            include_tool_notes: true,
            ..TranscriptPolicy::default()
        };
        assert!(ctx
            .render_transcript(&verbose)
            .contains("[Tool: get_location] 123 Main St"));
    }

    #[test]
    fn test_render_empty_conversation() {
        assert_eq!(context().render_transcript(&TranscriptPolicy::default()), "");
    }
}
