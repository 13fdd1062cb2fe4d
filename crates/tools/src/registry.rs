//! Tool Registry
//!
//! Maps tool names to handlers and dispatches model tool-call requests.

use async_trait::async_trait;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use receptionist_core::{Message, ToolArguments, ToolCall, ToolDefinition};

use crate::error::ToolError;
use crate::session::ToolSession;

/// Default timeout for tool execution (10 seconds)
const DEFAULT_TOOL_TIMEOUT_MS: u64 = 10_000;

/// Handler bound to a tool name
///
/// Handlers may run after the turn that requested them was interrupted,
/// so they must be safe to complete even if nobody reads the result.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Schema advertised to the model
    fn definition(&self) -> ToolDefinition;

    /// Run the tool
    ///
    /// `context` is a read-only snapshot of the conversation at dispatch time.
    async fn call(
        &self,
        arguments: &ToolArguments,
        session: &dyn ToolSession,
        context: &[Message],
    ) -> Result<String, ToolError>;
}

/// One tool-call request, bound to the call that raised it
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    /// Correlation id copied from the model's tool call
    pub correlation_id: String,
    pub name: String,
    pub arguments: ToolArguments,
    pub call_id: String,
}

impl ToolInvocation {
    pub fn from_tool_call(call: &ToolCall, call_id: &str) -> Self {
        Self {
            correlation_id: call.id.clone(),
            name: call.name.clone(),
            arguments: call.arguments.clone(),
            call_id: call_id.to_string(),
        }
    }
}

/// Result of one dispatch
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub correlation_id: String,
    pub name: String,
    pub result: Result<String, ToolError>,
    pub duration_ms: u64,
}

impl ToolOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Tool-result message correlated with the originating request
    pub fn into_message(self) -> Message {
        let content = match self.result {
            Ok(text) => text,
            Err(e) => e.to_model_content(),
        };
        Message::tool(content, self.correlation_id)
    }
}

/// Tool registry
pub struct ToolRegistry {
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
    /// Registration order, for stable definitions
    order: Vec<String>,
    timeout: Duration,
}

impl ToolRegistry {
    /// Create a new empty registry with the default per-tool timeout
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_millis(DEFAULT_TOOL_TIMEOUT_MS))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            handlers: HashMap::new(),
            order: Vec::new(),
            timeout,
        }
    }

    /// Bind `name` to `handler`, replacing any previous binding
    pub fn register<H: ToolHandler + 'static>(&mut self, name: impl Into<String>, handler: H) {
        self.register_arc(name, Arc::new(handler));
    }

    pub fn register_arc(&mut self, name: impl Into<String>, handler: Arc<dyn ToolHandler>) {
        let name = name.into();
        if self.handlers.insert(name.clone(), handler).is_some() {
            tracing::debug!(tool = %name, "Replaced tool handler");
        } else {
            self.order.push(name);
        }
    }

    /// Get handler by name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ToolHandler>> {
        self.handlers.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Tool names in registration order
    pub fn tool_names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Definitions advertised to the model, in registration order
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| {
                self.handlers.get(name).map(|handler| {
                    let mut definition = handler.definition();
                    definition.name = name.clone();
                    definition
                })
            })
            .collect()
    }

    /// Execute one invocation with timeout protection
    ///
    /// Never fails: unknown tools, handler errors and timeouts become an
    /// error outcome that is reported back to the model.
    pub async fn dispatch(
        &self,
        invocation: &ToolInvocation,
        session: &dyn ToolSession,
        context: &[Message],
    ) -> ToolOutcome {
        let started = Instant::now();
        let result = match self.handlers.get(&invocation.name) {
            None => Err(ToolError::UnknownTool(invocation.name.clone())),
            Some(handler) => {
                tracing::trace!(
                    tool = %invocation.name,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Executing tool with timeout"
                );
                match tokio::time::timeout(
                    self.timeout,
                    handler.call(&invocation.arguments, session, context),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_elapsed) => Err(ToolError::Timeout {
                        tool: invocation.name.clone(),
                        timeout_ms: self.timeout.as_millis() as u64,
                    }),
                }
            },
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => tracing::info!(
                call_id = %invocation.call_id,
                tool = %invocation.name,
                correlation_id = %invocation.correlation_id,
                duration_ms,
                "Tool dispatched"
            ),
            Err(e) => tracing::warn!(
                call_id = %invocation.call_id,
                tool = %invocation.name,
                correlation_id = %invocation.correlation_id,
                duration_ms,
                error = %e,
                "Tool dispatch failed"
            ),
        }

        ToolOutcome {
            correlation_id: invocation.correlation_id.clone(),
            name: invocation.name.clone(),
            result,
            duration_ms,
        }
    }

    /// Execute a batch concurrently
    ///
    /// Outcomes are returned in request order regardless of completion order.
    pub async fn dispatch_all(
        &self,
        invocations: &[ToolInvocation],
        session: &dyn ToolSession,
        context: &[Message],
    ) -> Vec<ToolOutcome> {
        join_all(
            invocations
                .iter()
                .map(|invocation| self.dispatch(invocation, session, context)),
        )
        .await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
