//! Call routing tools: transfers and intent logging

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use receptionist_config::BusinessProfile;
use receptionist_core::{Message, ToolArguments, ToolDefinition};

use super::required_str;
use crate::{ToolError, ToolHandler, ToolSession};

/// Departments a caller can be routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Department {
    Sales,
    Support,
}

impl Department {
    pub fn as_str(&self) -> &'static str {
        match self {
            Department::Sales => "sales",
            Department::Support => "support",
        }
    }

    /// Intent recorded when the caller is transferred
    pub fn transfer_intent(&self) -> &'static str {
        match self {
            Department::Sales => "sales_transfer",
            Department::Support => "support_transfer",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "sales" => Some(Department::Sales),
            "support" => Some(Department::Support),
            _ => None,
        }
    }
}

/// Simulated live transfer to one department
pub struct TransferTool {
    department: Department,
    reply: String,
}

impl TransferTool {
    pub fn sales(profile: &BusinessProfile) -> Self {
        Self {
            department: Department::Sales,
            reply: profile.sales_transfer_reply.clone(),
        }
    }

    pub fn support(profile: &BusinessProfile) -> Self {
        Self {
            department: Department::Support,
            reply: profile.support_transfer_reply.clone(),
        }
    }

    pub fn tool_name(&self) -> String {
        format!("transfer_to_{}", self.department.as_str())
    }
}

#[async_trait]
impl ToolHandler for TransferTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::without_parameters(
            self.tool_name(),
            format!("Transfer the caller to the {} team", self.department.as_str()),
        )
    }

    async fn call(
        &self,
        _arguments: &ToolArguments,
        session: &dyn ToolSession,
        _context: &[Message],
    ) -> Result<String, ToolError> {
        session.set_intent(self.department.transfer_intent());
        tracing::info!(
            call_id = %session.call_id(),
            caller_id = %session.caller_id(),
            department = self.department.as_str(),
            "Transferring caller"
        );
        Ok(self.reply.clone())
    }
}

/// Free-form intent classification by the model
pub struct LogCallerIntentTool;

#[async_trait]
impl ToolHandler for LogCallerIntentTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "log_caller_intent",
            "Log the detected caller intent for call tracking purposes",
            json!({
                "type": "object",
                "properties": {
                    "intent": {
                        "type": "string",
                        "description": "Intent category: sales, support, faq, or other"
                    },
                    "summary": {
                        "type": "string",
                        "description": "Brief summary of what the caller needs"
                    }
                },
                "required": ["intent", "summary"]
            }),
        )
    }

    async fn call(
        &self,
        arguments: &ToolArguments,
        session: &dyn ToolSession,
        _context: &[Message],
    ) -> Result<String, ToolError> {
        let intent = required_str(arguments, "intent", "log_caller_intent")?;
        let summary = required_str(arguments, "summary", "log_caller_intent")?;

        session.set_intent(intent);
        session.add_note(&format!("[Intent: {}] {}", intent, summary));
        Ok(format!(
            "Intent recorded as: {}. Continue helping the caller.",
            intent
        ))
    }
}

/// Callback request routed to any department
pub struct TransferToDepartmentTool {
    profile: Arc<BusinessProfile>,
}

impl TransferToDepartmentTool {
    pub fn new(profile: Arc<BusinessProfile>) -> Self {
        Self { profile }
    }
}

#[async_trait]
impl ToolHandler for TransferToDepartmentTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "transfer_to_department",
            "Hand the caller off to a department for a follow-up call",
            json!({
                "type": "object",
                "properties": {
                    "department": {
                        "type": "string",
                        "description": "Department to transfer to (sales or support)"
                    },
                    "caller_name": {
                        "type": "string",
                        "description": "The caller's name if provided"
                    },
                    "reason": {
                        "type": "string",
                        "description": "Brief reason for the transfer"
                    }
                },
                "required": ["department", "reason"]
            }),
        )
    }

    async fn call(
        &self,
        arguments: &ToolArguments,
        session: &dyn ToolSession,
        _context: &[Message],
    ) -> Result<String, ToolError> {
        let department = required_str(arguments, "department", "transfer_to_department")?;
        let reason = required_str(arguments, "reason", "transfer_to_department")?;
        let caller_name = arguments
            .get("caller_name")
            .and_then(|v| v.as_str())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or("Caller");

        session.add_note(&format!(
            "[Transfer: {}] {} - {}",
            department, caller_name, reason
        ));
        tracing::info!(
            call_id = %session.call_id(),
            department,
            "Department follow-up requested"
        );

        let reply = match Department::parse(department) {
            Some(Department::Sales) => self.profile.sales_followup_reply.clone(),
            Some(Department::Support) => self.profile.support_followup_reply.clone(),
            None => format!(
                "I've forwarded your request to the {} team. \
                 Someone will get back to you shortly. Is there anything else?",
                department
            ),
        };
        Ok(reply)
    }
}
