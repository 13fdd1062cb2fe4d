//! Informational tools: hours, location, FAQ

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use receptionist_config::BusinessProfile;
use receptionist_core::{Message, ToolArguments, ToolDefinition};

use super::required_str;
use crate::{ToolError, ToolHandler, ToolSession};

/// Business hours lookup
pub struct BusinessHoursTool {
    profile: Arc<BusinessProfile>,
}

impl BusinessHoursTool {
    pub fn new(profile: Arc<BusinessProfile>) -> Self {
        Self { profile }
    }
}

#[async_trait]
impl ToolHandler for BusinessHoursTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::without_parameters(
            "get_business_hours",
            format!("Get the business hours for {}", self.profile.company_name),
        )
    }

    async fn call(
        &self,
        _arguments: &ToolArguments,
        session: &dyn ToolSession,
        _context: &[Message],
    ) -> Result<String, ToolError> {
        session.set_intent("hours_inquiry");
        Ok(self.profile.business_hours.clone())
    }
}

/// Office address lookup
pub struct LocationTool {
    profile: Arc<BusinessProfile>,
}

impl LocationTool {
    pub fn new(profile: Arc<BusinessProfile>) -> Self {
        Self { profile }
    }
}

#[async_trait]
impl ToolHandler for LocationTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::without_parameters(
            "get_location",
            format!("Get the office location and address for {}", self.profile.company_name),
        )
    }

    async fn call(
        &self,
        _arguments: &ToolArguments,
        session: &dyn ToolSession,
        _context: &[Message],
    ) -> Result<String, ToolError> {
        session.set_intent("location_inquiry");
        Ok(self.profile.location.clone())
    }
}

/// Keyword FAQ lookup
///
/// Does not touch the intent; the model classifies FAQ calls through
/// `log_caller_intent`.
pub struct FaqTool {
    profile: Arc<BusinessProfile>,
}

impl FaqTool {
    pub fn new(profile: Arc<BusinessProfile>) -> Self {
        Self { profile }
    }
}

#[async_trait]
impl ToolHandler for FaqTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "get_faq_answer",
            "Look up the answer to a frequently asked question about pricing, trials, support or refunds",
            json!({
                "type": "object",
                "properties": {
                    "question": {
                        "type": "string",
                        "description": "The caller's question"
                    }
                },
                "required": ["question"]
            }),
        )
    }

    async fn call(
        &self,
        arguments: &ToolArguments,
        _session: &dyn ToolSession,
        _context: &[Message],
    ) -> Result<String, ToolError> {
        let question = required_str(arguments, "question", "get_faq_answer")?;
        Ok(self.profile.faq_answer(question).to_string())
    }
}
