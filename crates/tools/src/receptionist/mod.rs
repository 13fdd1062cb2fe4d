//! Receptionist tool set
//!
//! Front-desk tools backed by the configured [`BusinessProfile`]. Each tool
//! that classifies the call sets the caller intent on the session.

mod info;
mod routing;

pub use info::{BusinessHoursTool, FaqTool, LocationTool};
pub use routing::{Department, LogCallerIntentTool, TransferToDepartmentTool, TransferTool};

use std::sync::Arc;
use std::time::Duration;

use receptionist_config::BusinessProfile;
use receptionist_core::ToolArguments;

use crate::{ToolError, ToolRegistry};

/// Build the registry every call session shares
pub fn create_receptionist_registry(profile: &BusinessProfile, timeout: Duration) -> ToolRegistry {
    let profile = Arc::new(profile.clone());
    let mut registry = ToolRegistry::with_timeout(timeout);

    registry.register("get_business_hours", BusinessHoursTool::new(profile.clone()));
    registry.register("get_location", LocationTool::new(profile.clone()));
    registry.register("transfer_to_sales", TransferTool::sales(&profile));
    registry.register("transfer_to_support", TransferTool::support(&profile));
    registry.register("get_faq_answer", FaqTool::new(profile.clone()));
    registry.register("log_caller_intent", LogCallerIntentTool);
    registry.register(
        "transfer_to_department",
        TransferToDepartmentTool::new(profile.clone()),
    );

    tracing::info!(
        company = %profile.company_name,
        tool_count = registry.len(),
        "Created receptionist tool registry"
    );

    registry
}

/// Non-empty string argument or `InvalidArguments`
pub(crate) fn required_str<'a>(
    arguments: &'a ToolArguments,
    key: &str,
    tool: &str,
) -> Result<&'a str, ToolError> {
    arguments
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ToolError::invalid_params(tool, format!("{} is required", key)))
}
