//! Tool dispatch for the receptionist call agent
//!
//! The registry binds tool names to handlers and executes model tool-call
//! requests with per-tool timeouts. The receptionist module provides the
//! front-desk tool set.

pub mod error;
pub mod receptionist;
pub mod registry;
pub mod session;

pub use error::ToolError;
pub use receptionist::{create_receptionist_registry, Department};
pub use registry::{ToolHandler, ToolInvocation, ToolOutcome, ToolRegistry};
pub use session::ToolSession;
