//! Receptionist Server
//!
//! Bootstraps the call core and exposes its operational HTTP endpoints.

pub mod http;
pub mod metrics;
pub mod state;
pub mod unconfigured;

pub use http::create_router;
pub use metrics::{init_metrics, register_metrics, set_active_sessions};
pub use state::AppState;
pub use unconfigured::unconfigured_services;

use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] receptionist_config::ConfigError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] receptionist_persistence::PersistenceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session error: {0}")]
    Session(#[from] receptionist_agent::AgentError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ServerError> for axum::http::StatusCode {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::Session(receptionist_agent::AgentError::CapacityReached(_)) => {
                axum::http::StatusCode::SERVICE_UNAVAILABLE
            },
            ServerError::Session(_) => axum::http::StatusCode::NOT_FOUND,
            ServerError::Persistence(_) => axum::http::StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Config(_) | ServerError::Io(_) | ServerError::Internal(_) => {
                axum::http::StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }
}
