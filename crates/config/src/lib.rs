//! Configuration management for the receptionist call agent
//!
//! Supports loading configuration from:
//! - YAML files (`config/default.yaml`, `config/{env}.yaml`)
//! - Environment variables (`RECEPTIONIST__` prefix, `__` separator)

pub mod agent;
pub mod business;
pub mod settings;

pub use agent::{AgentConfig, TurnConfig};
pub use business::{BusinessProfile, FaqEntry};
pub use settings::{
    load_settings, load_settings_from, ObservabilityConfig, PersistenceConfig, RuntimeEnvironment,
    ServerConfig, Settings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
