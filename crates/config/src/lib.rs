//! Configuration for the call-flow runtime
//!
//! Settings are layered from `config/default.yaml`, an optional
//! `config/{env}.yaml`, and `CALLFLOW__`-prefixed environment variables.

pub mod settings;

pub use settings::{
    load_settings, CollaboratorConfig, ReasonerConfig, RuntimeEnvironment, ServerConfig, Settings,
    SynthesizerConfig, TranscriberConfig,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Configuration error: {0}")]
    Load(#[from] config::ConfigError),
}
