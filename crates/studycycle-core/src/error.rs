//! Core error types for studycycle-core.
//!
//! Settings validation, configuration-file handling and engine invariant
//! violations each get their own `thiserror` enum; [`CoreError`] wraps them.

use std::path::PathBuf;
use thiserror::Error;

use crate::phase::Phase;

/// Core error type for studycycle-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The settings record was rejected by the duration resolver
    #[error("Invalid settings: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Configuration file errors
    #[error("Configuration file error: {0}")]
    Config(#[from] ConfigError),

    /// An internal operation was attempted from a sub-state that cannot honor it.
    #[error("Invalid transition: cannot {action} while {phase:?}")]
    InvalidTransition { phase: Phase, action: &'static str },

    /// The service task is gone (shut down or panicked)
    #[error("Cycle service is no longer running")]
    ServiceClosed,
}

/// Rejections produced while resolving a [`Settings`](crate::Settings) record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A duration that must be strictly positive was zero
    #[error("'{field}' must be greater than zero")]
    NonPositiveDuration { field: &'static str },

    /// Alarm bounds are inverted
    #[error("minimum alarm interval ({min}) is greater than maximum ({max})")]
    IntervalBoundsInverted { min: u32, max: u32 },

    /// An alarm bound does not fit inside the study session
    #[error("'{field}' ({value}) exceeds the study duration ({study})")]
    IntervalExceedsStudy {
        field: &'static str,
        value: u32,
        study: u32,
    },
}

/// Configuration-file errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// The resulting settings failed validation
    #[error(transparent)]
    Rejected(#[from] ConfigurationError),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
