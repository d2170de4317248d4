//! Error types for the throttle crate.

use thiserror::Error;

/// Main error type for throttle operations.
#[derive(Error, Debug)]
pub enum ThrottleError {
    /// A limiter was given a zero budget or a non-positive window
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Configuration file parsing errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Layered settings (file + environment) errors
    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),
}

/// Result type alias for throttle operations.
pub type Result<T> = std::result::Result<T, ThrottleError>;
