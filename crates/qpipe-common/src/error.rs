//! Error types shared across qpipe crates

use thiserror::Error;

/// Result type alias for qpipe operations
pub type Result<T> = std::result::Result<T, QpipeError>;

/// Main error type for the shared library
#[derive(Error, Debug)]
pub enum QpipeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The key contains nothing that survives normalization.
    #[error("Key '{0}' does not produce a usable artifact name")]
    UnnameableKey(String),
}

impl QpipeError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
