//! Error types for the ingestion pipeline
//!
//! Errors fall into two groups. Connection-level failures (`SourceRead`,
//! `QueueUnavailable`, `Config`) end the loop that hit them. Message-level
//! failures (`MalformedPayload`, `EnrichmentRequestFailed`,
//! `EnrichmentUnreachable`, `StorageWrite`) are confined to one message: the
//! consumer reports them, leaves the message in the queue and moves on.

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Error, Debug)]
pub enum IngestError {
    /// Input file unreadable or a row does not fit the header
    #[error("Failed to read source '{path}': {message}")]
    SourceRead { path: String, message: String },

    /// Queue service unreachable or it rejected the operation
    #[error("Queue unavailable: {0}")]
    QueueUnavailable(String),

    /// Message body does not decode, or carries no usable enrichment key
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Enrichment API answered with a non-success status
    #[error("Enrichment request for '{key}' failed with HTTP {status}")]
    EnrichmentRequestFailed { key: String, status: u16 },

    /// Enrichment API could not be reached (DNS, connect, timeout)
    #[error("Enrichment API unreachable for '{key}': {message}")]
    EnrichmentUnreachable { key: String, message: String },

    /// Artifact could not be persisted
    #[error("Failed to write artifact '{name}': {message}")]
    StorageWrite { name: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl IngestError {
    pub fn source_read(path: impl Into<String>, message: impl ToString) -> Self {
        Self::SourceRead {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn queue(message: impl ToString) -> Self {
        Self::QueueUnavailable(message.to_string())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedPayload(message.into())
    }

    pub fn storage(name: impl Into<String>, message: impl ToString) -> Self {
        Self::StorageWrite {
            name: name.into(),
            message: message.to_string(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether the failure is confined to a single message.
    ///
    /// Message-local failures leave the message undeleted and let the drain
    /// continue; everything else terminates the loop.
    pub fn is_message_local(&self) -> bool {
        matches!(
            self,
            IngestError::MalformedPayload(_)
                | IngestError::EnrichmentRequestFailed { .. }
                | IngestError::EnrichmentUnreachable { .. }
                | IngestError::StorageWrite { .. }
        )
    }
}

impl From<qpipe_common::QpipeError> for IngestError {
    fn from(err: qpipe_common::QpipeError) -> Self {
        match err {
            qpipe_common::QpipeError::UnnameableKey(key) => {
                IngestError::MalformedPayload(format!("key '{}' has no usable artifact name", key))
            },
            qpipe_common::QpipeError::Config(msg) => IngestError::Config(msg),
            other => IngestError::Config(other.to_string()),
        }
    }
}
