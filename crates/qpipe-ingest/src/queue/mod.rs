//! Queue client
//!
//! A thin contract over the external queue service. Implementations never
//! retry; a failed call surfaces as [`QueueUnavailable`](crate::error::IngestError::QueueUnavailable).
//!
//! - [`SqsQueue`]: AWS SQS (or any SQS-compatible endpoint)
//! - [`InMemoryQueue`]: in-process queue with visibility semantics

use crate::config::{QueueBackend, QueueConfig};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub mod memory;
pub mod sqs;

pub use memory::InMemoryQueue;
pub use sqs::SqsQueue;

/// A message handed out by [`Queue::poll_next`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedMessage {
    /// Queue-assigned message id, stable across redeliveries
    pub id: String,
    pub body: String,
    /// Opaque handle for this particular delivery, used to delete it
    pub receipt: String,
}

#[async_trait]
pub trait Queue: Send + Sync {
    fn name(&self) -> &str;

    /// Admit a new message
    async fn publish(&self, body: String) -> Result<()>;

    /// Receive one visible message, or `None` when the queue has nothing to hand out.
    ///
    /// `None` is the drain's termination signal, not an error.
    async fn poll_next(&self) -> Result<Option<QueuedMessage>>;

    /// Remove a delivered message. An expired or unknown receipt is not an error.
    async fn delete(&self, message: &QueuedMessage) -> Result<()>;

    /// Approximate number of visible messages, if the backend can tell
    async fn approximate_len(&self) -> Result<Option<u64>> {
        Ok(None)
    }
}

/// Build the queue selected by `config`
pub async fn connect(config: &QueueConfig) -> Result<Arc<dyn Queue>> {
    match config.backend {
        QueueBackend::Sqs => Ok(Arc::new(SqsQueue::connect(config).await?)),
        QueueBackend::Memory => Ok(Arc::new(InMemoryQueue::new(&config.name))),
    }
}
