//! Consumer loop
//!
//! Drains the queue until it reports empty. For each message:
//!
//! 1. decode the body into a record
//! 2. read the enrichment key from the configured field
//! 3. look the key up against the enrichment API
//! 4. write the response as an artifact named after the key
//! 5. delete the message
//!
//! A failure in steps 1-4 is confined to that message: it is reported and
//! the message stays in the queue for redelivery. A message is deleted only
//! after its artifact is written. Queue failures end the drain.

use crate::codec;
use crate::enrich::Enricher;
use crate::error::{IngestError, Result};
use crate::progress::Progress;
use crate::queue::{Queue, QueuedMessage};
use crate::record::Record;
use crate::store::ArtifactStore;
use futures::future::try_join_all;
use qpipe_common::naming::artifact_name;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

/// Drain state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainState {
    Draining,
    Done,
}

/// A message that could not be processed and was left in the queue
#[derive(Debug)]
pub struct MessageFailure {
    pub message_id: String,
    pub error: IngestError,
}

/// Outcome of a completed drain
#[derive(Debug, Default)]
pub struct ConsumerReport {
    pub processed: u64,
    pub failures: Vec<MessageFailure>,
    pub elapsed: Duration,
}

impl ConsumerReport {
    /// Messages left undeleted because of a per-message error
    pub fn skipped(&self) -> usize {
        self.failures.len()
    }

    fn merge(&mut self, other: ConsumerReport) {
        self.processed += other.processed;
        self.failures.extend(other.failures);
    }
}

impl fmt::Display for ConsumerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "End of queue reached in {:.1}s. {} messages processed, {} skipped.",
            self.elapsed.as_secs_f64(),
            self.processed,
            self.skipped()
        )
    }
}

#[derive(Clone)]
pub struct Consumer {
    queue: Arc<dyn Queue>,
    enricher: Arc<dyn Enricher>,
    store: Arc<dyn ArtifactStore>,
    progress: Arc<dyn Progress>,
    key_field: String,
}

impl Consumer {
    pub fn new(
        queue: Arc<dyn Queue>,
        enricher: Arc<dyn Enricher>,
        store: Arc<dyn ArtifactStore>,
        progress: Arc<dyn Progress>,
        key_field: impl Into<String>,
    ) -> Self {
        Self {
            queue,
            enricher,
            store,
            progress,
            key_field: key_field.into(),
        }
    }

    /// Read the enrichment key out of a record
    pub fn extract_key<'r>(record: &'r Record, field: &str) -> Result<&'r str> {
        match record.get(field).map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            Some(_) => Err(IngestError::malformed(format!("field '{}' is empty", field))),
            None => Err(IngestError::malformed(format!("field '{}' is missing", field))),
        }
    }

    /// Drain the queue with a single worker
    pub async fn run(&self) -> Result<ConsumerReport> {
        self.drain_with_workers(1).await
    }

    /// Drain the queue with `workers` loops sharing it.
    ///
    /// Each worker finishes one message before polling the next; the queue
    /// keeps two workers from receiving the same delivery. The first queue
    /// failure ends the whole drain.
    #[instrument(skip(self), fields(queue = %self.queue.name()))]
    pub async fn drain_with_workers(&self, workers: usize) -> Result<ConsumerReport> {
        let start = Instant::now();

        match self.queue.approximate_len().await {
            Ok(Some(depth)) => info!(depth, workers, "Draining queue"),
            Ok(None) => info!(workers, "Draining queue"),
            Err(e) => warn!(error = %e, "Could not read queue depth"),
        }

        let loops = (0..workers.max(1)).map(|worker| self.drain(worker));
        let mut report = ConsumerReport::default();
        for worker_report in try_join_all(loops).await? {
            report.merge(worker_report);
        }

        report.elapsed = start.elapsed();
        info!(
            processed = report.processed,
            skipped = report.skipped(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Consumer finished"
        );
        self.progress.finish(&report.to_string());

        Ok(report)
    }

    /// One worker's Draining -> Done loop
    async fn drain(&self, worker: usize) -> Result<ConsumerReport> {
        let mut report = ConsumerReport::default();
        let mut state = DrainState::Draining;

        while state == DrainState::Draining {
            state = self.step(worker, &mut report).await?;
        }

        debug!(worker, processed = report.processed, "Worker done");
        Ok(report)
    }

    async fn step(&self, worker: usize, report: &mut ConsumerReport) -> Result<DrainState> {
        let Some(message) = self
            .queue
            .poll_next()
            .await
            .inspect_err(|e| error!(worker, error = %e, "Poll failed"))?
        else {
            return Ok(DrainState::Done);
        };

        match self.process(&message).await {
            Ok(location) => {
                debug!(worker, message_id = %message.id, location = %location, "Message processed");
                report.processed += 1;
                self.progress.tick();
            },
            Err(e) if e.is_message_local() => {
                warn!(worker, message_id = %message.id, error = %e, "Message left in queue");
                report.failures.push(MessageFailure {
                    message_id: message.id,
                    error: e,
                });
            },
            Err(e) => {
                error!(worker, message_id = %message.id, error = %e, "Drain aborted");
                return Err(e);
            },
        }

        Ok(DrainState::Draining)
    }

    /// Decode, enrich, persist, then delete
    async fn process(&self, message: &QueuedMessage) -> Result<String> {
        let record = codec::decode(&message.body)?;
        let key = Self::extract_key(&record, &self.key_field)?;
        let name = artifact_name(key)?;

        let content = self.enricher.lookup(key).await?;
        let location = self.store.put(&name, &content).await?;
        self.queue.delete(message).await?;

        Ok(location)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_key() {
        let record: Record = [("country", " France "), ("blank", "  ")].into_iter().collect();

        assert_eq!(Consumer::extract_key(&record, "country").unwrap(), "France");
        assert!(matches!(
            Consumer::extract_key(&record, "blank"),
            Err(IngestError::MalformedPayload(_))
        ));
        assert!(matches!(
            Consumer::extract_key(&record, "capital"),
            Err(IngestError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_report_display_and_merge() {
        let mut report = ConsumerReport {
            processed: 3,
            ..Default::default()
        };
        report.merge(ConsumerReport {
            processed: 1,
            failures: vec![MessageFailure {
                message_id: "m-1".into(),
                error: IngestError::malformed("bad"),
            }],
            elapsed: Duration::ZERO,
        });
        report.elapsed = Duration::from_secs(2);

        assert_eq!(report.processed, 4);
        assert_eq!(report.skipped(), 1);
        assert_eq!(
            report.to_string(),
            "End of queue reached in 2.0s. 4 messages processed, 1 skipped."
        );
    }
}
