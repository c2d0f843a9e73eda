//! Producer loop
//!
//! Encodes every record from the source and publishes it to the queue, one
//! at a time. The first failure ends the run; messages already published stay
//! in the queue.

use crate::codec;
use crate::error::Result;
use crate::progress::Progress;
use crate::queue::Queue;
use crate::record::Record;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument};

/// Outcome of a completed producer run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProducerReport {
    pub published: u64,
    /// Files that contributed at least one record
    pub files: usize,
    pub elapsed: Duration,
}

impl fmt::Display for ProducerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "End of data files reached in {:.1}s. {} rows queued from {} files.",
            self.elapsed.as_secs_f64(),
            self.published,
            self.files
        )
    }
}

pub struct Producer {
    queue: Arc<dyn Queue>,
    progress: Arc<dyn Progress>,
}

impl Producer {
    pub fn new(queue: Arc<dyn Queue>, progress: Arc<dyn Progress>) -> Self {
        Self { queue, progress }
    }

    /// Publish every record, in order.
    ///
    /// Source and publish errors abort the run and are returned as-is.
    #[instrument(skip_all, fields(queue = %self.queue.name()))]
    pub async fn run<I>(&self, records: I) -> Result<ProducerReport>
    where
        I: IntoIterator<Item = Result<(PathBuf, Record)>>,
    {
        let start = Instant::now();
        let mut report = ProducerReport::default();
        let mut current_file: Option<PathBuf> = None;

        for item in records {
            let (file, record) = item.inspect_err(|e| error!(error = %e, "Source failed"))?;

            if current_file.as_ref() != Some(&file) {
                debug!(file = %file.display(), "Publishing records from file");
                report.files += 1;
                current_file = Some(file);
            }

            let body = codec::encode(&record)?;
            self.queue
                .publish(body)
                .await
                .inspect_err(|e| error!(error = %e, published = report.published, "Publish failed"))?;

            report.published += 1;
            self.progress.tick();
        }

        report.elapsed = start.elapsed();
        info!(
            published = report.published,
            files = report.files,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Producer finished"
        );
        self.progress.finish(&report.to_string());

        Ok(report)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::IngestError;
    use crate::progress::SilentProgress;
    use crate::queue::InMemoryQueue;

    fn row(country: &str) -> Result<(PathBuf, Record)> {
        Ok((
            PathBuf::from("countries.csv"),
            [("country", country)].into_iter().collect(),
        ))
    }

    #[tokio::test]
    async fn test_publishes_each_record() {
        let queue = Arc::new(InMemoryQueue::new("test"));
        let producer = Producer::new(queue.clone(), Arc::new(SilentProgress));

        let report = producer
            .run(vec![row("France"), row("Mali")])
            .await
            .unwrap();

        assert_eq!(report.published, 2);
        assert_eq!(report.files, 1);
        assert_eq!(
            queue.visible_bodies(),
            [r#"{"country":"France"}"#, r#"{"country":"Mali"}"#]
        );
    }

    #[tokio::test]
    async fn test_source_error_aborts_after_partial_publish() {
        let queue = Arc::new(InMemoryQueue::new("test"));
        let producer = Producer::new(queue.clone(), Arc::new(SilentProgress));

        let records = vec![
            row("France"),
            Err(IngestError::source_read("bad.csv", "line 3 has 4 fields")),
            row("Mali"),
        ];
        let err = producer.run(records).await.unwrap_err();

        assert!(matches!(err, IngestError::SourceRead { .. }));
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_publish_failure_aborts() {
        let queue = Arc::new(InMemoryQueue::new("test"));
        queue.set_unavailable(true);
        let producer = Producer::new(queue.clone(), Arc::new(SilentProgress));

        let err = producer.run(vec![row("France")]).await.unwrap_err();
        assert!(matches!(err, IngestError::QueueUnavailable(_)));
    }

    #[test]
    fn test_report_display() {
        let report = ProducerReport {
            published: 5,
            files: 2,
            elapsed: Duration::from_millis(1500),
        };
        assert_eq!(
            report.to_string(),
            "End of data files reached in 1.5s. 5 rows queued from 2 files."
        );
    }
}
