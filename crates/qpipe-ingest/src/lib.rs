//! qpipe ingestion pipeline
//!
//! Two loops that only talk through a queue:
//!
//! - the **producer** reads CSV files, turns each row into a JSON message and
//!   publishes it
//! - the **consumer** drains the queue, looks each message's key up against an
//!   HTTP API and stores the response as an artifact
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use qpipe_ingest::config::PipelineConfig;
//! use qpipe_ingest::enrich::HttpEnricher;
//! use qpipe_ingest::progress::{progress_for, ProgressMode};
//! use qpipe_ingest::{consumer::Consumer, producer::Producer, queue, source::RecordSource, store};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = PipelineConfig::load()?;
//!     config.validate()?;
//!     let queue = queue::connect(&config.queue).await?;
//!
//!     let records = RecordSource::open(&config.source.data_dir, &config.source.extension)?;
//!     Producer::new(queue.clone(), progress_for(ProgressMode::Auto, "Queued"))
//!         .run(records)
//!         .await?;
//!
//!     let consumer = Consumer::new(
//!         queue,
//!         Arc::new(HttpEnricher::new(&config.enrichment)?),
//!         store::open(&config.store).await?,
//!         progress_for(ProgressMode::Auto, "Processed"),
//!         config.enrichment.key_field.clone(),
//!     );
//!     consumer.run().await?;
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod codec;
pub mod config;
pub mod consumer;
pub mod enrich;
pub mod error;
pub mod producer;
pub mod progress;
pub mod queue;
pub mod record;
pub mod source;
pub mod store;

pub use error::{IngestError, Result};
pub use record::Record;
