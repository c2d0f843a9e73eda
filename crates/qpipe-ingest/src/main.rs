//! qpipe - CSV to queue to enrichment API pipeline

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use qpipe_common::logging::{init_logging, LogConfig, LogLevel};
use qpipe_ingest::config::{PipelineConfig, QueueBackend, StoreBackend};
use qpipe_ingest::consumer::{Consumer, ConsumerReport};
use qpipe_ingest::enrich::HttpEnricher;
use qpipe_ingest::producer::{Producer, ProducerReport};
use qpipe_ingest::progress::{progress_for, ProgressMode};
use qpipe_ingest::queue::{self, Queue};
use qpipe_ingest::source::RecordSource;
use qpipe_ingest::store;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "qpipe")]
#[command(author, version, about = "Queue-based CSV enrichment pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    overrides: Overrides,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// How to show per-item progress
    #[arg(long, value_enum, default_value_t = ProgressMode::Auto, global = true)]
    progress: ProgressMode,
}

/// Flags that override environment configuration
#[derive(Args, Debug)]
struct Overrides {
    /// Queue backend (sqs, memory)
    #[arg(long, global = true)]
    queue_backend: Option<QueueBackend>,

    /// Queue name
    #[arg(long, global = true)]
    queue_name: Option<String>,

    /// Artifact store backend (fs, s3)
    #[arg(long, global = true)]
    store_backend: Option<StoreBackend>,

    /// Artifact directory for the fs store
    #[arg(long, global = true)]
    store_path: Option<PathBuf>,

    /// Enrichment API key
    #[arg(long, env = "QPIPE_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Publish every CSV row as a queue message
    Enqueue {
        /// Directory holding the input files
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// Input file extension
        #[arg(short, long)]
        extension: Option<String>,
    },

    /// Drain the queue, enrich each message and store the result
    Work {
        /// Number of concurrent consumer loops
        #[arg(short, long, default_value_t = 1)]
        workers: usize,
    },

    /// Enqueue, then drain, in one process
    Run {
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        #[arg(short, long, default_value_t = 1)]
        workers: usize,
    },
}

impl Overrides {
    fn apply(self, config: &mut PipelineConfig) {
        if let Some(backend) = self.queue_backend {
            config.queue.backend = backend;
        }
        if let Some(name) = self.queue_name {
            config.queue.name = name;
        }
        if let Some(backend) = self.store_backend {
            config.store.backend = backend;
        }
        if let Some(path) = self.store_path {
            config.store.path = path;
        }
        if let Some(key) = self.api_key {
            config.enrichment.api_key = key;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over the flag
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("qpipe")
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    let mut config = PipelineConfig::load().context("Failed to load configuration")?;
    cli.overrides.apply(&mut config);

    match cli.command {
        Command::Enqueue {
            data_dir,
            extension,
        } => {
            if let Some(dir) = data_dir {
                config.source.data_dir = dir;
            }
            if let Some(ext) = extension {
                config.source.extension = ext.trim_start_matches('.').to_string();
            }
            config.validate()?;

            let queue = queue::connect(&config.queue).await?;
            enqueue(&config, queue, cli.progress).await?;
        },
        Command::Work { workers } => {
            config.validate()?;

            let queue = queue::connect(&config.queue).await?;
            work(&config, queue, workers, cli.progress).await?;
        },
        Command::Run { data_dir, workers } => {
            if let Some(dir) = data_dir {
                config.source.data_dir = dir;
            }
            config.validate()?;

            let queue = queue::connect(&config.queue).await?;
            enqueue(&config, queue.clone(), cli.progress).await?;
            work(&config, queue, workers, cli.progress).await?;
        },
    }

    Ok(())
}

async fn enqueue(
    config: &PipelineConfig,
    queue: Arc<dyn Queue>,
    progress: ProgressMode,
) -> Result<ProducerReport> {
    info!(
        dir = %config.source.data_dir.display(),
        extension = %config.source.extension,
        queue = %queue.name(),
        "Enqueueing records"
    );

    let records = RecordSource::open(&config.source.data_dir, &config.source.extension)?;
    let producer = Producer::new(queue, progress_for(progress, "Queued"));

    let report = producer.run(records).await?;
    info!(published = report.published, files = report.files, "Enqueue finished");
    Ok(report)
}

async fn work(
    config: &PipelineConfig,
    queue: Arc<dyn Queue>,
    workers: usize,
    progress: ProgressMode,
) -> Result<ConsumerReport> {
    let enricher = Arc::new(HttpEnricher::new(&config.enrichment)?);
    let store = store::open(&config.store).await?;

    let consumer = Consumer::new(
        queue,
        enricher,
        store,
        progress_for(progress, "Processed"),
        config.enrichment.key_field.clone(),
    );

    let report = consumer.drain_with_workers(workers).await?;
    info!(
        processed = report.processed,
        skipped = report.skipped(),
        "Work finished"
    );
    Ok(report)
}
