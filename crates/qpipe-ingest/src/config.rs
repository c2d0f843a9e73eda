//! Pipeline configuration
//!
//! Every constant the producer and consumer need lives in one
//! [`PipelineConfig`] passed to their constructors. Values come from the
//! defaults below, overridden by environment variables (a `.env` file is
//! honored), overridden in turn by CLI flags.

use crate::error::{IngestError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

// ============================================================================
// Pipeline Configuration Constants
// ============================================================================

/// Default directory scanned for input files.
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Default input file extension.
pub const DEFAULT_FILE_EXTENSION: &str = "csv";

/// Default queue name shared by producer and consumer.
pub const DEFAULT_QUEUE_NAME: &str = "rest-ingestion-course";

/// Default AWS region for the queue and the S3 store.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default long-poll wait for a receive call, in seconds. Zero means a short poll.
pub const DEFAULT_QUEUE_WAIT_SECS: i32 = 1;

/// Default visibility timeout for a received message, in seconds.
///
/// A message that fails processing stays invisible this long, so it should
/// exceed the expected length of one drain.
pub const DEFAULT_VISIBILITY_TIMEOUT_SECS: i32 = 600;

/// Largest visibility timeout SQS accepts (12 hours).
pub const MAX_VISIBILITY_TIMEOUT_SECS: i32 = 43_200;

/// Default enrichment endpoint.
pub const DEFAULT_API_URL: &str = "http://capitolwords.org/api/1/phrases/legislator.json";

/// Default page-size limit sent with each lookup.
pub const DEFAULT_API_PER_PAGE: u32 = 20;

/// Default start of the lookup date range.
pub const DEFAULT_API_START_DATE: &str = "2014-01-01";

/// Default end of the lookup date range.
pub const DEFAULT_API_END_DATE: &str = "2015-04-01";

/// Default HTTP timeout for a lookup, in seconds.
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 30;

/// Default record field holding the enrichment key.
pub const DEFAULT_KEY_FIELD: &str = "country";

/// Default artifact directory.
pub const DEFAULT_STORE_PATH: &str = "./store";

/// Date format used by the enrichment API.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Which queue implementation to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QueueBackend {
    #[default]
    Sqs,
    /// In-process queue; only meaningful when producer and consumer share a process
    Memory,
}

impl FromStr for QueueBackend {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "sqs" => Ok(QueueBackend::Sqs),
            "memory" | "mem" => Ok(QueueBackend::Memory),
            _ => Err(IngestError::config(format!("Unknown queue backend: {}", s))),
        }
    }
}

/// Which artifact store implementation to write to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Fs,
    S3,
}

impl FromStr for StoreBackend {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "fs" | "file" | "local" => Ok(StoreBackend::Fs),
            "s3" => Ok(StoreBackend::S3),
            _ => Err(IngestError::config(format!("Unknown store backend: {}", s))),
        }
    }
}

/// Full pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub source: SourceConfig,
    pub queue: QueueConfig,
    pub enrichment: EnrichmentConfig,
    pub store: StoreConfig,
}

/// Record source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub data_dir: PathBuf,
    /// Extension without the leading dot
    pub extension: String,
}

/// Queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    pub backend: QueueBackend,
    pub name: String,
    pub region: String,
    /// Custom endpoint (LocalStack, ElasticMQ)
    pub endpoint: Option<String>,
    pub wait_time_secs: i32,
    pub visibility_timeout_secs: i32,
}

/// Enrichment API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    pub url: String,
    pub api_key: String,
    pub per_page: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub timeout_secs: u64,
    /// Record field whose value is the lookup key
    pub key_field: String,
}

/// Artifact store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Directory for the `fs` backend
    pub path: PathBuf,
    /// Bucket for the `s3` backend
    pub bucket: Option<String>,
    /// Key prefix inside the bucket
    pub prefix: String,
    pub region: String,
    pub endpoint: Option<String>,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>> {
    match env_var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| IngestError::config(format!("{} has an invalid value: {}", name, raw))),
        None => Ok(None),
    }
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|e| IngestError::config(format!("Invalid date '{}': {}", raw, e)))
}

impl PipelineConfig {
    /// Load configuration from `.env`, the environment and defaults.
    ///
    /// Only malformed values are rejected here. Call [`validate`](Self::validate)
    /// once every override has been applied.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::default();
        config.apply_env()?;

        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(dir) = env_var("QPIPE_DATA_DIR") {
            self.source.data_dir = PathBuf::from(dir);
        }
        if let Some(ext) = env_var("QPIPE_FILE_EXTENSION") {
            self.source.extension = ext.trim_start_matches('.').to_string();
        }

        if let Some(backend) = env_parse("QPIPE_QUEUE_BACKEND")? {
            self.queue.backend = backend;
        }
        if let Some(name) = env_var("QPIPE_QUEUE_NAME") {
            self.queue.name = name;
        }
        if let Some(region) = env_var("QPIPE_QUEUE_REGION") {
            self.queue.region = region;
        }
        self.queue.endpoint = env_var("QPIPE_QUEUE_ENDPOINT").or(self.queue.endpoint.take());
        if let Some(wait) = env_parse("QPIPE_QUEUE_WAIT_SECS")? {
            self.queue.wait_time_secs = wait;
        }
        if let Some(timeout) = env_parse("QPIPE_QUEUE_VISIBILITY_TIMEOUT_SECS")? {
            self.queue.visibility_timeout_secs = timeout;
        }

        if let Some(url) = env_var("QPIPE_API_URL") {
            self.enrichment.url = url;
        }
        if let Some(key) = env_var("QPIPE_API_KEY") {
            self.enrichment.api_key = key;
        }
        if let Some(per_page) = env_parse("QPIPE_API_PER_PAGE")? {
            self.enrichment.per_page = per_page;
        }
        if let Some(start) = env_var("QPIPE_API_START_DATE") {
            self.enrichment.start_date = parse_date(&start)?;
        }
        if let Some(end) = env_var("QPIPE_API_END_DATE") {
            self.enrichment.end_date = parse_date(&end)?;
        }
        if let Some(timeout) = env_parse("QPIPE_API_TIMEOUT_SECS")? {
            self.enrichment.timeout_secs = timeout;
        }
        if let Some(field) = env_var("QPIPE_KEY_FIELD") {
            self.enrichment.key_field = field;
        }

        if let Some(backend) = env_parse("QPIPE_STORE_BACKEND")? {
            self.store.backend = backend;
        }
        if let Some(path) = env_var("QPIPE_STORE_PATH") {
            self.store.path = PathBuf::from(path);
        }
        self.store.bucket = env_var("QPIPE_STORE_BUCKET").or(self.store.bucket.take());
        if let Some(prefix) = env_var("QPIPE_STORE_PREFIX") {
            self.store.prefix = prefix;
        }
        if let Some(region) = env_var("QPIPE_STORE_REGION") {
            self.store.region = region;
        }
        self.store.endpoint = env_var("QPIPE_STORE_ENDPOINT").or(self.store.endpoint.take());

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.source.extension.is_empty() {
            return Err(IngestError::config("File extension cannot be empty"));
        }

        if self.queue.name.trim().is_empty() {
            return Err(IngestError::config("Queue name cannot be empty"));
        }

        if !(0..=20).contains(&self.queue.wait_time_secs) {
            return Err(IngestError::config(format!(
                "Queue wait time must be between 0 and 20 seconds, got {}",
                self.queue.wait_time_secs
            )));
        }

        if !(0..=MAX_VISIBILITY_TIMEOUT_SECS).contains(&self.queue.visibility_timeout_secs) {
            return Err(IngestError::config(format!(
                "Visibility timeout must be between 0 and {} seconds, got {}",
                MAX_VISIBILITY_TIMEOUT_SECS, self.queue.visibility_timeout_secs
            )));
        }

        if self.enrichment.url.is_empty() {
            return Err(IngestError::config("Enrichment API URL cannot be empty"));
        }

        if self.enrichment.key_field.trim().is_empty() {
            return Err(IngestError::config("Key field cannot be empty"));
        }

        if self.enrichment.timeout_secs == 0 {
            return Err(IngestError::config("Enrichment timeout must be greater than 0"));
        }

        if self.enrichment.per_page == 0 {
            return Err(IngestError::config("Page size must be greater than 0"));
        }

        if self.enrichment.start_date > self.enrichment.end_date {
            return Err(IngestError::config(format!(
                "Start date {} is after end date {}",
                self.enrichment.start_date, self.enrichment.end_date
            )));
        }

        if self.enrichment.api_key.is_empty() {
            tracing::warn!("No enrichment API key configured - requests may be rejected");
        }

        if self.store.backend == StoreBackend::S3 && self.store.bucket.is_none() {
            return Err(IngestError::config("S3 store requires QPIPE_STORE_BUCKET"));
        }

        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig {
                data_dir: PathBuf::from(DEFAULT_DATA_DIR),
                extension: DEFAULT_FILE_EXTENSION.to_string(),
            },
            queue: QueueConfig {
                backend: QueueBackend::default(),
                name: DEFAULT_QUEUE_NAME.to_string(),
                region: DEFAULT_REGION.to_string(),
                endpoint: None,
                wait_time_secs: DEFAULT_QUEUE_WAIT_SECS,
                visibility_timeout_secs: DEFAULT_VISIBILITY_TIMEOUT_SECS,
            },
            enrichment: EnrichmentConfig {
                url: DEFAULT_API_URL.to_string(),
                api_key: String::new(),
                per_page: DEFAULT_API_PER_PAGE,
                // Constant dates, checked by the defaults test.
                start_date: NaiveDate::from_ymd_opt(2014, 1, 1).unwrap_or_default(),
                end_date: NaiveDate::from_ymd_opt(2015, 4, 1).unwrap_or_default(),
                timeout_secs: DEFAULT_API_TIMEOUT_SECS,
                key_field: DEFAULT_KEY_FIELD.to_string(),
            },
            store: StoreConfig {
                backend: StoreBackend::default(),
                path: PathBuf::from(DEFAULT_STORE_PATH),
                bucket: None,
                prefix: String::new(),
                region: DEFAULT_REGION.to_string(),
                endpoint: None,
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.queue.name, DEFAULT_QUEUE_NAME);
        assert_eq!(config.enrichment.key_field, "country");
        assert_eq!(
            config.enrichment.start_date,
            parse_date(DEFAULT_API_START_DATE).unwrap()
        );
        assert_eq!(
            config.enrichment.end_date,
            parse_date(DEFAULT_API_END_DATE).unwrap()
        );
    }

    #[test]
    fn test_inverted_date_range_rejected() {
        let mut config = PipelineConfig::default();
        config.enrichment.start_date = parse_date("2016-01-01").unwrap();
        assert!(matches!(config.validate(), Err(IngestError::Config(_))));
    }

    #[test]
    fn test_empty_queue_name_rejected() {
        let mut config = PipelineConfig::default();
        config.queue.name = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let mut config = PipelineConfig::default();
        config.enrichment.per_page = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_s3_store_needs_bucket() {
        let mut config = PipelineConfig::default();
        config.store.backend = StoreBackend::S3;
        assert!(config.validate().is_err());

        config.store.bucket = Some("artifacts".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_enrichment_timeout_rejected() {
        let mut config = PipelineConfig::default();
        config.enrichment.timeout_secs = 0;
        assert!(matches!(config.validate(), Err(IngestError::Config(_))));
    }

    #[test]
    fn test_visibility_timeout_bounds() {
        let mut config = PipelineConfig::default();
        config.queue.visibility_timeout_secs = MAX_VISIBILITY_TIMEOUT_SECS;
        assert!(config.validate().is_ok());

        config.queue.visibility_timeout_secs = MAX_VISIBILITY_TIMEOUT_SECS + 1;
        assert!(matches!(config.validate(), Err(IngestError::Config(_))));

        config.queue.visibility_timeout_secs = -1;
        assert!(config.validate().is_err());
    }

    // The only test that touches process environment.
    #[test]
    fn test_load_defers_validation_to_caller() {
        std::env::set_var("QPIPE_STORE_BACKEND", "s3");
        std::env::remove_var("QPIPE_STORE_BUCKET");
        let loaded = PipelineConfig::load();
        std::env::remove_var("QPIPE_STORE_BACKEND");

        let mut config = loaded.unwrap();
        assert_eq!(config.store.backend, StoreBackend::S3);
        assert!(config.validate().is_err());

        // A later override settles it before validation.
        config.store.backend = StoreBackend::Fs;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_date_format() {
        assert!(parse_date("2015-04-01").is_ok());
        assert!(parse_date("04/01/2015").is_err());
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("SQS".parse::<QueueBackend>().unwrap(), QueueBackend::Sqs);
        assert_eq!("memory".parse::<QueueBackend>().unwrap(), QueueBackend::Memory);
        assert_eq!("s3".parse::<StoreBackend>().unwrap(), StoreBackend::S3);
        assert!("kafka".parse::<QueueBackend>().is_err());
    }
}
