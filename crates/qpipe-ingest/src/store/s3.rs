//! S3-backed artifact store

use super::ArtifactStore;
use crate::config::StoreConfig;
use crate::error::{IngestError, Result};
use async_trait::async_trait;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info, instrument};

#[derive(Clone)]
pub struct S3ArtifactStore {
    client: Client,
    bucket: String,
    prefix: String,
}

impl S3ArtifactStore {
    pub async fn new(config: &StoreConfig) -> Result<Self> {
        let bucket = config
            .bucket
            .clone()
            .ok_or_else(|| IngestError::config("S3 store requires a bucket"))?;

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        let shared = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(config.endpoint.is_some())
            .build();

        info!(bucket = %bucket, prefix = %config.prefix, "S3 artifact store initialized");

        Ok(Self {
            client: Client::from_conf(s3_config),
            bucket,
            prefix: config.prefix.clone(),
        })
    }

    /// Object key for an artifact name
    pub fn build_key(&self, name: &str) -> String {
        let prefix = self.prefix.trim_matches('/');
        if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", prefix, name)
        }
    }
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    #[instrument(skip(self, content), fields(bucket = %self.bucket))]
    async fn put(&self, name: &str, content: &[u8]) -> Result<String> {
        let key = self.build_key(name);
        debug!("Uploading {} bytes to s3://{}/{}", content.len(), self.bucket, key);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type("application/json")
            .body(ByteStream::from(content.to_vec()))
            .send()
            .await
            .map_err(|e| IngestError::storage(name, DisplayErrorContext(&e)))?;

        Ok(format!("s3://{}/{}", self.bucket, key))
    }
}
