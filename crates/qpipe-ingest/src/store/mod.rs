//! Artifact storage
//!
//! Artifacts are written under a name derived from their enrichment key
//! (see [`qpipe_common::naming::artifact_name`]). Writing an existing name
//! replaces its content.

use crate::config::{StoreBackend, StoreConfig};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub mod fs;
pub mod s3;

pub use fs::FsArtifactStore;
pub use s3::S3ArtifactStore;

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Write `content` under `name`, replacing anything already there.
    ///
    /// Returns the location written (path or object URL).
    async fn put(&self, name: &str, content: &[u8]) -> Result<String>;
}

/// Build the store selected by `config`
pub async fn open(config: &StoreConfig) -> Result<Arc<dyn ArtifactStore>> {
    match config.backend {
        StoreBackend::Fs => Ok(Arc::new(FsArtifactStore::new(&config.path).await?)),
        StoreBackend::S3 => Ok(Arc::new(S3ArtifactStore::new(config).await?)),
    }
}
