//! Directory-backed artifact store

use super::ArtifactStore;
use crate::error::{IngestError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Use `root` as the artifact directory, creating it if needed
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| IngestError::storage(root.display().to_string(), e))?;

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where an artifact with `name` lives
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn put(&self, name: &str, content: &[u8]) -> Result<String> {
        let target = self.path_for(name);
        // Write next to the target and rename so readers never see a partial file.
        // Each write stages under its own name; concurrent writers of one
        // artifact race only on the rename, and the last rename wins.
        let staging = self.root.join(format!(".{}.{}.partial", name, Uuid::new_v4()));

        if let Err(e) = tokio::fs::write(&staging, content).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(IngestError::storage(name, e));
        }
        if let Err(e) = tokio::fs::rename(&staging, &target).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(IngestError::storage(name, e));
        }

        debug!(path = %target.display(), bytes = content.len(), "Artifact written");
        Ok(target.display().to_string())
    }
}
