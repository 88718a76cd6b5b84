//! # BlobStore
//!
//! Owns the resolver and configuration. Upload lives in
//! [`upload`](crate::upload); download is here.

use std::io;
use std::path::PathBuf;

use clawio_core::{Identity, PathResolver};
use tokio::fs::File;

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::reader::BlobReader;

/// Per-identity blob store over a local directory tree.
///
/// Cheap to share behind an `Arc`; every operation takes `&self`.
#[derive(Debug, Clone)]
pub struct BlobStore {
    pub(crate) config: StoreConfig,
    pub(crate) resolver: PathResolver,
}

impl BlobStore {
    pub fn new(config: StoreConfig) -> Self {
        let resolver = PathResolver::new(config.data_dir.clone());
        Self { config, resolver }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Physical location of `logical_path` for `identity`. Always inside
    /// that identity's home directory.
    pub fn storage_path(&self, identity: &Identity, logical_path: &str) -> PathBuf {
        self.resolver.resolve(identity, logical_path)
    }

    /// Open the blob at `logical_path` for streaming.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if nothing exists at the path.
    /// - [`StoreError::IsADirectory`] if the path names a directory,
    ///   including the home directory itself.
    /// - [`StoreError::Internal`] for any other I/O failure.
    #[tracing::instrument(skip(self, identity), fields(user = %identity))]
    pub async fn download(
        &self,
        identity: &Identity,
        logical_path: &str,
    ) -> Result<BlobReader, StoreError> {
        let path = self.storage_path(identity, logical_path);

        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(logical_path.to_string()));
            }
            Err(e) => {
                // Some platforms refuse to open directories at all.
                if tokio::fs::metadata(&path)
                    .await
                    .map(|m| m.is_dir())
                    .unwrap_or(false)
                {
                    return Err(StoreError::IsADirectory(logical_path.to_string()));
                }
                return Err(e.into());
            }
        };

        let metadata = file.metadata().await?;
        if metadata.is_dir() {
            return Err(StoreError::IsADirectory(logical_path.to_string()));
        }

        tracing::debug!(len = metadata.len(), "blob opened");
        Ok(BlobReader::new(file, metadata.len()))
    }
}
