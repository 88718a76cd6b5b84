//! # Scratch Files
//!
//! [`TempBlob`] owns one in-flight upload in the scratch directory. The
//! file is removed when the guard drops unless [`TempBlob::commit`] renamed
//! it into place, so every early return in the upload pipeline cleans up
//! without extra bookkeeping.

use std::io;
use std::path::Path;

use tempfile::{Builder, NamedTempFile, PathPersistError, TempPath};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

const SCRATCH_PREFIX: &str = ".clawio-upload-";

#[derive(Debug)]
pub(crate) struct TempBlob {
    file: File,
    path: TempPath,
}

impl TempBlob {
    /// Create a uniquely named scratch file inside `dir`.
    ///
    /// A missing or unwritable `dir` surfaces as the raw I/O error.
    pub(crate) async fn create(dir: &Path) -> io::Result<Self> {
        let dir = dir.to_path_buf();
        let (file, path) = blocking(move || {
            Builder::new()
                .prefix(SCRATCH_PREFIX)
                .tempfile_in(&dir)
                .map(NamedTempFile::into_parts)
        })
        .await?;
        Ok(Self {
            file: File::from_std(file),
            path,
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) async fn write_all(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.file.write_all(chunk).await
    }

    /// Flush buffered writes and sync contents to disk.
    pub(crate) async fn finish(&mut self) -> io::Result<()> {
        self.file.flush().await?;
        self.file.sync_all().await
    }

    /// Rename the scratch file onto `dest`, replacing any existing file.
    ///
    /// On failure the scratch file is removed before the error is returned.
    pub(crate) async fn commit(self, dest: &Path) -> io::Result<()> {
        let Self { file, path } = self;
        drop(file);
        let dest = dest.to_path_buf();
        match blocking(move || Ok(path.persist(&dest))).await? {
            Ok(()) => Ok(()),
            Err(PathPersistError { error, path }) => {
                discard(path).await;
                Err(error)
            }
        }
    }

    /// Remove the scratch file now, logging rather than failing if that
    /// does not work.
    pub(crate) async fn discard(self) {
        let Self { file, path } = self;
        drop(file);
        discard(path).await;
    }
}

async fn discard(path: TempPath) {
    let scratch = path.to_path_buf();
    if let Err(e) = blocking(move || path.close()).await {
        tracing::warn!(path = %scratch.display(), error = %e, "failed to remove scratch file");
    }
}

/// Run a std filesystem call on the blocking pool, the way `tokio::fs` does.
async fn blocking<T, F>(f: F) -> io::Result<T>
where
    F: FnOnce() -> io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(io::Error::other)?
}
