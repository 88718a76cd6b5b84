//! # Upload
//!
//! Streams content into a scratch file, checksums it, optionally verifies a
//! client digest, then renames the scratch file over the storage path.
//!
//! ## Security Invariant
//!
//! Nothing is written under `data_dir` until the final rename. A failure in
//! any earlier phase, including a client that disconnects mid-stream, only
//! ever touches the scratch directory, and the scratch file is removed
//! before the error is returned.

use std::fmt;
use std::io;
use std::path::Path;

use clawio_checksum::{digests_equal, Checksum, ChecksumAlgorithm, ChecksumHasher};
use clawio_core::Identity;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::config::HashStrategy;
use crate::error::StoreError;
use crate::store::BlobStore;
use crate::temp::TempBlob;

const COPY_CHUNK: usize = 64 * 1024;

// ── Phases ──────────────────────────────────────────────────────────────────

/// Where an upload is in its pipeline. Recorded on failure so logs say how
/// far a rejected upload got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    Start,
    Buffering,
    Checksumming,
    Verifying,
    Committing,
    Done,
}

impl UploadPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Buffering => "buffering",
            Self::Checksumming => "checksumming",
            Self::Verifying => "verifying",
            Self::Committing => "committing",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for UploadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Upload ──────────────────────────────────────────────────────────────────

impl BlobStore {
    /// Store `content` at `logical_path` for `identity`.
    ///
    /// At most `max_size` bytes are accepted; a stream of exactly
    /// `max_size` bytes succeeds. Returns the server digest when a checksum
    /// algorithm is configured, `None` otherwise.
    ///
    /// `client_checksum` is compared against the server digest only when
    /// verification is enabled, a server digest was computed, and the
    /// client value is non-empty. The comparison is exact on the full
    /// `"<alg>:<hex>"` string.
    ///
    /// # Errors
    ///
    /// - [`StoreError::UnsupportedChecksumAlgorithm`] before anything is
    ///   written, if the configured algorithm is unknown.
    /// - [`StoreError::RequestTooLarge`] once the stream passes `max_size`.
    /// - [`StoreError::BadChecksum`] on a verification mismatch.
    /// - [`StoreError::NotFound`] if the home directory (or an intermediate
    ///   directory) does not exist at commit time.
    /// - [`StoreError::Internal`] for scratch-space or stream I/O failures.
    #[tracing::instrument(skip(self, identity, content, client_checksum), fields(user = %identity))]
    pub async fn upload<R>(
        &self,
        identity: &Identity,
        logical_path: &str,
        content: R,
        max_size: u64,
        client_checksum: Option<&str>,
    ) -> Result<Option<Checksum>, StoreError>
    where
        R: AsyncRead + Unpin,
    {
        let mut phase = UploadPhase::Start;
        let result = self
            .run_upload(&mut phase, identity, logical_path, content, max_size, client_checksum)
            .await;
        match &result {
            Ok(checksum) => {
                tracing::info!(
                    phase = %UploadPhase::Done,
                    checksum = checksum.as_ref().map(|c| c.to_string()).as_deref(),
                    "upload committed"
                );
            }
            Err(e) => {
                tracing::warn!(failed_in = %phase, error = %e, "upload failed");
            }
        }
        result
    }

    async fn run_upload<R>(
        &self,
        phase: &mut UploadPhase,
        identity: &Identity,
        logical_path: &str,
        content: R,
        max_size: u64,
        client_checksum: Option<&str>,
    ) -> Result<Option<Checksum>, StoreError>
    where
        R: AsyncRead + Unpin,
    {
        let algorithm = self.config.checksum_algorithm()?;
        let mut temp = TempBlob::create(&self.config.temp_dir).await?;

        let checksum = match self
            .stage(phase, &mut temp, content, max_size, algorithm, client_checksum)
            .await
        {
            Ok(checksum) => checksum,
            Err(e) => {
                temp.discard().await;
                return Err(e);
            }
        };

        *phase = UploadPhase::Committing;
        let dest = self.storage_path(identity, logical_path);
        temp.commit(&dest).await.map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StoreError::NotFound(logical_path.to_string()),
            _ => StoreError::Internal(e),
        })?;

        *phase = UploadPhase::Done;
        Ok(checksum)
    }

    /// Buffer, checksum and verify. Leaves `temp` complete and synced on
    /// success.
    async fn stage<R>(
        &self,
        phase: &mut UploadPhase,
        temp: &mut TempBlob,
        mut content: R,
        max_size: u64,
        algorithm: Option<ChecksumAlgorithm>,
        client_checksum: Option<&str>,
    ) -> Result<Option<Checksum>, StoreError>
    where
        R: AsyncRead + Unpin,
    {
        *phase = UploadPhase::Buffering;
        let mut hasher = match (algorithm, self.config.hash_strategy) {
            (Some(alg), HashStrategy::Inline) => Some(ChecksumHasher::new(alg)),
            _ => None,
        };

        let mut buf = vec![0u8; COPY_CHUNK];
        let mut received: u64 = 0;
        loop {
            let n = content.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            received += n as u64;
            if received > max_size {
                return Err(StoreError::RequestTooLarge { limit: max_size });
            }
            if let Some(h) = hasher.as_mut() {
                h.update(&buf[..n]);
            }
            temp.write_all(&buf[..n]).await?;
        }
        temp.finish().await?;
        tracing::debug!(bytes = received, "upload buffered");

        let server = match algorithm {
            None => None,
            Some(alg) => {
                *phase = UploadPhase::Checksumming;
                Some(match hasher {
                    Some(h) => h.finalize(),
                    None => hash_file(temp.path(), alg).await?,
                })
            }
        };

        let client = client_checksum.filter(|c| !c.is_empty());
        if let (true, Some(server), Some(client)) =
            (self.config.verify_client_checksum, server.as_ref(), client)
        {
            *phase = UploadPhase::Verifying;
            let server_str = server.to_string();
            if !digests_equal(client, &server_str) {
                if let Ok(parsed) = client.parse::<Checksum>() {
                    if parsed.algorithm() != server.algorithm() {
                        tracing::debug!(
                            client_algorithm = %parsed.algorithm(),
                            server_algorithm = %server.algorithm(),
                            "client digest uses a different algorithm"
                        );
                    }
                }
                return Err(StoreError::BadChecksum {
                    expected: client.to_string(),
                    actual: server_str,
                });
            }
        }

        Ok(server)
    }
}

/// Second-pass hashing: re-read a finished scratch file.
async fn hash_file(path: &Path, algorithm: ChecksumAlgorithm) -> io::Result<Checksum> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = ChecksumHasher::new(algorithm);
    let mut buf = vec![0u8; COPY_CHUNK];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}
