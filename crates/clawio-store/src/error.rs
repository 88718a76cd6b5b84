//! # Store Errors
//!
//! One variant per failure kind the transport needs to tell apart. Mapping
//! to protocol status codes is the transport's job, not the store's.

use std::io;

use clawio_checksum::ChecksumError;
use thiserror::Error;

/// Error returned by [`BlobStore`](crate::BlobStore) operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The blob does not exist, or the caller's home directory has not been
    /// provisioned (upload commit).
    #[error("not found: {0}")]
    NotFound(String),

    /// The client-supplied digest differs from the server-computed one.
    #[error("checksum mismatch: expected {expected:?}, computed {actual:?}")]
    BadChecksum {
        /// Digest as supplied by the client.
        expected: String,
        /// Digest computed over the received bytes.
        actual: String,
    },

    /// The configured server checksum algorithm is not supported.
    #[error("unsupported checksum algorithm: {0:?}")]
    UnsupportedChecksumAlgorithm(String),

    /// The upload stream exceeded the size limit.
    #[error("request too large: upload exceeds {limit} bytes")]
    RequestTooLarge {
        /// The limit that was exceeded, in bytes.
        limit: u64,
    },

    /// The download target is a directory.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// Any other I/O failure: disk full, permission denied, missing scratch
    /// directory, interrupted client stream.
    #[error("internal error: {0}")]
    Internal(#[from] io::Error),
}

impl From<ChecksumError> for StoreError {
    fn from(err: ChecksumError) -> Self {
        match err {
            ChecksumError::UnsupportedAlgorithm(name) => Self::UnsupportedChecksumAlgorithm(name),
            ChecksumError::Malformed(_) => {
                Self::Internal(io::Error::new(io::ErrorKind::InvalidData, err))
            }
        }
    }
}
