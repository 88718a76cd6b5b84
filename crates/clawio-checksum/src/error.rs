use thiserror::Error;

/// Error type for `clawio-checksum`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChecksumError {
    /// The configured algorithm name is not one of md5, sha1, sha256, adler32.
    #[error("unsupported checksum algorithm: {0:?}")]
    UnsupportedAlgorithm(String),

    /// A digest string is not of the form `"<algorithm>:<hex>"`.
    #[error("malformed checksum {0:?}: expected <algorithm>:<hex>")]
    Malformed(String),
}
