//! # Store Configuration

use std::path::PathBuf;
use std::str::FromStr;

use clawio_checksum::ChecksumAlgorithm;

use crate::error::StoreError;

/// Default upload size limit: 1 GiB.
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 1 << 30;

/// When the server digest is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashStrategy {
    /// Hash each chunk as it is copied into the scratch file.
    #[default]
    Inline,
    /// Re-read the finished scratch file and hash it.
    SecondPass,
}

impl FromStr for HashStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inline" => Ok(Self::Inline),
            "second-pass" | "second_pass" => Ok(Self::SecondPass),
            other => Err(format!(
                "unknown hash strategy {other:?}: expected inline or second-pass"
            )),
        }
    }
}

/// Configuration for a [`BlobStore`](crate::BlobStore).
///
/// `temp_dir` should live on the same filesystem as `data_dir`; otherwise
/// the commit rename fails instead of being atomic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Root of all stored blobs.
    pub data_dir: PathBuf,
    /// Scratch space for in-flight uploads.
    pub temp_dir: PathBuf,
    /// Server checksum algorithm name. `None` or empty disables checksumming.
    ///
    /// Kept as the raw configured string: an unsupported name fails each
    /// upload with `UnsupportedChecksumAlgorithm` rather than being ignored.
    pub checksum: Option<String>,
    /// Compare the client-supplied digest against the server digest.
    pub verify_client_checksum: bool,
    /// Upload size limit in bytes.
    pub max_upload_size: u64,
    pub hash_strategy: HashStrategy,
}

impl StoreConfig {
    /// Configuration with checksumming disabled and default limits.
    pub fn new(data_dir: impl Into<PathBuf>, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            temp_dir: temp_dir.into(),
            checksum: None,
            verify_client_checksum: false,
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            hash_strategy: HashStrategy::default(),
        }
    }

    /// Set the server checksum algorithm by name.
    pub fn with_checksum(mut self, name: impl Into<String>) -> Self {
        self.checksum = Some(name.into());
        self
    }

    pub fn with_verify_client_checksum(mut self, verify: bool) -> Self {
        self.verify_client_checksum = verify;
        self
    }

    pub fn with_max_upload_size(mut self, limit: u64) -> Self {
        self.max_upload_size = limit;
        self
    }

    pub fn with_hash_strategy(mut self, strategy: HashStrategy) -> Self {
        self.hash_strategy = strategy;
        self
    }

    /// Parse the configured algorithm. `Ok(None)` means checksumming is
    /// disabled.
    pub fn checksum_algorithm(&self) -> Result<Option<ChecksumAlgorithm>, StoreError> {
        match self.checksum.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(name) => Ok(Some(name.parse()?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_disable_checksumming() {
        let config = StoreConfig::new("/data", "/tmp");
        assert_eq!(config.checksum_algorithm().unwrap(), None);
        assert!(!config.verify_client_checksum);
        assert_eq!(config.max_upload_size, DEFAULT_MAX_UPLOAD_SIZE);
        assert_eq!(config.hash_strategy, HashStrategy::Inline);
    }

    #[test]
    fn empty_checksum_name_disables() {
        let config = StoreConfig::new("/data", "/tmp").with_checksum("  ");
        assert_eq!(config.checksum_algorithm().unwrap(), None);
    }

    #[test]
    fn checksum_name_is_parsed() {
        let config = StoreConfig::new("/data", "/tmp").with_checksum("SHA1");
        assert_eq!(config.checksum_algorithm().unwrap(), Some(ChecksumAlgorithm::Sha1));
    }

    #[test]
    fn unsupported_checksum_name_is_an_error() {
        let config = StoreConfig::new("/data", "/tmp").with_checksum("xyz");
        assert!(matches!(
            config.checksum_algorithm(),
            Err(StoreError::UnsupportedChecksumAlgorithm(ref n)) if n == "xyz"
        ));
    }

    #[test]
    fn hash_strategy_parses() {
        assert_eq!("inline".parse::<HashStrategy>().unwrap(), HashStrategy::Inline);
        assert_eq!("Second-Pass".parse::<HashStrategy>().unwrap(), HashStrategy::SecondPass);
        assert!("tee".parse::<HashStrategy>().is_err());
    }
}
