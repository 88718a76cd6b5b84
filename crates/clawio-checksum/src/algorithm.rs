//! # Checksum Algorithms
//!
//! The closed set of digest algorithms the store can be configured with.

use std::str::FromStr;

use crate::error::ChecksumError;

/// A supported checksum algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChecksumAlgorithm {
    Md5,
    Sha1,
    Sha256,
    /// Adler-32 rolling checksum. Rendered as 8 hex digits.
    Adler32,
}

impl ChecksumAlgorithm {
    /// All supported algorithms.
    pub const ALL: [ChecksumAlgorithm; 4] = [Self::Md5, Self::Sha1, Self::Sha256, Self::Adler32];

    /// Lowercase algorithm tag used in formatted digests.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Adler32 => "adler32",
        }
    }

    /// Length in hex characters of a digest produced by this algorithm.
    pub fn hex_len(&self) -> usize {
        match self {
            Self::Md5 => 32,
            Self::Sha1 => 40,
            Self::Sha256 => 64,
            Self::Adler32 => 8,
        }
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = ChecksumError;

    /// Parse an algorithm name, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "md5" => Ok(Self::Md5),
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            "adler32" => Ok(Self::Adler32),
            _ => Err(ChecksumError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

impl std::fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
