//! # Digests
//!
//! Incremental hashing and the `"<algorithm>:<hex>"` digest format shared by
//! the server (computed) and the client (supplied) sides of an upload.

use std::io::{self, Read};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::Digest as _;
use subtle::ConstantTimeEq;

use crate::algorithm::ChecksumAlgorithm;
use crate::error::ChecksumError;

const READ_CHUNK: usize = 64 * 1024;

/// A finished digest: algorithm tag plus lowercase hex value.
///
/// Serialized as the `"<algorithm>:<hex>"` string; deserialization goes
/// through [`FromStr`] so malformed digests are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Checksum {
    algorithm: ChecksumAlgorithm,
    hex: String,
}

impl Checksum {
    pub fn algorithm(&self) -> ChecksumAlgorithm {
        self.algorithm
    }

    /// The lowercase hex digest, without the algorithm prefix.
    pub fn hex(&self) -> &str {
        &self.hex
    }
}

impl std::fmt::Display for Checksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex)
    }
}

impl FromStr for Checksum {
    type Err = ChecksumError;

    /// Parse a client-style digest. The algorithm tag is matched
    /// case-insensitively; the hex part must have the algorithm's width.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tag, hex) = s
            .split_once(':')
            .ok_or_else(|| ChecksumError::Malformed(s.to_string()))?;
        let algorithm: ChecksumAlgorithm = tag.parse()?;
        let hex = hex.to_ascii_lowercase();
        if hex.len() != algorithm.hex_len() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ChecksumError::Malformed(s.to_string()));
        }
        Ok(Self { algorithm, hex })
    }
}

impl TryFrom<String> for Checksum {
    type Error = ChecksumError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Checksum> for String {
    fn from(c: Checksum) -> Self {
        c.to_string()
    }
}

/// Incremental hasher over one of the supported algorithms.
pub enum ChecksumHasher {
    Md5(md5::Context),
    Sha1(sha1::Sha1),
    Sha256(sha2::Sha256),
    Adler32(adler::Adler32),
}

impl std::fmt::Debug for ChecksumHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ChecksumHasher")
            .field(&self.algorithm())
            .finish()
    }
}

impl ChecksumHasher {
    /// Start a fresh digest computation.
    pub fn new(algorithm: ChecksumAlgorithm) -> Self {
        match algorithm {
            ChecksumAlgorithm::Md5 => Self::Md5(md5::Context::new()),
            ChecksumAlgorithm::Sha1 => Self::Sha1(sha1::Sha1::new()),
            ChecksumAlgorithm::Sha256 => Self::Sha256(sha2::Sha256::new()),
            ChecksumAlgorithm::Adler32 => Self::Adler32(adler::Adler32::new()),
        }
    }

    pub fn algorithm(&self) -> ChecksumAlgorithm {
        match self {
            Self::Md5(_) => ChecksumAlgorithm::Md5,
            Self::Sha1(_) => ChecksumAlgorithm::Sha1,
            Self::Sha256(_) => ChecksumAlgorithm::Sha256,
            Self::Adler32(_) => ChecksumAlgorithm::Adler32,
        }
    }

    /// Feed the next chunk of content.
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::Md5(ctx) => ctx.consume(data),
            Self::Sha1(h) => h.update(data),
            Self::Sha256(h) => h.update(data),
            Self::Adler32(h) => h.write_slice(data),
        }
    }

    /// Consume the hasher and produce the formatted digest.
    pub fn finalize(self) -> Checksum {
        let algorithm = self.algorithm();
        let hex = match self {
            Self::Md5(ctx) => hex::encode(ctx.compute().0),
            Self::Sha1(h) => hex::encode(h.finalize()),
            Self::Sha256(h) => hex::encode(h.finalize()),
            Self::Adler32(h) => format!("{:08x}", h.checksum()),
        };
        Checksum { algorithm, hex }
    }
}

/// Hash everything `reader` yields.
pub fn compute<R: Read>(mut reader: R, algorithm: ChecksumAlgorithm) -> io::Result<Checksum> {
    let mut hasher = ChecksumHasher::new(algorithm);
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}

/// Hash an in-memory buffer.
pub fn compute_bytes(data: &[u8], algorithm: ChecksumAlgorithm) -> Checksum {
    let mut hasher = ChecksumHasher::new(algorithm);
    hasher.update(data);
    hasher.finalize()
}

/// Exact equality of two formatted digests.
///
/// Compared in constant time so response timing does not reveal how much of
/// a guessed digest matched. Different lengths compare unequal.
pub fn digests_equal(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
