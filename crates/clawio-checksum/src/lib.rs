//! # clawio-checksum: Checksum Engine
//!
//! Computes and formats content digests for uploaded blobs:
//!
//! - **[`ChecksumAlgorithm`]**: the supported algorithm set (md5, sha1,
//!   sha256, adler32). Unknown names are a configuration error.
//! - **[`ChecksumHasher`]**: incremental hasher, fed chunk by chunk while an
//!   upload is being copied to scratch space.
//! - **[`Checksum`]**: a finished digest, rendered as
//!   `"<algorithm>:<lowercase hex>"`.
//! - **[`digests_equal()`]**: exact, constant-time comparison of two
//!   formatted digests.
//!
//! ## Determinism
//!
//! Feeding the same bytes through [`ChecksumHasher`] in any chunking, or
//! through [`compute()`] from a reader, yields the same [`Checksum`]. The
//! blob store relies on this to make hash-while-copying and
//! hash-after-copying interchangeable.

pub mod algorithm;
pub mod digest;
pub mod error;

pub use algorithm::ChecksumAlgorithm;
pub use digest::{compute, compute_bytes, digests_equal, Checksum, ChecksumHasher};
pub use error::ChecksumError;
