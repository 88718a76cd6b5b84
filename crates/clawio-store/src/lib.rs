//! # clawio-store: Per-Identity Blob Store
//!
//! Stores opaque blobs under each caller's home directory and streams them
//! back out.
//!
//! ## Upload Pipeline
//!
//! ```text
//! Start → Buffering → (Checksumming →) (Verifying →) Committing → Done
//!   └──────────┴──────────────┴──────────────┴────────────┴──→ Failed
//! ```
//!
//! 1. The content stream is copied into a scratch file in `temp_dir`,
//!    bounded by the caller's size limit, and hashed while copying (or in a
//!    second pass, see [`HashStrategy`]).
//! 2. A client-supplied digest, when verification is enabled, must match
//!    the computed one exactly.
//! 3. The scratch file is renamed onto the resolved storage path.
//!
//! ## Atomicity Invariant
//!
//! The only way content becomes visible at a storage path is the final
//! rename. A blob is therefore always either entirely its previous content
//! or entirely the new content; readers never observe a partial write.
//! Every failure deletes the scratch file (best effort) and leaves the
//! durable store untouched.
//!
//! ## Concurrency
//!
//! [`BlobStore`] holds only immutable configuration. Concurrent uploads to
//! the same path race at the rename; the filesystem decides the winner. No
//! additional locking is performed.

pub mod config;
pub mod error;
pub mod reader;
pub mod store;
mod temp;
pub mod upload;

pub use config::{HashStrategy, StoreConfig, DEFAULT_MAX_UPLOAD_SIZE};
pub use error::StoreError;
pub use reader::BlobReader;
pub use store::BlobStore;
pub use upload::UploadPhase;
