//! # Error Types
//!
//! Errors raised while constructing core domain values.

use thiserror::Error;

/// Error type for `clawio-core`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The identity supplied by the auth collaborator cannot be mapped to a
    /// home directory.
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),
}
