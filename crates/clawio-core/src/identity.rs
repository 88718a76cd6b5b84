//! # Caller Identity
//!
//! The verified identity of the caller of a blob operation. Identities are
//! produced by the authentication collaborator after it has validated a
//! token; this crate never parses or checks tokens itself.
//!
//! ## Security Invariant
//!
//! The username is used verbatim as a path segment of the caller's home
//! directory (`/{first letter}/{username}`). A username of `..` or one that
//! contains a separator would let two identities share, or nest inside, each
//! other's homes. [`Identity::new`] rejects such usernames, and
//! deserialization goes through the same check.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A verified caller identity. Immutable for the lifetime of a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "IdentityRecord")]
pub struct Identity {
    username: String,
    email: Option<String>,
    display_name: Option<String>,
}

/// Unvalidated wire form of [`Identity`].
#[derive(Deserialize)]
struct IdentityRecord {
    username: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

impl TryFrom<IdentityRecord> for Identity {
    type Error = CoreError;

    fn try_from(record: IdentityRecord) -> Result<Self, Self::Error> {
        let mut identity = Identity::new(record.username)?;
        identity.email = record.email;
        identity.display_name = record.display_name;
        Ok(identity)
    }
}

impl Identity {
    /// Create an identity for `username`.
    ///
    /// Fails if the username is empty, is `.` or `..`, or contains `/`, `\`
    /// or a NUL byte.
    pub fn new(username: impl Into<String>) -> Result<Self, CoreError> {
        let username = username.into();
        validate_username(&username)?;
        Ok(Self {
            username,
            email: None,
            display_name: None,
        })
    }

    /// Attach the caller's email address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Attach the caller's display name.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// First character of the username, used as the home directory shard.
    pub fn initial(&self) -> char {
        // validate_username guarantees at least one character.
        self.username.chars().next().unwrap_or('_')
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.username)
    }
}

fn validate_username(username: &str) -> Result<(), CoreError> {
    if username.is_empty() {
        return Err(CoreError::InvalidIdentity("username is empty".into()));
    }
    if username == "." || username == ".." {
        return Err(CoreError::InvalidIdentity(format!(
            "username {username:?} is a relative path segment"
        )));
    }
    if let Some(c) = username.chars().find(|c| matches!(c, '/' | '\\' | '\0')) {
        return Err(CoreError::InvalidIdentity(format!(
            "username contains forbidden character {c:?}"
        )));
    }
    Ok(())
}
