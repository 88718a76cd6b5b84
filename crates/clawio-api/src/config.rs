//! # Service Configuration
//!
//! Everything is read from `CLAWIO_DATA_*` environment variables.
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `CLAWIO_DATA_PORT` | `8080` | listen port |
//! | `CLAWIO_DATA_DATADIR` | required | blob root |
//! | `CLAWIO_DATA_TMPDIR` | required | scratch directory, same filesystem as the blob root |
//! | `CLAWIO_DATA_CHECKSUM` | unset | `md5`, `sha1`, `sha256` or `adler32`; unset disables |
//! | `CLAWIO_DATA_VERIFY_CLIENT_CHECKSUM` | `false` | compare client digests |
//! | `CLAWIO_DATA_MAX_UPLOAD_SIZE` | 1 GiB | upload limit in bytes |
//! | `CLAWIO_DATA_HASH_STRATEGY` | `inline` | `inline` or `second-pass` |
//! | `CLAWIO_DATA_TOKENS` | unset | `token=username` pairs, comma separated |
//! | `CLAWIO_DATA_LOG_FORMAT` | `text` | `text` or `json` |

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clawio_store::{HashStrategy, StoreConfig, DEFAULT_MAX_UPLOAD_SIZE};
use thiserror::Error;

const PREFIX: &str = "CLAWIO_DATA_";
const DEFAULT_PORT: u16 = 8080;

/// Error building [`AppConfig`] from the environment.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(String),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Log output format for the binary's subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format {other:?}: expected text or json")),
        }
    }
}

/// Runtime configuration for the data service.
///
/// Custom `Debug` redacts the token table.
#[derive(Clone)]
pub struct AppConfig {
    pub port: u16,
    pub store: StoreConfig,
    /// `(token, username)` pairs accepted by the static verifier.
    pub tokens: Vec<(String, String)>,
    pub log_format: LogFormat,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let users: Vec<&str> = self.tokens.iter().map(|(_, u)| u.as_str()).collect();
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("store", &self.store)
            .field("tokens", &format_args!("[REDACTED; users={users:?}]"))
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl AppConfig {
    /// Build from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. `lookup` receives full
    /// variable names, e.g. `CLAWIO_DATA_PORT`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(&format!("{PREFIX}{key}"))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |key: &str| get(key).ok_or_else(|| ConfigError::Missing(var(key)));

        let port = match get("PORT") {
            Some(v) => parse(&v, "PORT")?,
            None => DEFAULT_PORT,
        };
        let data_dir = PathBuf::from(require("DATADIR")?);
        let temp_dir = PathBuf::from(require("TMPDIR")?);

        let mut store = StoreConfig::new(data_dir, temp_dir);
        store.checksum = get("CHECKSUM");
        if let Some(v) = get("VERIFY_CLIENT_CHECKSUM") {
            store.verify_client_checksum = parse_bool(&v, "VERIFY_CLIENT_CHECKSUM")?;
        }
        store.max_upload_size = match get("MAX_UPLOAD_SIZE") {
            Some(v) => parse(&v, "MAX_UPLOAD_SIZE")?,
            None => DEFAULT_MAX_UPLOAD_SIZE,
        };
        if let Some(v) = get("HASH_STRATEGY") {
            store.hash_strategy = parse::<HashStrategy>(&v, "HASH_STRATEGY")?;
        }

        let tokens = match get("TOKENS") {
            Some(v) => parse_tokens(&v)?,
            None => Vec::new(),
        };
        let log_format = match get("LOG_FORMAT") {
            Some(v) => parse(&v, "LOG_FORMAT")?,
            None => LogFormat::default(),
        };

        Ok(Self {
            port,
            store,
            tokens,
            log_format,
        })
    }
}

fn var(key: &str) -> String {
    format!("{PREFIX}{key}")
}

fn parse<T>(value: &str, key: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        var: var(key),
        reason: e.to_string(),
    })
}

fn parse_bool(value: &str, key: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            var: var(key),
            reason: format!("expected a boolean, got {other:?}"),
        }),
    }
}

/// Parse `tok1=alice,tok2=bob`.
fn parse_tokens(value: &str) -> Result<Vec<(String, String)>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (token, user) = entry.split_once('=').ok_or_else(|| ConfigError::Invalid {
                var: var("TOKENS"),
                reason: "entries must have the form token=username".into(),
            })?;
            let (token, user) = (token.trim(), user.trim());
            if token.is_empty() || user.is_empty() {
                return Err(ConfigError::Invalid {
                    var: var("TOKENS"),
                    reason: "token and username must be non-empty".into(),
                });
            }
            Ok((token.to_string(), user.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (format!("{PREFIX}{k}"), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config =
            AppConfig::from_lookup(lookup(&[("DATADIR", "/srv/data"), ("TMPDIR", "/srv/tmp")]))
                .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.store.data_dir, PathBuf::from("/srv/data"));
        assert_eq!(config.store.temp_dir, PathBuf::from("/srv/tmp"));
        assert_eq!(config.store.checksum, None);
        assert!(!config.store.verify_client_checksum);
        assert_eq!(config.store.max_upload_size, DEFAULT_MAX_UPLOAD_SIZE);
        assert!(config.tokens.is_empty());
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn full_config_parses() {
        let config = AppConfig::from_lookup(lookup(&[
            ("PORT", "57002"),
            ("DATADIR", "/d"),
            ("TMPDIR", "/t"),
            ("CHECKSUM", "md5"),
            ("VERIFY_CLIENT_CHECKSUM", "true"),
            ("MAX_UPLOAD_SIZE", "1024"),
            ("HASH_STRATEGY", "second-pass"),
            ("TOKENS", "tok1=alice, tok2=bob"),
            ("LOG_FORMAT", "json"),
        ]))
        .unwrap();
        assert_eq!(config.port, 57002);
        assert_eq!(config.store.checksum.as_deref(), Some("md5"));
        assert!(config.store.verify_client_checksum);
        assert_eq!(config.store.max_upload_size, 1024);
        assert_eq!(config.store.hash_strategy, HashStrategy::SecondPass);
        assert_eq!(
            config.tokens,
            vec![
                ("tok1".to_string(), "alice".to_string()),
                ("tok2".to_string(), "bob".to_string())
            ]
        );
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn missing_data_dir_is_reported() {
        let err = AppConfig::from_lookup(lookup(&[("TMPDIR", "/t")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("CLAWIO_DATA_DATADIR".into()));
    }

    #[test]
    fn invalid_port_is_reported() {
        let err = AppConfig::from_lookup(lookup(&[
            ("DATADIR", "/d"),
            ("TMPDIR", "/t"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "CLAWIO_DATA_PORT"));
    }

    #[test]
    fn malformed_tokens_are_reported() {
        for bad in ["tok1", "=alice", "tok1="] {
            let err = AppConfig::from_lookup(lookup(&[
                ("DATADIR", "/d"),
                ("TMPDIR", "/t"),
                ("TOKENS", bad),
            ]))
            .unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { ref var, .. } if var == "CLAWIO_DATA_TOKENS"),
                "{bad}"
            );
        }
    }

    #[test]
    fn invalid_bool_is_reported() {
        let err = AppConfig::from_lookup(lookup(&[
            ("DATADIR", "/d"),
            ("TMPDIR", "/t"),
            ("VERIFY_CLIENT_CHECKSUM", "maybe"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn debug_redacts_tokens() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DATADIR", "/d"),
            ("TMPDIR", "/t"),
            ("TOKENS", "supersecret=alice"),
        ]))
        .unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("supersecret"));
        assert!(debug.contains("REDACTED"));
        assert!(debug.contains("alice"));
    }
}
