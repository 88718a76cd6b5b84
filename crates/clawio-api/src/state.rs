//! # Application State
//!
//! Shared state for the Axum application.

use std::sync::Arc;

use clawio_store::{BlobStore, StoreConfig};

use crate::config::AppConfig;
use crate::middleware::metrics::ApiMetrics;

/// Shared application state passed to all route handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Arc<BlobStore>,
    pub metrics: ApiMetrics,
}

impl AppState {
    /// Fails only if the metrics registry rejects a collector.
    pub fn new(store: BlobStore) -> Result<Self, prometheus::Error> {
        Ok(Self {
            store: Arc::new(store),
            metrics: ApiMetrics::new()?,
        })
    }

    pub fn from_store_config(config: StoreConfig) -> Result<Self, prometheus::Error> {
        Self::new(BlobStore::new(config))
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, prometheus::Error> {
        Self::from_store_config(config.store.clone())
    }
}
