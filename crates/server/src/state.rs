//! Application state shared across handlers.

use crate::gc::GcEngine;
use rgc_core::config::AppConfig;
use rgc_storage::ObjectStore;
use std::sync::Arc;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Object storage backend holding the registry.
    pub storage: Arc<dyn ObjectStore>,
    /// Scanner and cleanup engine.
    pub engine: Arc<GcEngine>,
}

impl AppState {
    pub fn new(config: AppConfig, storage: Arc<dyn ObjectStore>, engine: Arc<GcEngine>) -> Self {
        Self {
            config: Arc::new(config),
            storage,
            engine,
        }
    }
}
