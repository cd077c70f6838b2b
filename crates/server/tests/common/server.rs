//! Server test utilities.

use super::registry::RecordingRegistry;
use super::storage::FaultyStore;
use rgc_core::config::AppConfig;
use rgc_server::{AppState, GcEngine, create_router};
use rgc_storage::{FilesystemBackend, ObjectStore};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Repository root used by the server tests.
#[allow(dead_code)]
pub const ROOT: &str = "repo/";

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    pub store: Arc<FaultyStore>,
    pub registry: Arc<RecordingRegistry>,
    /// Directory backing the filesystem store.
    pub storage_path: PathBuf,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server over a temporary filesystem registry.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server with custom config modifications.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let storage_path = temp_dir.path().join("storage");
        let backend: Arc<dyn ObjectStore> = Arc::new(
            FilesystemBackend::new(&storage_path)
                .await
                .expect("Failed to create storage backend"),
        );
        let store = Arc::new(FaultyStore::new(backend));
        let registry = Arc::new(RecordingRegistry::new());

        let mut config = AppConfig::for_testing(storage_path.clone(), "http://registry.test");
        config.gc.repository_root = ROOT.to_string();
        modifier(&mut config);

        let engine = Arc::new(GcEngine::new(store.clone(), registry.clone(), &config.gc));
        let state = AppState::new(config, store.clone(), engine);
        let router = create_router(state.clone());

        Self {
            router,
            state,
            store,
            registry,
            storage_path,
            _temp_dir: temp_dir,
        }
    }

    pub fn engine(&self) -> &Arc<GcEngine> {
        &self.state.engine
    }

    /// The store as the engine sees it.
    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }
}
