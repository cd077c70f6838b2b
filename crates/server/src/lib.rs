//! Scan/cleanup engine, scheduler and HTTP status surface for the registry tag
//! garbage collector.
//!
//! This crate provides:
//! - `GcEngine`: the tree scanner and cleanup engine over two frontiers
//! - The registry API client used to invalidate deleted manifests
//! - Interval and cron timers that drive the engine
//! - The axum router exposing frontier status, health and metrics

pub mod error;
pub mod gc;
pub mod handlers;
pub mod metrics;
pub mod registry;
pub mod routes;
pub mod scheduler;
pub mod state;

pub use error::ApiError;
pub use gc::{CleanupOutcome, CleanupReport, GcEngine, PassSummary, ScanOutcome, ScanReport};
pub use registry::{HttpRegistryClient, RegistryApi, RegistryError};
pub use routes::create_router;
pub use state::AppState;
