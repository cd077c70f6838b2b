//! Tag garbage collection engine.
//!
//! Two frontiers drive the work. The path frontier holds store prefixes still to
//! be listed; [`GcEngine::scan_one`] expands one of them and feeds any tag pointer
//! it finds into the tag frontier. [`GcEngine::cleanup_one`] takes one tag pointer
//! and removes every digest index entry that is not the tag's current digest.
//!
//! Attempts never return errors. Each one reports an outcome, releases its key, and
//! leaves anything it could not finish to be rediscovered by a later scan.

mod cleanup;
mod scanner;

use crate::metrics;
use crate::registry::RegistryApi;
use rgc_core::config::GcConfig;
use rgc_core::{Frontier, PathClassifier};
use rgc_storage::{ObjectStore, StorageError};
use serde::Serialize;
use std::sync::Arc;

/// Failure of a single attempt, rendered into its outcome.
#[derive(Debug, thiserror::Error)]
pub enum AttemptError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Parse(#[from] rgc_core::Error),
}

/// Result of one [`GcEngine::scan_one`] call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Nothing to scan.
    Idle,
    Scanned(ScanReport),
    /// Listing failed; the path is dropped until its parent or the root is rescanned.
    Failed { path: String, error: String },
}

impl ScanOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Scanned(_) => "scanned",
            Self::Failed { .. } => "failed",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub path: String,
    /// Children returned by the listing.
    pub children: usize,
    /// Internal nodes put on the path frontier.
    pub enqueued_paths: usize,
    /// Tag pointers put on the tag frontier.
    pub discovered_tags: usize,
    /// Children ignored: noise, already known, or the listed path itself.
    pub skipped: usize,
}

/// Result of one [`GcEngine::cleanup_one`] call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CleanupOutcome {
    /// Nothing to clean.
    Idle,
    Cleaned(CleanupReport),
    /// The tag could not be processed; it comes back with the next scan that finds it.
    Failed { tag_pointer: String, error: String },
}

impl CleanupOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Cleaned(_) => "cleaned",
            Self::Failed { .. } => "failed",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub tag_pointer: String,
    pub image: String,
    pub tag: String,
    /// Bare current digest, without the algorithm prefix.
    pub current_digest: String,
    /// Index entries matching the current digest.
    pub kept: usize,
    /// Stale digests removed (or, in dry-run mode, that would have been removed).
    pub removed: Vec<String>,
    pub invalidation_failures: usize,
    /// Stale entries whose store deletion failed; they are retried on the next visit.
    pub store_failures: usize,
    pub dry_run: bool,
}

impl CleanupReport {
    /// Whether the registry should run its blob GC for this tag.
    pub fn gc_pending(&self) -> bool {
        !self.dry_run && !self.removed.is_empty()
    }
}

/// Totals of a [`GcEngine::run_pass`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    pub paths_scanned: usize,
    pub scan_failures: usize,
    pub tags_discovered: usize,
    pub tags_cleaned: usize,
    pub cleanup_failures: usize,
    pub digests_removed: usize,
}

/// Scanner and cleanup engine over a pair of frontiers.
pub struct GcEngine {
    storage: Arc<dyn ObjectStore>,
    registry: Arc<dyn RegistryApi>,
    classifier: PathClassifier,
    paths: Arc<Frontier>,
    tags: Arc<Frontier>,
    dry_run: bool,
}

impl std::fmt::Debug for GcEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcEngine")
            .field("backend", &self.storage.backend_name())
            .field("root", &self.classifier.root())
            .field("paths", &self.paths.pending_len())
            .field("tags", &self.tags.pending_len())
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

impl GcEngine {
    /// Create an engine with fresh, empty frontiers.
    pub fn new(
        storage: Arc<dyn ObjectStore>,
        registry: Arc<dyn RegistryApi>,
        config: &GcConfig,
    ) -> Self {
        Self::with_frontiers(
            storage,
            registry,
            config,
            Arc::new(Frontier::new("paths")),
            Arc::new(Frontier::new("tags")),
        )
    }

    /// Create an engine over caller-provided frontiers.
    pub fn with_frontiers(
        storage: Arc<dyn ObjectStore>,
        registry: Arc<dyn RegistryApi>,
        config: &GcConfig,
        paths: Arc<Frontier>,
        tags: Arc<Frontier>,
    ) -> Self {
        Self {
            storage,
            registry,
            classifier: PathClassifier::new(config.repository_root.clone()),
            paths,
            tags,
            dry_run: config.dry_run,
        }
    }

    pub fn root(&self) -> &str {
        self.classifier.root()
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn paths(&self) -> &Arc<Frontier> {
        &self.paths
    }

    pub fn tags(&self) -> &Arc<Frontier> {
        &self.tags
    }

    /// Put the repository root back on the path frontier.
    ///
    /// Returns false when the root is already pending or being scanned.
    pub fn reseed(&self) -> bool {
        let added = self.paths.enqueue(self.root());
        if added {
            metrics::ROOT_RESEEDS.inc();
            tracing::info!(root = %self.root(), "repository root queued for scanning");
        } else {
            tracing::debug!(root = %self.root(), "repository root already queued");
        }
        self.observe_frontiers();
        added
    }

    /// Scan until the path frontier is empty, then clean until the tag frontier is empty.
    ///
    /// Meant for one-shot runs; scheduled workers may still be holding keys when it returns.
    pub async fn run_pass(&self) -> PassSummary {
        let mut summary = PassSummary::default();

        loop {
            match self.scan_one().await {
                ScanOutcome::Scanned(report) => {
                    summary.paths_scanned += 1;
                    summary.tags_discovered += report.discovered_tags;
                }
                ScanOutcome::Failed { .. } => summary.scan_failures += 1,
                ScanOutcome::Idle if self.paths.pending_len() == 0 => break,
                ScanOutcome::Idle => {}
            }
        }

        loop {
            match self.cleanup_one().await {
                CleanupOutcome::Cleaned(report) => {
                    summary.tags_cleaned += 1;
                    summary.digests_removed += report.removed.len();
                }
                CleanupOutcome::Failed { .. } => summary.cleanup_failures += 1,
                CleanupOutcome::Idle if self.tags.pending_len() == 0 => break,
                CleanupOutcome::Idle => {}
            }
        }

        tracing::info!(
            paths_scanned = summary.paths_scanned,
            scan_failures = summary.scan_failures,
            tags_discovered = summary.tags_discovered,
            tags_cleaned = summary.tags_cleaned,
            cleanup_failures = summary.cleanup_failures,
            digests_removed = summary.digests_removed,
            "pass complete"
        );
        summary
    }

    fn observe_frontiers(&self) {
        metrics::observe_frontier(&self.paths);
        metrics::observe_frontier(&self.tags);
    }
}
