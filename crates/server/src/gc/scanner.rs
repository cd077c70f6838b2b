//! Tree scanner: expands one path frontier entry per attempt.

use super::{GcEngine, ScanOutcome, ScanReport};
use crate::metrics;
use rgc_core::PathKind;

impl GcEngine {
    /// Take one path off the path frontier and sort its children.
    ///
    /// Internal nodes go back on the path frontier, tag pointers go to the tag
    /// frontier, noise subtrees are never descended into. A listing failure drops
    /// the path; it is found again when its parent or the root is rescanned.
    pub async fn scan_one(&self) -> ScanOutcome {
        let Some(lease) = self.paths.try_lease() else {
            metrics::SCAN_ATTEMPTS.with_label_values(&["idle"]).inc();
            return ScanOutcome::Idle;
        };
        let path = lease.key().to_string();

        let outcome = match self.storage.list_children(&path).await {
            Ok(children) => ScanOutcome::Scanned(self.sort_children(&path, children)),
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "listing failed, abandoning path");
                ScanOutcome::Failed {
                    path,
                    error: e.to_string(),
                }
            }
        };

        drop(lease);
        metrics::SCAN_ATTEMPTS
            .with_label_values(&[outcome.label()])
            .inc();
        self.observe_frontiers();
        outcome
    }

    fn sort_children(&self, path: &str, children: Vec<String>) -> ScanReport {
        let mut report = ScanReport {
            path: path.to_string(),
            children: children.len(),
            ..Default::default()
        };

        for child in children {
            // Folder markers list as their own child
            if child == path || self.paths.contains(&child) || self.tags.contains(&child) {
                report.skipped += 1;
                continue;
            }

            match self.classifier.classify(&child) {
                PathKind::Root | PathKind::Noise => {
                    report.skipped += 1;
                }
                PathKind::TagPointer => {
                    if self.tags.enqueue(&child) {
                        metrics::TAGS_DISCOVERED.inc();
                        report.discovered_tags += 1;
                        tracing::info!(tag_pointer = %child, "tag pointer discovered");
                    }
                }
                PathKind::InternalNode => {
                    if self.paths.enqueue(&child) {
                        report.enqueued_paths += 1;
                        tracing::debug!(path = %child, "path discovered");
                    }
                }
            }
        }

        report
    }
}
