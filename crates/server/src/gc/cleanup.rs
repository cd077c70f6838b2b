//! Cleanup engine: reconciles one tag's digest index against its current digest.

use super::{AttemptError, CleanupOutcome, CleanupReport, GcEngine};
use crate::metrics;
use rgc_core::TagPointer;
use rgc_core::path::{index_entry_digest, manifest_reference, parse_link_digest};
use rgc_storage::delete_prefix;

impl GcEngine {
    /// Take one tag pointer off the tag frontier and remove its stale digests.
    pub async fn cleanup_one(&self) -> CleanupOutcome {
        let Some(lease) = self.tags.try_lease() else {
            metrics::CLEANUP_ATTEMPTS.with_label_values(&["idle"]).inc();
            return CleanupOutcome::Idle;
        };
        let tag_pointer = lease.key().to_string();

        let outcome = match self.cleanup_tag(&tag_pointer).await {
            Ok(report) => CleanupOutcome::Cleaned(report),
            Err(e) => {
                tracing::warn!(
                    tag_pointer = %tag_pointer,
                    error = %e,
                    "cleanup failed, tag left for the next scan"
                );
                CleanupOutcome::Failed {
                    tag_pointer,
                    error: e.to_string(),
                }
            }
        };

        drop(lease);
        metrics::CLEANUP_ATTEMPTS
            .with_label_values(&[outcome.label()])
            .inc();
        self.observe_frontiers();
        outcome
    }

    async fn cleanup_tag(&self, key: &str) -> Result<CleanupReport, AttemptError> {
        let content = self.storage.get(key).await?;
        let current = parse_link_digest(&String::from_utf8_lossy(&content))?;

        let pointer = TagPointer::parse(self.root(), key)?;
        if !pointer.is_resolved() {
            tracing::warn!(
                tag_pointer = %key,
                root = %self.root(),
                "tag pointer outside the expected layout, continuing without image and tag names"
            );
        }
        let (image, tag) = (pointer.image(), pointer.tag());
        tracing::info!(image = %image, tag = %tag, digest = %current, "cleanup");

        let mut report = CleanupReport {
            tag_pointer: key.to_string(),
            image: image.to_string(),
            tag: tag.to_string(),
            current_digest: current.clone(),
            dry_run: self.dry_run,
            ..Default::default()
        };

        for entry in self.storage.list_children(&pointer.index_prefix()).await? {
            let Some(digest) = index_entry_digest(&entry) else {
                tracing::debug!(entry = %entry, "ignoring non-digest index entry");
                continue;
            };

            if digest == current {
                report.kept += 1;
                tracing::debug!(entry = %entry, "stay");
                continue;
            }

            if self.dry_run {
                tracing::info!(image = %image, tag = %tag, digest = %digest, "would remove (dry run)");
                report.removed.push(digest.to_string());
                continue;
            }

            tracing::info!(image = %image, tag = %tag, digest = %digest, "remove");
            if !self.invalidate(&pointer, digest).await {
                report.invalidation_failures += 1;
            }

            // Independent of the registry call: the index entry goes either way
            match delete_prefix(self.storage.as_ref(), &pointer.index_entry(digest)).await {
                Ok(0) => {
                    tracing::debug!(digest = %digest, "index entry already gone");
                }
                Ok(objects) => {
                    metrics::DIGESTS_REMOVED.inc();
                    tracing::debug!(digest = %digest, objects, "index entry deleted");
                    report.removed.push(digest.to_string());
                }
                Err(e) => {
                    report.store_failures += 1;
                    tracing::warn!(
                        image = %image,
                        tag = %tag,
                        digest = %digest,
                        error = %e,
                        "failed to delete index entry"
                    );
                }
            }
        }

        if report.gc_pending() {
            tracing::info!(
                image = %image,
                tag = %tag,
                removed = report.removed.len(),
                "run registry blob GC for {image}:{tag}"
            );
        }

        Ok(report)
    }

    /// Ask the registry to drop a stale manifest. Returns false on failure.
    async fn invalidate(&self, pointer: &TagPointer, digest: &str) -> bool {
        if !pointer.is_resolved() {
            metrics::REGISTRY_INVALIDATIONS
                .with_label_values(&["skipped"])
                .inc();
            tracing::warn!(
                tag_pointer = %pointer.key(),
                digest = %digest,
                "image name unknown, skipping registry invalidation"
            );
            return true;
        }

        let reference = manifest_reference(digest);
        match self
            .registry
            .delete_manifest(pointer.image(), &reference)
            .await
        {
            Ok(()) => {
                metrics::REGISTRY_INVALIDATIONS
                    .with_label_values(&["ok"])
                    .inc();
                true
            }
            Err(e) => {
                metrics::REGISTRY_INVALIDATIONS
                    .with_label_values(&["failed"])
                    .inc();
                tracing::warn!(
                    image = %pointer.image(),
                    reference = %reference,
                    error = %e,
                    "registry invalidation failed"
                );
                false
            }
        }
    }
}
