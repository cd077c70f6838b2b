//! Prometheus metrics for the tag garbage collector.
//!
//! The `/metrics` endpoint is unauthenticated. Frontier gauges are labelled by
//! frontier name only; no repository or tag names end up in label values.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    self, Encoder, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
};
use rgc_core::Frontier;
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

pub static SCAN_ATTEMPTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "rgc_scan_attempts_total",
            "Scan attempts by result (idle, scanned, failed)",
        ),
        &["result"],
    )
    .expect("metric creation failed")
});

pub static TAGS_DISCOVERED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "rgc_tags_discovered_total",
        "Tag pointers handed to the tag frontier",
    )
    .expect("metric creation failed")
});

pub static CLEANUP_ATTEMPTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "rgc_cleanup_attempts_total",
            "Cleanup attempts by result (idle, cleaned, failed)",
        ),
        &["result"],
    )
    .expect("metric creation failed")
});

pub static DIGESTS_REMOVED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "rgc_digests_removed_total",
        "Stale digest index entries removed from the store",
    )
    .expect("metric creation failed")
});

pub static REGISTRY_INVALIDATIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "rgc_registry_invalidations_total",
            "Registry manifest deletions by result (ok, failed, skipped)",
        ),
        &["result"],
    )
    .expect("metric creation failed")
});

pub static FRONTIER_PENDING: LazyLock<IntGaugeVec> = LazyLock::new(|| {
    IntGaugeVec::new(
        Opts::new("rgc_frontier_pending", "Keys waiting in a frontier"),
        &["frontier"],
    )
    .expect("metric creation failed")
});

pub static FRONTIER_IN_FLIGHT: LazyLock<IntGaugeVec> = LazyLock::new(|| {
    IntGaugeVec::new(
        Opts::new("rgc_frontier_in_flight", "Keys currently being worked on"),
        &["frontier"],
    )
    .expect("metric creation failed")
});

pub static ROOT_RESEEDS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "rgc_root_reseeds_total",
        "Times the repository root was put back on the path frontier",
    )
    .expect("metric creation failed")
});

/// Guard to ensure metrics are only registered once.
static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry.
///
/// Idempotent, so tests and embedded routers can call it freely.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(SCAN_ATTEMPTS.clone()),
            Box::new(TAGS_DISCOVERED.clone()),
            Box::new(CLEANUP_ATTEMPTS.clone()),
            Box::new(DIGESTS_REMOVED.clone()),
            Box::new(REGISTRY_INVALIDATIONS.clone()),
            Box::new(FRONTIER_PENDING.clone()),
            Box::new(FRONTIER_IN_FLIGHT.clone()),
            Box::new(ROOT_RESEEDS.clone()),
        ];
        for collector in collectors {
            REGISTRY
                .register(collector)
                .expect("metric registration failed");
        }
    });
}

/// Publish a frontier's current sizes.
pub fn observe_frontier(frontier: &Frontier) {
    let name = frontier.name();
    FRONTIER_PENDING
        .with_label_values(&[name])
        .set(frontier.pending_len() as i64);
    FRONTIER_IN_FLIGHT
        .with_label_values(&[name])
        .set(frontier.in_flight_len() as i64);
}

/// GET /metrics - Prometheus metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}
