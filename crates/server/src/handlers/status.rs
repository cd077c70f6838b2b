//! Frontier status endpoints.

use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use serde::Serialize;

/// GET / - tag pointers waiting for cleanup.
pub async fn pending_tags(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.engine.tags().pending())
}

#[derive(Debug, Serialize)]
pub struct FrontierStatus {
    pub pending: usize,
    pub in_flight: usize,
}

#[derive(Debug, Serialize)]
pub struct TagFrontierStatus {
    pub pending: usize,
    pub in_flight: usize,
    pub pending_tags: Vec<String>,
}

/// Status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub root: String,
    pub backend: &'static str,
    pub dry_run: bool,
    pub paths: FrontierStatus,
    pub tags: TagFrontierStatus,
}

/// GET /v1/status
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let engine = &state.engine;
    let paths = engine.paths().snapshot();
    let tags = engine.tags().snapshot();

    Json(StatusResponse {
        root: engine.root().to_string(),
        backend: state.storage.backend_name(),
        dry_run: engine.dry_run(),
        paths: FrontierStatus {
            pending: paths.pending.len(),
            in_flight: paths.in_flight.len(),
        },
        tags: TagFrontierStatus {
            pending: tags.pending.len(),
            in_flight: tags.in_flight.len(),
            pending_tags: tags.pending,
        },
    })
}
