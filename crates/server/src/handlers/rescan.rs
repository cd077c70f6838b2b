//! Manual rescan trigger.

use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct RescanResponse {
    /// False when the root was already queued or being scanned.
    pub enqueued: bool,
    pub root: String,
}

/// POST /v1/rescan - queue the repository root for a new scan cycle.
pub async fn trigger_rescan(State(state): State<AppState>) -> (StatusCode, Json<RescanResponse>) {
    let enqueued = state.engine.reseed();
    (
        StatusCode::ACCEPTED,
        Json(RescanResponse {
            enqueued,
            root: state.engine.root().to_string(),
        }),
    )
}
