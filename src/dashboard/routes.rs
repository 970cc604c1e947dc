//! Dashboard API route handlers.
//!
//! Reads come from the presenter's watch channel; writes are forwarded to
//! the sync loop through an `EngineHandle`. State is shared via
//! `Arc<DashboardState>`.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

use crate::engine::{EngineHandle, Visibility};
use crate::types::{FixtureError, PresentedView};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub view: watch::Receiver<PresentedView>,
    pub engine: EngineHandle,
}

impl DashboardState {
    pub fn new(view: watch::Receiver<PresentedView>, engine: EngineHandle) -> Self {
        Self { view, engine }
    }
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct FilterRequest {
    pub filter: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VisibilityRequest {
    pub visible: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/fixtures
pub async fn get_fixtures(State(state): State<AppState>) -> Json<PresentedView> {
    Json(state.view.borrow().clone())
}

/// Map an engine error onto an HTTP status and JSON body.
fn error_response(e: FixtureError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &e {
        FixtureError::InvalidFilter(_) => StatusCode::BAD_REQUEST,
        FixtureError::LoopStopped => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorResponse { error: e.to_string() }))
}

type ApiResult = Result<StatusCode, (StatusCode, Json<ErrorResponse>)>;

/// POST /api/filter
pub async fn post_filter(
    State(state): State<AppState>,
    Json(req): Json<FilterRequest>,
) -> ApiResult {
    state
        .engine
        .apply_filter(&req.filter)
        .await
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(error_response)
}

/// POST /api/visibility
pub async fn post_visibility(
    State(state): State<AppState>,
    Json(req): Json<VisibilityRequest>,
) -> ApiResult {
    state
        .engine
        .set_visibility(Visibility::from(req.visible))
        .await
        .map(|()| StatusCode::ACCEPTED)
        .map_err(error_response)
}

/// POST /api/retry
pub async fn post_retry(State(state): State<AppState>) -> ApiResult {
    state
        .engine
        .retry()
        .await
        .map(|()| StatusCode::ACCEPTED)
        .map_err(error_response)
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
