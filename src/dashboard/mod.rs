//! Dashboard — Axum web server exposing the fixture view.
//!
//! Serves the presented view as JSON plus a self-contained HTML page that
//! renders it and reports filter clicks and tab visibility back to the
//! sync loop. CORS enabled so the tournament site can embed it.

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderValue, Method},
    response::Html,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use routes::AppState;

/// The embedded fixture page (compiled into the binary).
const FIXTURES_HTML: &str = include_str!("templates/index.html");

/// Start the dashboard web server.
///
/// Binds before returning so a busy port is reported to the caller; the
/// server itself runs on a background task.
pub async fn spawn_dashboard(state: AppState, port: u16) -> Result<()> {
    let app = build_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind dashboard port {port}"))?;

    info!(port, "Dashboard server starting on http://localhost:{port}");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "Dashboard server error");
        }
    });

    Ok(())
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(HeaderValue::from_static("*"))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        // API routes
        .route("/api/fixtures", get(routes::get_fixtures))
        .route("/api/filter", post(routes::post_filter))
        .route("/api/visibility", post(routes::post_visibility))
        .route("/api/retry", post(routes::post_retry))
        .route("/health", get(routes::health))
        // Fixture page
        .route("/", get(serve_page))
        .layer(cors)
        .with_state(state)
}

/// Serve the embedded HTML page.
async fn serve_page() -> Html<&'static str> {
    Html(FIXTURES_HTML)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
