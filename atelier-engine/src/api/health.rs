//! Health check endpoints

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status ("ok" or "degraded")
    pub status: String,
    /// Module name ("atelier-engine")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
    /// Whether branch-backed stores are currently available
    pub branching: bool,
}

/// GET /health
///
/// Reports "degraded" once the branch backend has been written off for
/// the process lifetime; the service itself keeps working against the
/// primary store.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    let degraded = state.branches.is_degraded();
    Json(HealthResponse {
        status: if degraded { "degraded" } else { "ok" }.to_string(),
        module: "atelier-engine".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        branching: !degraded,
    })
}

/// GET /
pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "atelier-engine",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
}
