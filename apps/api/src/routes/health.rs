use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, State},
    Json,
};
use serde_json::{json, Value};
use tracing::debug;

use crate::errors::AppError;
use crate::rate_limit;
use crate::state::AppState;

/// GET|HEAD /health
/// Returns a simple status object with service version.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "screener-api"
    }))
}

/// GET|HEAD /
/// Service banner with the endpoint map. Quota-limited per client IP.
pub async fn root_handler(
    State(state): State<AppState>,
    connect: Option<ConnectInfo<SocketAddr>>,
) -> Result<Json<Value>, AppError> {
    let ip = rate_limit::client_ip(connect);
    rate_limit::check(&state.root_limiter, ip)?;
    debug!("Root endpoint hit by {ip}");

    Ok(Json(json!({
        "message": "AI Resume Screening API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "active",
        "endpoints": {
            "batch_scoring": "/api/scoring/process-batch",
            "check_status": "/api/scoring/status/{task_id}",
            "check_results": "/api/scoring/results/{task_id}",
            "test_endpoints": "/api/test/"
        }
    })))
}
