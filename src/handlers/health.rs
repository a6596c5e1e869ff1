//! Health check endpoints

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::handlers::AppState;
use crate::models::Chain;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall service status
    pub status: HealthStatus,
    /// Uptime in seconds
    pub uptime_seconds: i64,
    /// Whether the emergency stop is active
    pub emergency_stop: bool,
    /// Current enforcement mode
    pub mode: String,
    /// Warnings held in history
    pub warning_history_size: usize,
    /// Whether a risk oracle is attached
    pub risk_adapter: bool,
    /// Chains with a registered adapter
    pub chains: Vec<Chain>,
}

/// Health status enum
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Validating normally
    Healthy,
    /// Up, but every transaction is being rejected
    Halted,
}

/// Health check handler
///
/// GET /api/v1/health
pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let uptime = (Utc::now() - state.started_at).num_seconds();
    let config = state.guard.config();

    let status = if config.emergency_stop {
        HealthStatus::Halted
    } else {
        HealthStatus::Healthy
    };

    let response = HealthResponse {
        status,
        uptime_seconds: uptime,
        emergency_stop: config.emergency_stop,
        mode: config.mode.to_string(),
        warning_history_size: state.guard.history_len(),
        risk_adapter: state.guard.has_risk_adapter(),
        chains: state.guard.registered_chains(),
    };

    // A halted guard is still serving requests
    (StatusCode::OK, Json(response))
}

/// Simple health check (for load balancers)
///
/// GET /health
pub async fn health_simple() -> StatusCode {
    StatusCode::OK
}
