//! Error types for the transaction guard

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Guard-level errors
///
/// Only configuration errors escape a validation call; everything else is
/// folded into warnings by the orchestrator.
#[derive(Error, Debug)]
pub enum GuardError {
    /// Configuration loading error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Configuration value rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Risk oracle failure
    #[error("Risk adapter error: {0}")]
    RiskAdapter(String),

    /// Chain adapter failure
    #[error("Chain adapter error: {0}")]
    ChainAdapter(String),

    /// External call exceeded its time budget
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Malformed request payload
    #[error("Validation error: {0}")]
    Validation(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response structure for API
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl GuardError {
    fn status_and_reason(&self) -> (StatusCode, &'static str, &'static str) {
        match self {
            GuardError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "error", "configuration_error"),
            GuardError::InvalidConfig(_) => (StatusCode::BAD_REQUEST, "rejected", "invalid_config"),
            GuardError::RiskAdapter(_) => (StatusCode::SERVICE_UNAVAILABLE, "error", "risk_adapter_error"),
            GuardError::ChainAdapter(_) => (StatusCode::SERVICE_UNAVAILABLE, "error", "chain_adapter_error"),
            GuardError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "error", "timeout"),
            GuardError::Validation(_) => (StatusCode::BAD_REQUEST, "rejected", "validation_failed"),
            GuardError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "error", "internal_error"),
        }
    }
}

impl IntoResponse for GuardError {
    fn into_response(self) -> Response {
        let (status_code, status, reason) = self.status_and_reason();
        let details = match &self {
            GuardError::Config(e) => e.to_string(),
            GuardError::InvalidConfig(msg)
            | GuardError::RiskAdapter(msg)
            | GuardError::ChainAdapter(msg)
            | GuardError::Timeout(msg)
            | GuardError::Validation(msg)
            | GuardError::Internal(msg) => msg.clone(),
        };

        tracing::error!(
            error_type = %self,
            status_code = %status_code,
            "Request error"
        );

        let body = ErrorResponse {
            status,
            reason: reason.to_string(),
            details: Some(details),
        };

        (status_code, Json(json!(body))).into_response()
    }
}

/// Result type alias for convenience
pub type GuardResult<T> = Result<T, GuardError>;
