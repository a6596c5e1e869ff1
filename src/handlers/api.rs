//! REST API handlers for the transaction guard
//!
//! Provides endpoints for:
//! - Validation: legacy and unified transactions
//! - Slippage: ceiling checks
//! - Config: view and partially update the policy
//! - Emergency stop: activate and deactivate
//! - Warnings: read and clear the history

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{GuardConfig, GuardConfigUpdate};
use crate::error::GuardError;
use crate::handlers::AppState;
use crate::middleware::Caller;
use crate::models::{SecurityWarning, Transaction, UnifiedTransaction, ValidationResult};

// =============================================================================
// VALIDATION API
// =============================================================================

/// Validate a legacy transaction
///
/// POST /api/v1/validate
/// Requires: operator+ role
pub async fn validate_transaction(
    State(state): State<Arc<AppState>>,
    Json(tx): Json<Transaction>,
) -> Json<ValidationResult> {
    Json(state.guard.validate_transaction(&tx).await)
}

/// Validate a multi-chain transaction
///
/// POST /api/v1/validate/unified
/// Requires: operator+ role
pub async fn validate_unified_transaction(
    State(state): State<Arc<AppState>>,
    Json(tx): Json<UnifiedTransaction>,
) -> Json<ValidationResult> {
    Json(state.guard.validate_unified_transaction(&tx).await)
}

// =============================================================================
// SLIPPAGE API
// =============================================================================

/// Request body for a slippage check
#[derive(Debug, Deserialize)]
pub struct SlippageRequest {
    /// Observed slippage as a fraction
    pub actual: f64,
}

/// Response for a slippage check
#[derive(Debug, Serialize)]
pub struct SlippageResponse {
    pub actual: f64,
    pub acceptable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_slippage: Option<f64>,
}

/// Check slippage against the configured ceiling
///
/// POST /api/v1/slippage
/// Requires: readonly+ role
pub async fn check_slippage(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SlippageRequest>,
) -> Result<Json<SlippageResponse>, GuardError> {
    if !body.actual.is_finite() {
        return Err(GuardError::Validation("actual must be a finite number".to_string()));
    }

    Ok(Json(SlippageResponse {
        actual: body.actual,
        acceptable: state.guard.is_slippage_acceptable(body.actual),
        max_slippage: state.guard.config().max_slippage,
    }))
}

// =============================================================================
// CONFIG API
// =============================================================================

/// Current policy config
#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    #[serde(flatten)]
    pub config: GuardConfig,
    /// Names of the loaded custom rules
    pub custom_rules: Vec<String>,
}

impl From<GuardConfig> for ConfigResponse {
    fn from(config: GuardConfig) -> Self {
        let custom_rules = config.custom_rules.names();
        Self {
            config,
            custom_rules,
        }
    }
}

/// Get current policy config
///
/// GET /api/v1/config
/// Requires: readonly+ role
pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<ConfigResponse> {
    Json(state.guard.config().into())
}

/// Partially update the policy config
///
/// PUT /api/v1/config
/// Requires: admin role
pub async fn update_config(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Json(update): Json<GuardConfigUpdate>,
) -> Result<Json<ConfigResponse>, GuardError> {
    state.guard.update_config(update)?;

    tracing::info!(changed_by = %caller.key_hint, "Policy config changed via API");

    Ok(Json(state.guard.config().into()))
}

// =============================================================================
// EMERGENCY STOP API
// =============================================================================

/// Emergency stop state
#[derive(Debug, Serialize)]
pub struct EmergencyStopResponse {
    pub emergency_stop: bool,
}

/// Activate the emergency stop
///
/// POST /api/v1/emergency-stop
/// Requires: admin role
pub async fn activate_emergency_stop(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Json<EmergencyStopResponse> {
    state.guard.activate_emergency_stop();
    tracing::warn!(triggered_by = %caller.key_hint, "Emergency stop triggered via API");

    Json(EmergencyStopResponse {
        emergency_stop: true,
    })
}

/// Deactivate the emergency stop
///
/// DELETE /api/v1/emergency-stop
/// Requires: admin role
pub async fn deactivate_emergency_stop(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Json<EmergencyStopResponse> {
    state.guard.deactivate_emergency_stop();
    tracing::info!(released_by = %caller.key_hint, "Emergency stop released via API");

    Json(EmergencyStopResponse {
        emergency_stop: false,
    })
}

// =============================================================================
// WARNINGS API
// =============================================================================

/// Response for the warning history
#[derive(Debug, Serialize)]
pub struct WarningsResponse {
    pub warnings: Vec<SecurityWarning>,
    pub total: usize,
}

/// List the warning history
///
/// GET /api/v1/warnings
/// Requires: readonly+ role
pub async fn list_warnings(State(state): State<Arc<AppState>>) -> Json<WarningsResponse> {
    let warnings = state.guard.warning_history();
    let total = warnings.len();
    Json(WarningsResponse { warnings, total })
}

/// Clear the warning history
///
/// DELETE /api/v1/warnings
/// Requires: admin role
pub async fn clear_warnings(State(state): State<Arc<AppState>>) -> StatusCode {
    state.guard.clear_warning_history();
    StatusCode::NO_CONTENT
}
