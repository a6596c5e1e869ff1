//! HTTP handlers for the transaction guard

mod api;
mod health;

pub use api::*;
pub use health::*;

use crate::guard::PolicyGuard;
use crate::metrics::{metrics_router, MetricsState};
use crate::middleware::{bearer_auth, require_role, AuthState, Role};
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared state for all handlers
pub struct AppState {
    pub guard: Arc<PolicyGuard>,
    /// Application start time
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(guard: Arc<PolicyGuard>) -> Self {
        Self {
            guard,
            started_at: Utc::now(),
        }
    }
}

/// Build the service router
///
/// Rate limiting is layered on by the binary since it needs the peer address.
pub fn build_router(
    state: Arc<AppState>,
    auth: Arc<AuthState>,
    metrics: Arc<MetricsState>,
) -> Router {
    let readonly_routes = Router::new()
        .route("/slippage", post(check_slippage))
        .route("/config", get(get_config))
        .route("/warnings", get(list_warnings))
        .route_layer(axum_middleware::from_fn_with_state(Role::Readonly, require_role));

    let operator_routes = Router::new()
        .route("/validate", post(validate_transaction))
        .route("/validate/unified", post(validate_unified_transaction))
        .route_layer(axum_middleware::from_fn_with_state(Role::Operator, require_role));

    let admin_routes = Router::new()
        .route("/config", axum::routing::put(update_config))
        .route(
            "/emergency-stop",
            post(activate_emergency_stop).delete(deactivate_emergency_stop),
        )
        .route("/warnings", axum::routing::delete(clear_warnings))
        .route_layer(axum_middleware::from_fn_with_state(Role::Admin, require_role));

    // Authenticated routes under /api/v1
    let protected_routes = Router::new()
        .merge(readonly_routes)
        .merge(operator_routes)
        .merge(admin_routes)
        .route_layer(axum_middleware::from_fn_with_state(auth, bearer_auth));

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .merge(protected_routes)
        .with_state(state);

    // Simple health check for load balancers
    let root_routes = Router::new().route("/health", get(health_simple));

    Router::new()
        .nest("/api/v1", api_routes)
        .merge(root_routes)
        .merge(metrics_router().with_state(metrics))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
