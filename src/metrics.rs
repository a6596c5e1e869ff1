//! Prometheus metrics for the transaction guard
//!
//! Exposes metrics endpoint for monitoring:
//! - Validations by path and outcome
//! - Warnings by pattern and severity
//! - Validation latency histogram
//! - Emergency stop gauge
//! - Warning history size gauge

use crate::models::ValidationResult;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Metrics state
pub struct MetricsState {
    /// Prometheus registry
    registry: Registry,
    /// Validations by path (legacy/unified) and outcome (allowed/blocked)
    pub validations: IntCounterVec,
    /// Warnings by pattern code and severity
    pub warnings: IntCounterVec,
    /// Validation latency (in milliseconds) by path
    pub validation_latency: HistogramVec,
    /// Emergency stop gauge (1 = active, 0 = inactive)
    pub emergency_stop: IntGauge,
    /// Current warning history length
    pub history_size: IntGauge,
}

impl MetricsState {
    /// Create a new metrics state with all metrics registered
    pub fn new() -> Self {
        let registry = Registry::new();

        let validations = IntCounterVec::new(
            Opts::new("txguard_validations_total", "Transactions validated"),
            &["path", "outcome"],
        )
        .expect("Failed to create validations counter");
        registry
            .register(Box::new(validations.clone()))
            .expect("Failed to register validations");

        let warnings = IntCounterVec::new(
            Opts::new("txguard_warnings_total", "Security warnings raised"),
            &["pattern", "severity"],
        )
        .expect("Failed to create warnings counter");
        registry
            .register(Box::new(warnings.clone()))
            .expect("Failed to register warnings");

        let validation_latency = HistogramVec::new(
            HistogramOpts::new(
                "txguard_validation_latency_ms",
                "Validation latency in milliseconds",
            ),
            &["path"],
        )
        .expect("Failed to create validation_latency histogram");
        registry
            .register(Box::new(validation_latency.clone()))
            .expect("Failed to register validation_latency");

        let emergency_stop = IntGauge::with_opts(Opts::new(
            "txguard_emergency_stop",
            "Emergency stop state (1 = active, 0 = inactive)",
        ))
        .expect("Failed to create emergency_stop gauge");
        registry
            .register(Box::new(emergency_stop.clone()))
            .expect("Failed to register emergency_stop");

        let history_size = IntGauge::with_opts(Opts::new(
            "txguard_warning_history_size",
            "Warnings currently held in history",
        ))
        .expect("Failed to create history_size gauge");
        registry
            .register(Box::new(history_size.clone()))
            .expect("Failed to register history_size");

        Self {
            registry,
            validations,
            warnings,
            validation_latency,
            emergency_stop,
            history_size,
        }
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record one finished validation
    pub fn record_validation(&self, path: &str, result: &ValidationResult, elapsed_ms: f64) {
        let outcome = if result.is_valid { "allowed" } else { "blocked" };
        self.validations.with_label_values(&[path, outcome]).inc();
        self.validation_latency
            .with_label_values(&[path])
            .observe(elapsed_ms);

        for w in &result.warnings {
            self.warnings
                .with_label_values(&[w.pattern_id().code(), &w.severity().to_string()])
                .inc();
        }
    }

    /// Render the registry in Prometheus text format
    pub fn render(&self) -> Result<Vec<u8>, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }
}

impl Default for MetricsState {
    fn default() -> Self {
        Self::new()
    }
}

/// Metrics handler - returns Prometheus metrics in text format
///
/// GET /metrics
pub async fn metrics_handler(State(state): State<Arc<MetricsState>>) -> impl IntoResponse {
    match state.render() {
        Ok(buffer) => (
            StatusCode::OK,
            [("Content-Type", "text/plain; version=0.0.4")],
            buffer,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Create metrics router
pub fn metrics_router() -> Router<Arc<MetricsState>> {
    Router::new().route("/metrics", get(metrics_handler))
}
