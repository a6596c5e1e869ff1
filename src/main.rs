//! Transaction Guard - security policy service for Solana and EVM transactions
//!
//! This is the main entry point for the guard service.
//! It sets up the Axum web server with middleware and routes.

use std::net::SocketAddr;
use std::sync::Arc;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tx_guard::config::AppConfig;
use tx_guard::handlers::{build_router, AppState};
use tx_guard::metrics::MetricsState;
use tx_guard::middleware::AuthState;
use tx_guard::PolicyGuard;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    tracing::info!("Starting Transaction Guard v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = load_config()?;
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        "Configuration loaded"
    );

    let guard = PolicyGuard::from_app_config(&config)?;
    let metrics = Arc::new(MetricsState::new());
    let guard = Arc::new(guard.with_metrics(metrics.clone()));

    let auth_state = Arc::new(AuthState::from_config(&config.security));
    tracing::info!(
        api_keys = auth_state.key_count(),
        anonymous_readonly = config.security.allow_anonymous_readonly,
        "Authentication configured"
    );

    // Create rate limiter configuration
    let rate_limit_config = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(config.security.rate_limit_per_second as u64)
            .burst_size(config.security.burst_size)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
    );

    tracing::info!(
        rate_limit = config.security.rate_limit_per_second,
        burst_size = config.security.burst_size,
        "Rate limiting configured"
    );

    let app = build_router(Arc::new(AppState::new(guard)), auth_state, metrics)
        .layer(GovernorLayer { config: rate_limit_config });

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    tracing::info!(%addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Initialize tracing/logging
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tx_guard=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

/// Load and validate configuration
fn load_config() -> anyhow::Result<AppConfig> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = AppConfig::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Configuration validation failed: {}", e))?;

    Ok(config)
}
