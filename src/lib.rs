//! Transaction Guard Library
//!
//! Security policy engine for Solana and EVM transactions.
//! This library exposes core modules for the service, the CLI and tests.

pub mod adapters;
pub mod config;
pub mod constants;
pub mod detector;
pub mod engine;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod rules;

// Re-export commonly used types for tests
pub use adapters::{ChainAdapter, ChainAdapterRegistry, RiskAdapter, RiskMetrics, StaticRiskAdapter};
pub use config::{AppConfig, EnforcementMode, GuardConfig, GuardConfigUpdate, PulsarConfig, RiskTolerance};
pub use detector::{EvmDetector, SolanaDetector};
pub use error::{GuardError, GuardResult};
pub use guard::PolicyGuard;
pub use middleware::{AuthState, Role};
pub use models::{
    Chain, PatternId, SecurityWarning, Severity, Transaction, UnifiedTransaction, ValidationResult,
};
pub use rules::{CustomRule, FnRule};
