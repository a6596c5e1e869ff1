//! External collaborators consumed by the engine
//!
//! - Risk/compliance oracle (batch metric lookup)
//! - Chain adapters (structural validation, fee context)

pub mod chain;
pub mod risk;

pub use chain::{ChainAdapter, ChainAdapterRegistry, ChainValidation, StructuralChainAdapter};
pub use risk::{ComplianceStatus, RiskAdapter, RiskMetrics, StaticRiskAdapter};
