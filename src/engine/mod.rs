//! Policy engine
//!
//! Runs detectors, risk lookups and custom rules, then applies the blocking
//! matrix.

pub mod orchestrator;
pub mod policy;

pub use orchestrator::Orchestrator;
pub use policy::{decide, reject_structural, should_block_pattern};
