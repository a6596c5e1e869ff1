//! Data model shared by detectors, the orchestrator and the facade

mod transaction;
mod warning;

pub use transaction::*;
pub use warning::*;
