//! Chain-specific threat detectors
//!
//! Both detectors are pure functions over their inputs and are safe to call
//! from any number of threads.

pub mod evm;
pub mod solana;

pub use evm::{EvmDetector, Selector};
pub use solana::{SolanaDetector, SolanaDetectorConfig};
