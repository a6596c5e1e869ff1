//! Chain adapter contract and registry
//!
//! Adapters normalize and structurally validate transactions for one chain.
//! They are registered once at startup and resolved by chain identifier.

use crate::models::{Chain, ChainTransactionData, UnifiedTransaction};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Structural validation verdict
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainValidation {
    pub is_valid: bool,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl ChainValidation {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub fn invalid(errors: Vec<String>) -> Self {
        Self {
            is_valid: false,
            errors,
        }
    }
}

/// Chain-specific adapter
#[async_trait]
pub trait ChainAdapter: Send + Sync {
    /// Chain served by this adapter
    fn chain(&self) -> Chain;

    /// Structural/semantic validation specific to the chain
    async fn validate_transaction(&self, tx: &UnifiedTransaction) -> ChainValidation;

    /// Current network-average priority fee in wei, if known
    async fn average_priority_fee(&self) -> Option<u128> {
        None
    }
}

/// Adapters keyed by chain
#[derive(Clone, Default)]
pub struct ChainAdapterRegistry {
    adapters: HashMap<Chain, Arc<dyn ChainAdapter>>,
}

impl ChainAdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with a `StructuralChainAdapter` for every supported chain
    pub fn with_structural_defaults() -> Self {
        let mut registry = Self::new();
        for chain in [
            Chain::Solana,
            Chain::Ethereum,
            Chain::Polygon,
            Chain::Arbitrum,
            Chain::Optimism,
            Chain::Base,
            Chain::Bsc,
            Chain::Avalanche,
        ] {
            registry.register(Arc::new(StructuralChainAdapter::new(chain)));
        }
        registry
    }

    /// Register an adapter, replacing any previous one for the same chain
    pub fn register(&mut self, adapter: Arc<dyn ChainAdapter>) {
        let chain = adapter.chain();
        if self.adapters.insert(chain, adapter).is_some() {
            tracing::debug!(chain = %chain, "Replaced chain adapter");
        }
    }

    pub fn get(&self, chain: Chain) -> Option<Arc<dyn ChainAdapter>> {
        self.adapters.get(&chain).cloned()
    }

    pub fn chains(&self) -> Vec<Chain> {
        self.adapters.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl std::fmt::Debug for ChainAdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainAdapterRegistry")
            .field("chains", &self.chains())
            .finish()
    }
}

/// Offline adapter that checks payload shape only
///
/// Verifies the payload family matches the chain, the EVM chain id is set
/// and hex calldata is well formed, and Solana payloads carry instructions.
pub struct StructuralChainAdapter {
    chain: Chain,
    average_priority_fee: Option<u128>,
}

impl StructuralChainAdapter {
    pub fn new(chain: Chain) -> Self {
        Self {
            chain,
            average_priority_fee: None,
        }
    }

    /// Report a fixed network-average priority fee
    pub fn with_average_priority_fee(mut self, wei: u128) -> Self {
        self.average_priority_fee = Some(wei);
        self
    }
}

#[async_trait]
impl ChainAdapter for StructuralChainAdapter {
    fn chain(&self) -> Chain {
        self.chain
    }

    async fn validate_transaction(&self, tx: &UnifiedTransaction) -> ChainValidation {
        let mut errors = Vec::new();

        if tx.chain != self.chain {
            errors.push(format!(
                "Transaction chain {} does not match adapter chain {}",
                tx.chain, self.chain
            ));
        }

        match tx.chain_data {
            ChainTransactionData::Solana(ref data) => {
                if self.chain.is_evm() {
                    errors.push(format!("Solana payload submitted for {}", self.chain));
                }
                if data.instructions.is_empty() {
                    errors.push("Solana transaction has no instructions".to_string());
                }
            }
            ChainTransactionData::Evm(ref data) => {
                if !self.chain.is_evm() {
                    errors.push(format!("EVM payload submitted for {}", self.chain));
                }
                if data.chain_id == 0 {
                    errors.push("EVM transaction is missing chainId".to_string());
                }
                let body = data.data.strip_prefix("0x").unwrap_or(&data.data);
                if body.len() % 2 != 0 || hex::decode(body).is_err() {
                    errors.push("EVM calldata is not valid hex".to_string());
                }
            }
        }

        if errors.is_empty() {
            ChainValidation::valid()
        } else {
            ChainValidation::invalid(errors)
        }
    }

    async fn average_priority_fee(&self) -> Option<u128> {
        self.average_priority_fee
    }
}
