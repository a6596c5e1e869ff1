//! Policy Guard Tests
//!
//! Tests the facade state handling:
//! - Emergency stop result shape
//! - Warning history append and clear
//! - Config updates and custom rules
//! - Unified routing with chain adapters
//! - Concurrent validations

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;
use tx_guard::adapters::{ChainAdapter, ChainAdapterRegistry, ChainValidation, StructuralChainAdapter};
use tx_guard::config::{EnforcementMode, GuardConfig, GuardConfigUpdate, RiskTolerance};
use tx_guard::constants::{programs, GWEI};
use tx_guard::models::{
    AccountMeta, Chain, ChainTransactionData, EvmData, Instruction, PatternId, Severity,
    SolanaData, Transaction, UnifiedTransaction,
};
use tx_guard::rules::FnRule;
use tx_guard::PolicyGuard;

fn mint_kill_tx(id: &str) -> Transaction {
    Transaction {
        id: id.to_string(),
        status: "pending".to_string(),
        instructions: Some(vec![Instruction {
            program_id: programs::TOKEN.to_string(),
            data: STANDARD.encode([6u8, 0, 0]),
            keys: vec![AccountMeta {
                pubkey: "Mint111".to_string(),
                is_signer: false,
                is_writable: true,
            }],
        }]),
        ..Default::default()
    }
}

fn evm_tx(priority_fee_gwei: u128) -> UnifiedTransaction {
    UnifiedTransaction {
        id: "evm-1".to_string(),
        status: "pending".to_string(),
        chain: Chain::Ethereum,
        chain_data: ChainTransactionData::Evm(EvmData {
            to: Some("0xabc".to_string()),
            data: "0x".to_string(),
            max_priority_fee_per_gas: Some((priority_fee_gwei * GWEI).to_string()),
            chain_id: 1,
            ..Default::default()
        }),
        asset_addresses: None,
        operations: vec![],
        privacy_metadata: None,
    }
}

fn guard() -> PolicyGuard {
    PolicyGuard::new(GuardConfig::default()).unwrap()
}

// =============================================================================
// EMERGENCY STOP TESTS
// =============================================================================

#[tokio::test]
async fn test_emergency_stop_shape_is_payload_independent() {
    let guard = guard();
    guard.activate_emergency_stop();

    for tx in [Transaction::default(), mint_kill_tx("kill")] {
        let result = guard.validate_transaction(&tx).await;
        assert!(!result.is_valid);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].severity(), Severity::Critical);
        assert_eq!(result.blocked_by, vec![PatternId::EmergencyStop]);
    }

    let unified = guard.validate_unified_transaction(&evm_tx(1)).await;
    assert_eq!(unified.blocked_by, vec![PatternId::EmergencyStop]);
}

#[tokio::test]
async fn test_emergency_stop_applies_even_in_warn_mode() {
    let guard = PolicyGuard::new(GuardConfig {
        mode: EnforcementMode::Warn,
        emergency_stop: true,
        ..Default::default()
    })
    .unwrap();

    assert!(!guard.validate_transaction(&Transaction::default()).await.is_valid);
}

// =============================================================================
// HISTORY TESTS
// =============================================================================

#[tokio::test]
async fn test_history_after_clear_matches_single_call() {
    let guard = guard();
    guard.validate_transaction(&mint_kill_tx("a")).await;
    guard.validate_transaction(&mint_kill_tx("b")).await;
    assert_eq!(guard.history_len(), 2);

    guard.clear_warning_history();
    let result = guard.validate_transaction(&mint_kill_tx("c")).await;

    assert_eq!(guard.warning_history().len(), result.warnings.len());
    assert_eq!(guard.warning_history(), result.warnings);
}

#[tokio::test]
async fn test_concurrent_validations_keep_every_warning() {
    let guard = Arc::new(guard());

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let guard = guard.clone();
            tokio::spawn(async move {
                guard
                    .validate_transaction(&mint_kill_tx(&format!("tx-{}", i)))
                    .await
            })
        })
        .collect();

    for handle in handles {
        assert!(!handle.await.unwrap().is_valid);
    }
    assert_eq!(guard.history_len(), 32);
}

// =============================================================================
// CONFIG TESTS
// =============================================================================

#[tokio::test]
async fn test_warn_mode_update_unblocks() {
    let guard = guard();
    assert!(!guard.validate_transaction(&mint_kill_tx("a")).await.is_valid);

    guard
        .update_config(GuardConfigUpdate {
            mode: Some(EnforcementMode::Warn),
            ..Default::default()
        })
        .unwrap();

    let result = guard.validate_transaction(&mint_kill_tx("b")).await;
    assert!(result.is_valid);
    assert_eq!(result.warnings.len(), 1);
}

#[tokio::test]
async fn test_permissive_still_blocks_mint_kill() {
    let guard = PolicyGuard::new(GuardConfig {
        risk_tolerance: RiskTolerance::Permissive,
        ..Default::default()
    })
    .unwrap();

    let result = guard.validate_transaction(&mint_kill_tx("a")).await;
    assert!(result.is_blocked_by(PatternId::MintKill));
}

#[tokio::test]
async fn test_pattern_detection_can_be_disabled() {
    let guard = PolicyGuard::new(GuardConfig {
        enable_pattern_detection: false,
        ..Default::default()
    })
    .unwrap();

    let result = guard.validate_transaction(&mint_kill_tx("a")).await;
    assert!(result.is_valid);
    assert!(result.warnings.is_empty());
}

#[tokio::test]
async fn test_custom_rules_via_update() {
    let guard = guard();
    let mut rules = tx_guard::rules::CustomRules::default();
    rules.push(Arc::new(FnRule::new("needs-id", |tx: &Transaction| {
        Ok(!tx.id.is_empty())
    })));

    guard
        .update_config(GuardConfigUpdate {
            custom_rules: Some(rules),
            ..Default::default()
        })
        .unwrap();

    let result = guard.validate_transaction(&Transaction::default()).await;
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].pattern_id(), PatternId::CustomRuleViolation);
    assert!(result.is_valid);
}

#[tokio::test]
async fn test_validate_bool_helper() {
    let guard = guard();
    assert!(guard.validate(Some(&Transaction::default())).await);
    assert!(!guard.validate(Some(&mint_kill_tx("a"))).await);
}

// =============================================================================
// UNIFIED ROUTING TESTS
// =============================================================================

struct RejectingAdapter;

#[async_trait]
impl ChainAdapter for RejectingAdapter {
    fn chain(&self) -> Chain {
        Chain::Ethereum
    }

    async fn validate_transaction(&self, _tx: &UnifiedTransaction) -> ChainValidation {
        ChainValidation::invalid(vec!["bad nonce".to_string(), "bad sig".to_string()])
    }
}

#[tokio::test]
async fn test_chain_rejection_short_circuits() {
    let mut registry = ChainAdapterRegistry::new();
    registry.register(Arc::new(RejectingAdapter));
    let guard = guard().with_chain_registry(registry);

    let result = guard.validate_unified_transaction(&evm_tx(1)).await;

    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].pattern_id(), PatternId::ChainValidation);
    assert!(result.warnings[0].message().contains("bad nonce; bad sig"));
    assert_eq!(result.blocked_by, vec![PatternId::ChainValidation]);
}

#[tokio::test]
async fn test_chain_rejection_respects_warn_mode() {
    let mut registry = ChainAdapterRegistry::new();
    registry.register(Arc::new(RejectingAdapter));
    let guard = PolicyGuard::new(GuardConfig {
        mode: EnforcementMode::Warn,
        ..Default::default()
    })
    .unwrap()
    .with_chain_registry(registry);

    let result = guard.validate_unified_transaction(&evm_tx(1)).await;
    assert!(result.is_valid);
    assert_eq!(result.warnings.len(), 1);
}

#[tokio::test]
async fn test_chain_rejection_blocks_under_permissive() {
    let mut registry = ChainAdapterRegistry::new();
    registry.register(Arc::new(RejectingAdapter));
    let guard = PolicyGuard::new(GuardConfig {
        risk_tolerance: RiskTolerance::Permissive,
        ..Default::default()
    })
    .unwrap()
    .with_chain_registry(registry);

    let result = guard.validate_unified_transaction(&evm_tx(1)).await;
    assert!(!result.is_valid);
    assert_eq!(result.blocked_by, vec![PatternId::ChainValidation]);
}

#[tokio::test]
async fn test_adapter_fee_feeds_front_running_check() {
    let mut registry = ChainAdapterRegistry::new();
    registry.register(Arc::new(
        StructuralChainAdapter::new(Chain::Ethereum).with_average_priority_fee(10 * GWEI),
    ));
    let guard = guard().with_chain_registry(registry);

    let result = guard.validate_unified_transaction(&evm_tx(31)).await;
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].message().contains("3x"));
}

#[tokio::test]
async fn test_config_fee_is_fallback() {
    let guard = PolicyGuard::new(GuardConfig {
        network_average_priority_fee: Some(10 * GWEI),
        ..Default::default()
    })
    .unwrap();

    let result = guard.validate_unified_transaction(&evm_tx(31)).await;
    assert_eq!(result.warnings[0].pattern_id(), PatternId::FrontRunning);
    assert_eq!(result.warnings[0].severity(), Severity::Alert);
}

#[tokio::test]
async fn test_unified_solana_uses_solana_detector() {
    let legacy = mint_kill_tx("sol");
    let tx = UnifiedTransaction {
        id: "sol".to_string(),
        status: "pending".to_string(),
        chain: Chain::Solana,
        chain_data: ChainTransactionData::Solana(SolanaData {
            instructions: legacy.instructions.clone().unwrap_or_default(),
            signers: None,
        }),
        asset_addresses: None,
        operations: vec![],
        privacy_metadata: None,
    };
    let guard = guard().with_chain_registry(ChainAdapterRegistry::with_structural_defaults());

    let result = guard.validate_unified_transaction(&tx).await;
    assert!(result.is_blocked_by(PatternId::MintKill));
}
