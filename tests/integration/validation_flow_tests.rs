//! Validation Flow Tests
//!
//! End-to-end validations through a guard assembled from service config:
//! - Risk table lookups and oracle failure handling
//! - Declarative custom rules
//! - Privacy compliance
//! - Structural chain validation on the unified path

use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use tx_guard::adapters::{RiskMetrics, StaticRiskAdapter};
use tx_guard::config::{AppConfig, GuardConfig, PulsarConfig};
use tx_guard::models::{PatternId, Severity, Transaction, UnifiedTransaction};
use tx_guard::PolicyGuard;

fn guard_from_yaml(yaml: &str) -> PolicyGuard {
    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    let config = AppConfig::load_from(file.path()).unwrap();
    config.validate().unwrap();
    PolicyGuard::from_app_config(&config).unwrap()
}

fn tx(value: serde_json::Value) -> Transaction {
    serde_json::from_value(value).unwrap()
}

fn unified(value: serde_json::Value) -> UnifiedTransaction {
    serde_json::from_value(value).unwrap()
}

// =============================================================================
// RISK ASSESSMENT FLOW
// =============================================================================

#[tokio::test]
async fn test_non_compliant_asset_blocks() {
    let guard = guard_from_yaml(
        r#"
guard:
  pulsar:
    enabled: true
risk:
  assets:
    sanctionedmint:
      risk_score: 0.2
      compliance_status: non_compliant
"#,
    );

    let result = guard
        .validate_transaction(&tx(json!({
            "id": "t1",
            "assetAddresses": ["sanctionedmint", "cleanmint"]
        })))
        .await;

    assert!(!result.is_valid);
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].pattern_id(), PatternId::RiskThreshold);
    assert_eq!(result.warnings[0].severity(), Severity::Critical);
    assert_eq!(result.warnings[0].affected_account(), Some("sanctionedmint"));
}

#[tokio::test]
async fn test_disabled_pulsar_skips_lookup() {
    let guard = guard_from_yaml(
        r#"
risk:
  assets:
    sanctionedmint:
      compliance_status: non_compliant
"#,
    );

    let result = guard
        .validate_transaction(&tx(json!({"id": "t1", "assetAddresses": ["sanctionedmint"]})))
        .await;
    assert!(result.is_valid);
    assert!(result.warnings.is_empty());
}

#[tokio::test]
async fn test_disabled_compliance_check_is_ignored() {
    let adapter = StaticRiskAdapter::default();
    adapter.set_metrics(
        "MintA",
        RiskMetrics {
            compliance_status: Some(tx_guard::adapters::ComplianceStatus::NonCompliant),
            ..Default::default()
        },
    );
    let guard = PolicyGuard::new(GuardConfig {
        pulsar: Some(PulsarConfig {
            enabled: true,
            enable_compliance_check: false,
            ..Default::default()
        }),
        ..Default::default()
    })
    .unwrap()
    .with_risk_adapter(Arc::new(adapter));

    let result = guard
        .validate_transaction(&tx(json!({"id": "t1", "assetAddresses": ["MintA"]})))
        .await;
    assert!(result.warnings.is_empty());
}

#[tokio::test]
async fn test_oracle_outage_is_non_blocking_warning() {
    let adapter = Arc::new(StaticRiskAdapter::default());
    adapter.fail_with("connection refused");
    let guard = PolicyGuard::new(GuardConfig {
        pulsar: Some(PulsarConfig {
            enabled: true,
            ..Default::default()
        }),
        ..Default::default()
    })
    .unwrap()
    .with_risk_adapter(adapter.clone());

    let tx = tx(json!({"id": "t1", "assetAddresses": ["MintA"]}));
    let result = guard.validate_transaction(&tx).await;
    assert!(result.is_valid);
    assert_eq!(result.warnings[0].pattern_id(), PatternId::RiskAssessmentFailure);
    assert!(result.warnings[0].message().contains("connection refused"));

    adapter.recover();
    let result = guard.validate_transaction(&tx).await;
    assert!(result.warnings.is_empty());
}

// =============================================================================
// RULES & PRIVACY FLOW
// =============================================================================

#[tokio::test]
async fn test_declarative_rules_from_config() {
    let guard = guard_from_yaml(
        r#"
rules:
  - kind: denied_programs
    name: no-evil
    programs:
      - evilprogram
"#,
    );

    let result = guard
        .validate_transaction(&tx(json!({
            "id": "t1",
            "instructions": [{"programId": "evilprogram", "data": "", "keys": []}]
        })))
        .await;

    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].pattern_id(), PatternId::CustomRuleViolation);
    assert!(result.warnings[0].message().contains("no-evil"));
    assert_eq!(guard.config().custom_rules.names(), vec!["no-evil"]);
}

#[tokio::test]
async fn test_rules_do_not_run_on_unified_path() {
    let guard = guard_from_yaml(
        r#"
rules:
  - kind: max_instructions
    name: cap
    limit: 0
"#,
    );

    let result = guard
        .validate_unified_transaction(&unified(json!({
            "id": "u1",
            "chain": "solana",
            "chainData": {
                "type": "solana",
                "data": {"instructions": [{"programId": "11111111111111111111111111111111", "data": "", "keys": []}]}
            }
        })))
        .await;
    assert!(result.warnings.is_empty());
}

#[tokio::test]
async fn test_privacy_without_compression() {
    let guard = guard_from_yaml("server:\n  port: 8080\n");

    let result = guard
        .validate_transaction(&tx(json!({
            "id": "t1",
            "privacyMetadata": {"requiresPrivacy": true, "compressionEnabled": false}
        })))
        .await;
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].pattern_id(), PatternId::PrivacyCompliance);
    assert!(result.is_valid);

    let result = guard
        .validate_transaction(&tx(json!({
            "id": "t2",
            "privacyMetadata": {"requiresPrivacy": true, "compressionEnabled": true}
        })))
        .await;
    assert!(result.warnings.is_empty());
}

// =============================================================================
// UNIFIED FLOW
// =============================================================================

#[tokio::test]
async fn test_structural_rejection_of_mismatched_payload() {
    let guard = guard_from_yaml("server:\n  port: 8080\n");

    let result = guard
        .validate_unified_transaction(&unified(json!({
            "id": "u1",
            "chain": "polygon",
            "chainData": {"type": "solana", "data": {"instructions": []}}
        })))
        .await;

    assert!(!result.is_valid);
    assert_eq!(result.blocked_by, vec![PatternId::ChainValidation]);
}

#[tokio::test]
async fn test_unregistered_chain_skips_structural_check() {
    let guard = guard_from_yaml("chains:\n  structural:\n    - solana\n");

    let result = guard
        .validate_unified_transaction(&unified(json!({
            "id": "u1",
            "chain": "base",
            "chainData": {"type": "evm", "data": {"data": "0xf2fde38b", "chainId": 0}}
        })))
        .await;

    assert_eq!(result.blocked_by, vec![PatternId::UnauthorizedAccess]);
}

#[tokio::test]
async fn test_configured_average_fee_reaches_detector() {
    let guard = guard_from_yaml("guard:\n  network_average_priority_fee: 10000000000\n");

    let result = guard
        .validate_unified_transaction(&unified(json!({
            "id": "u1",
            "chain": "arbitrum",
            "chainData": {
                "type": "evm",
                "data": {"data": "0x", "chainId": 42161, "maxPriorityFeePerGas": "31000000000"}
            }
        })))
        .await;

    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].pattern_id(), PatternId::FrontRunning);
    assert!(result.warnings[0].message().contains("3x"));
}
