//! Validation orchestrator
//!
//! Runs one validation end to end:
//! 1. Emergency stop short-circuit
//! 2. Chain detector (Solana or EVM)
//! 3. Risk oracle lookup, bounded by the configured timeout
//! 4. Privacy compliance
//! 5. Custom rules (legacy path only)
//! 6. Blocking decision
//!
//! The orchestrator holds no mutable state; the facade passes the config
//! snapshot for each call.

use crate::adapters::{ComplianceStatus, RiskAdapter, RiskMetrics};
use crate::config::{EnforcementMode, GuardConfig, PulsarConfig};
use crate::detector::{EvmDetector, SolanaDetector};
use crate::engine::policy;
use crate::error::GuardError;
use crate::models::{
    ChainTransactionData, PatternId, PrivacyMetadata, SecurityWarning, Severity, Transaction,
    UnifiedTransaction, ValidationResult,
};
use crate::rules::CustomRules;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Counterparty risk above which a warning is raised
pub const COUNTERPARTY_RISK_LIMIT: f64 = 0.7;

/// Oracle integrity below which an alert is raised
pub const ORACLE_INTEGRITY_FLOOR: f64 = 0.8;

/// Stateless validation pipeline
#[derive(Clone, Default)]
pub struct Orchestrator {
    risk_adapter: Option<Arc<dyn RiskAdapter>>,
}

impl Orchestrator {
    pub fn new(risk_adapter: Option<Arc<dyn RiskAdapter>>) -> Self {
        Self { risk_adapter }
    }

    pub fn has_risk_adapter(&self) -> bool {
        self.risk_adapter.is_some()
    }

    /// Result returned while the emergency stop is active
    pub fn emergency_stop_result() -> ValidationResult {
        ValidationResult::from_decision(
            vec![SecurityWarning::new(
                PatternId::EmergencyStop,
                Severity::Critical,
                "Emergency stop is active: all transactions are halted",
            )],
            vec![PatternId::EmergencyStop],
        )
    }

    /// Validate a legacy (Solana-shaped) transaction
    pub async fn validate_legacy(&self, tx: &Transaction, config: &GuardConfig) -> ValidationResult {
        if config.emergency_stop {
            tracing::warn!(tx_id = %tx.id, "Emergency stop active, rejecting transaction");
            return Self::emergency_stop_result();
        }

        let mut warnings = Vec::new();

        if config.enable_pattern_detection {
            warnings.extend(SolanaDetector::analyze(
                tx.instructions(),
                &tx.signer_set(),
                &config.solana_detector_config(),
            ));
        }

        warnings.extend(self.assess_risk(tx.asset_addresses(), config).await);
        warnings.extend(check_privacy(tx.privacy_metadata.as_ref()));
        warnings.extend(evaluate_rules(&config.custom_rules, tx));

        finish(&tx.id, warnings, config)
    }

    /// Validate a multi-chain transaction
    ///
    /// `avg_priority_fee` is the network-average priority fee (wei) used by
    /// the EVM front-running check.
    pub async fn validate_unified(
        &self,
        tx: &UnifiedTransaction,
        config: &GuardConfig,
        avg_priority_fee: Option<u128>,
    ) -> ValidationResult {
        if config.emergency_stop {
            tracing::warn!(tx_id = %tx.id, chain = %tx.chain, "Emergency stop active, rejecting transaction");
            return Self::emergency_stop_result();
        }

        let mut warnings = Vec::new();

        if config.enable_pattern_detection {
            match tx.chain_data {
                ChainTransactionData::Evm(ref data) => {
                    warnings.extend(EvmDetector::analyze(data, avg_priority_fee));
                }
                ChainTransactionData::Solana(_) => {
                    if let Some(legacy) = tx.to_legacy() {
                        warnings.extend(SolanaDetector::analyze(
                            legacy.instructions(),
                            &legacy.signer_set(),
                            &config.solana_detector_config(),
                        ));
                    }
                }
            }
        }

        warnings.extend(self.assess_risk(tx.asset_addresses(), config).await);
        warnings.extend(check_privacy(tx.privacy_metadata.as_ref()));

        finish(&tx.id, warnings, config)
    }

    /// Query the risk oracle and translate metrics into warnings
    async fn assess_risk(&self, addresses: &[String], config: &GuardConfig) -> Vec<SecurityWarning> {
        let pulsar = match config.active_pulsar() {
            Some(p) => p,
            None => return Vec::new(),
        };
        if addresses.is_empty() {
            return Vec::new();
        }

        match self.fetch_metrics(addresses, pulsar).await {
            Ok(metrics) => {
                let mut warnings = Vec::new();
                // Keep the caller's address order
                for address in addresses {
                    if let Some(m) = metrics.get(address) {
                        warnings.extend(risk_warnings(address, m, pulsar));
                    }
                }
                warnings
            }
            Err(e) if pulsar.fallback_on_error => {
                tracing::warn!(error = %e, "Risk assessment failed, continuing without it");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Risk assessment failed");
                vec![SecurityWarning::new(
                    PatternId::RiskAssessmentFailure,
                    Severity::Warning,
                    format!("Risk assessment unavailable: {}", e),
                )]
            }
        }
    }

    async fn fetch_metrics(
        &self,
        addresses: &[String],
        pulsar: &PulsarConfig,
    ) -> Result<HashMap<String, RiskMetrics>, GuardError> {
        let adapter = self
            .risk_adapter
            .as_ref()
            .ok_or_else(|| GuardError::RiskAdapter("no risk adapter configured".to_string()))?;

        let budget = Duration::from_millis(pulsar.timeout_ms);
        match tokio::time::timeout(budget, adapter.get_batch_risk_metrics(addresses, pulsar)).await {
            Ok(result) => result,
            Err(_) => Err(GuardError::Timeout(format!(
                "risk lookup exceeded {}ms",
                pulsar.timeout_ms
            ))),
        }
    }
}

/// Warnings for one asset's metrics
fn risk_warnings(address: &str, metrics: &RiskMetrics, pulsar: &PulsarConfig) -> Vec<SecurityWarning> {
    let mut warnings = Vec::new();

    if let Some(score) = metrics.risk_score {
        if score > pulsar.risk_threshold {
            warnings.push(
                SecurityWarning::new(
                    PatternId::RiskThreshold,
                    Severity::Alert,
                    format!(
                        "Asset risk score {:.2} exceeds threshold {:.2}",
                        score, pulsar.risk_threshold
                    ),
                )
                .with_account(address),
            );
        }
    }

    if pulsar.enable_compliance_check
        && metrics.compliance_status == Some(ComplianceStatus::NonCompliant)
    {
        warnings.push(
            SecurityWarning::new(
                PatternId::RiskThreshold,
                Severity::Critical,
                "Asset failed compliance screening",
            )
            .with_account(address),
        );
    }

    if pulsar.enable_counterparty_check {
        if let Some(risk) = metrics.counterparty_risk {
            if risk > COUNTERPARTY_RISK_LIMIT {
                warnings.push(
                    SecurityWarning::new(
                        PatternId::RiskThreshold,
                        Severity::Warning,
                        format!("High counterparty risk: {:.2}", risk),
                    )
                    .with_account(address),
                );
            }
        }
    }

    if pulsar.enable_oracle_check {
        if let Some(integrity) = metrics.oracle_integrity {
            if integrity < ORACLE_INTEGRITY_FLOOR {
                warnings.push(
                    SecurityWarning::new(
                        PatternId::RiskThreshold,
                        Severity::Alert,
                        format!("Price oracle integrity degraded: {:.2}", integrity),
                    )
                    .with_account(address),
                );
            }
        }
    }

    warnings
}

fn check_privacy(privacy: Option<&PrivacyMetadata>) -> Option<SecurityWarning> {
    privacy.filter(|p| p.is_uncompressed_private()).map(|_| {
        SecurityWarning::new(
            PatternId::PrivacyCompliance,
            Severity::Warning,
            "Privacy requested but compression is disabled",
        )
    })
}

fn evaluate_rules(rules: &CustomRules, tx: &Transaction) -> Vec<SecurityWarning> {
    let mut warnings = Vec::new();

    for rule in rules.iter().filter(|r| r.enabled()) {
        match rule.validate(tx) {
            Ok(true) => {}
            Ok(false) => warnings.push(SecurityWarning::new(
                PatternId::CustomRuleViolation,
                Severity::Warning,
                format!("Custom rule violated: {}", rule.name()),
            )),
            Err(reason) => {
                tracing::warn!(rule = %rule.name(), reason = %reason, "Custom rule failed to evaluate");
                warnings.push(SecurityWarning::new(
                    PatternId::CustomRuleError,
                    Severity::Warning,
                    format!("Custom rule {} failed: {}", rule.name(), reason),
                ));
            }
        }
    }

    warnings
}

/// Apply the blocking decision and log findings for the active mode
fn finish(tx_id: &str, warnings: Vec<SecurityWarning>, config: &GuardConfig) -> ValidationResult {
    let result = policy::decide(warnings, config.mode, config.risk_tolerance);

    for w in &result.warnings {
        match config.mode {
            EnforcementMode::Monitor => tracing::debug!(
                tx_id = %tx_id,
                pattern = %w.pattern_id(),
                severity = %w.severity(),
                "{}",
                w.message()
            ),
            EnforcementMode::Block | EnforcementMode::Warn => tracing::info!(
                tx_id = %tx_id,
                pattern = %w.pattern_id(),
                severity = %w.severity(),
                "{}",
                w.message()
            ),
        }
    }

    if !result.is_valid {
        tracing::warn!(
            tx_id = %tx_id,
            mode = %config.mode,
            blocked_by = ?result.blocked_by,
            "Transaction blocked"
        );
    }

    result
}
