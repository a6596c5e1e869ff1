//! Policy facade
//!
//! `PolicyGuard` owns the mutable policy state (config and warning history)
//! and is the single entry point callers use. It is `Send + Sync` and meant
//! to be shared behind an `Arc`.

use crate::adapters::{
    ChainAdapterRegistry, RiskAdapter, StaticRiskAdapter, StructuralChainAdapter,
};
use crate::config::{AppConfig, GuardConfig, GuardConfigUpdate};
use crate::engine::{policy, Orchestrator};
use crate::error::GuardResult;
use crate::metrics::MetricsState;
use crate::models::{
    Chain, PatternId, SecurityWarning, Severity, Transaction, UnifiedTransaction,
    ValidationResult,
};
use crate::rules::build_rules;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Instant;

/// Transaction policy guard
pub struct PolicyGuard {
    /// Current config; each validation works on an `Arc` snapshot
    config: RwLock<Arc<GuardConfig>>,
    /// Every warning produced since the last clear
    history: Mutex<Vec<SecurityWarning>>,
    orchestrator: Orchestrator,
    chains: ChainAdapterRegistry,
    metrics: Option<Arc<MetricsState>>,
}

impl PolicyGuard {
    /// Create a guard; rejects invalid config
    pub fn new(config: GuardConfig) -> GuardResult<Self> {
        config.validate()?;

        tracing::info!(
            mode = %config.mode,
            risk_tolerance = %config.risk_tolerance,
            pattern_detection = config.enable_pattern_detection,
            custom_rules = config.custom_rules.len(),
            "Policy guard initialized"
        );

        Ok(Self {
            config: RwLock::new(Arc::new(config)),
            history: Mutex::new(Vec::new()),
            orchestrator: Orchestrator::default(),
            chains: ChainAdapterRegistry::new(),
            metrics: None,
        })
    }

    /// Assemble a guard and its bundled adapters from service config
    ///
    /// Declarative rules are appended to the runtime rules, every listed chain
    /// gets a structural adapter and the static risk table backs the oracle.
    pub fn from_app_config(app: &AppConfig) -> GuardResult<Self> {
        let mut config = app.guard.clone();
        for rule in build_rules(&app.rules).iter() {
            config.custom_rules.push(rule.clone());
        }

        let mut registry = ChainAdapterRegistry::new();
        for chain in &app.chains.structural {
            let mut adapter = StructuralChainAdapter::new(*chain);
            if let (true, Some(fee)) = (chain.is_evm(), config.network_average_priority_fee) {
                adapter = adapter.with_average_priority_fee(fee);
            }
            registry.register(Arc::new(adapter));
        }

        tracing::debug!(
            chains = ?registry.chains(),
            custom_rules = ?config.custom_rules.names(),
            risk_assets = app.risk.assets.len(),
            "Guard components configured"
        );

        let risk_adapter = Arc::new(StaticRiskAdapter::new(app.risk.assets.clone()));

        Ok(Self::new(config)?
            .with_risk_adapter(risk_adapter)
            .with_chain_registry(registry))
    }

    /// Attach the risk oracle
    pub fn with_risk_adapter(mut self, adapter: Arc<dyn RiskAdapter>) -> Self {
        self.orchestrator = Orchestrator::new(Some(adapter));
        self
    }

    /// Attach chain adapters used by the unified path
    pub fn with_chain_registry(mut self, registry: ChainAdapterRegistry) -> Self {
        self.chains = registry;
        self
    }

    /// Record Prometheus metrics for every validation
    pub fn with_metrics(self, metrics: Arc<MetricsState>) -> Self {
        metrics
            .emergency_stop
            .set(i64::from(self.config.read().emergency_stop));
        Self {
            metrics: Some(metrics),
            ..self
        }
    }

    fn snapshot(&self) -> Arc<GuardConfig> {
        self.config.read().clone()
    }

    /// Validate a legacy (Solana-shaped) transaction
    pub async fn validate_transaction(&self, tx: &Transaction) -> ValidationResult {
        let started = Instant::now();
        let config = self.snapshot();

        let result = self.orchestrator.validate_legacy(tx, &config).await;

        self.record("legacy", &result, started);
        result
    }

    /// Validate a multi-chain transaction
    pub async fn validate_unified_transaction(&self, tx: &UnifiedTransaction) -> ValidationResult {
        let started = Instant::now();
        let config = self.snapshot();

        let result = if config.emergency_stop {
            tracing::warn!(tx_id = %tx.id, chain = %tx.chain, "Emergency stop active, rejecting transaction");
            Orchestrator::emergency_stop_result()
        } else {
            match self.chains.get(tx.chain) {
                Some(adapter) => {
                    let verdict = adapter.validate_transaction(tx).await;
                    if verdict.is_valid {
                        let avg_fee = match adapter.average_priority_fee().await {
                            Some(fee) => Some(fee),
                            None => config.network_average_priority_fee,
                        };
                        self.orchestrator.validate_unified(tx, &config, avg_fee).await
                    } else {
                        tracing::warn!(
                            tx_id = %tx.id,
                            chain = %tx.chain,
                            errors = ?verdict.errors,
                            "Chain adapter rejected transaction"
                        );
                        let warning = SecurityWarning::new(
                            PatternId::ChainValidation,
                            Severity::Critical,
                            format!("Chain validation failed: {}", verdict.errors.join("; ")),
                        );
                        policy::reject_structural(warning, config.mode)
                    }
                }
                None => {
                    self.orchestrator
                        .validate_unified(tx, &config, config.network_average_priority_fee)
                        .await
                }
            }
        };

        self.record("unified", &result, started);
        result
    }

    /// Boolean convenience check
    ///
    /// With no transaction this only reports whether the emergency stop is off.
    pub async fn validate(&self, tx: Option<&Transaction>) -> bool {
        match tx {
            Some(tx) => self.validate_transaction(tx).await.is_valid,
            None => !self.config.read().emergency_stop,
        }
    }

    /// Copy of the current config
    pub fn config(&self) -> GuardConfig {
        self.config.read().as_ref().clone()
    }

    /// Shallow-merge an update; the config is left untouched on error
    pub fn update_config(&self, update: GuardConfigUpdate) -> GuardResult<()> {
        let mut guard = self.config.write();
        let next = guard.merged(update);
        next.validate()?;

        tracing::info!(
            mode = %next.mode,
            risk_tolerance = %next.risk_tolerance,
            emergency_stop = next.emergency_stop,
            "Policy config updated"
        );

        if let Some(ref metrics) = self.metrics {
            metrics.emergency_stop.set(i64::from(next.emergency_stop));
        }
        *guard = Arc::new(next);
        Ok(())
    }

    /// Halt all transactions
    pub fn activate_emergency_stop(&self) {
        self.set_emergency_stop(true);
        tracing::warn!("Emergency stop ACTIVATED");
    }

    /// Resume normal validation
    pub fn deactivate_emergency_stop(&self) {
        self.set_emergency_stop(false);
        tracing::info!("Emergency stop deactivated");
    }

    fn set_emergency_stop(&self, active: bool) {
        let mut guard = self.config.write();
        let mut next = guard.as_ref().clone();
        next.emergency_stop = active;
        *guard = Arc::new(next);

        if let Some(ref metrics) = self.metrics {
            metrics.emergency_stop.set(i64::from(active));
        }
    }

    pub fn has_risk_adapter(&self) -> bool {
        self.orchestrator.has_risk_adapter()
    }

    /// Chains with a registered adapter
    pub fn registered_chains(&self) -> Vec<Chain> {
        let mut chains = self.chains.chains();
        chains.sort_by_key(|c| c.to_string());
        chains
    }

    pub fn is_emergency_stopped(&self) -> bool {
        self.config.read().emergency_stop
    }

    /// All warnings recorded since the last clear, oldest first
    pub fn warning_history(&self) -> Vec<SecurityWarning> {
        self.history.lock().clone()
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().len()
    }

    pub fn clear_warning_history(&self) {
        self.history.lock().clear();
        if let Some(ref metrics) = self.metrics {
            metrics.history_size.set(0);
        }
    }

    /// `actual <= max_slippage`; always true when no ceiling is set
    pub fn is_slippage_acceptable(&self, actual: f64) -> bool {
        match self.config.read().max_slippage {
            Some(max) => actual <= max,
            None => true,
        }
    }

    fn record(&self, path: &str, result: &ValidationResult, started: Instant) {
        let size = {
            let mut history = self.history.lock();
            history.extend(result.warnings.iter().cloned());
            history.len()
        };

        if let Some(ref metrics) = self.metrics {
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
            metrics.record_validation(path, result, elapsed_ms);
            metrics.history_size.set(size as i64);
        }
    }
}
