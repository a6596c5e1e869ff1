//! Risk/compliance oracle contract
//!
//! The oracle itself lives outside this crate; the engine only consumes the
//! batch lookup below.

use crate::config::PulsarConfig;
use crate::error::{GuardError, GuardResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Compliance verdict reported by the oracle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Compliant,
    NonCompliant,
    Pending,
    Unknown,
}

/// Risk metrics for one asset address
///
/// Wire format is camelCase; snake_case keys are accepted for YAML tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskMetrics {
    /// Aggregate risk in [0, 1]
    #[serde(default, alias = "risk_score")]
    pub risk_score: Option<f64>,
    #[serde(default, alias = "compliance_status")]
    pub compliance_status: Option<ComplianceStatus>,
    /// Counterparty risk in [0, 1]
    #[serde(default, alias = "counterparty_risk")]
    pub counterparty_risk: Option<f64>,
    /// Oracle integrity in [0, 1]; low means the price feed is suspect
    #[serde(default, alias = "oracle_integrity")]
    pub oracle_integrity: Option<f64>,
}

/// Batch risk lookup keyed by asset address
#[async_trait]
pub trait RiskAdapter: Send + Sync {
    /// Fetch metrics for every address the oracle knows about
    ///
    /// Addresses the oracle has no data for are simply absent from the map.
    async fn get_batch_risk_metrics(
        &self,
        addresses: &[String],
        config: &PulsarConfig,
    ) -> GuardResult<HashMap<String, RiskMetrics>>;
}

/// In-memory risk table
///
/// Used by the bundled binaries and tests; it can also be put into failure
/// mode to exercise the fallback path.
#[derive(Default)]
pub struct StaticRiskAdapter {
    metrics: RwLock<HashMap<String, RiskMetrics>>,
    failure: RwLock<Option<String>>,
}

impl StaticRiskAdapter {
    pub fn new(metrics: HashMap<String, RiskMetrics>) -> Self {
        Self {
            metrics: RwLock::new(metrics),
            failure: RwLock::new(None),
        }
    }

    /// Insert or replace the metrics for one address
    pub fn set_metrics(&self, address: impl Into<String>, metrics: RiskMetrics) {
        self.metrics.write().insert(address.into(), metrics);
    }

    /// Make every subsequent lookup fail with `reason`
    pub fn fail_with(&self, reason: impl Into<String>) {
        *self.failure.write() = Some(reason.into());
    }

    /// Clear a previously injected failure
    pub fn recover(&self) {
        *self.failure.write() = None;
    }
}

#[async_trait]
impl RiskAdapter for StaticRiskAdapter {
    async fn get_batch_risk_metrics(
        &self,
        addresses: &[String],
        _config: &PulsarConfig,
    ) -> GuardResult<HashMap<String, RiskMetrics>> {
        if let Some(reason) = self.failure.read().clone() {
            return Err(GuardError::RiskAdapter(reason));
        }

        let table = self.metrics.read();
        Ok(addresses
            .iter()
            .filter_map(|addr| table.get(addr).map(|m| (addr.clone(), m.clone())))
            .collect())
    }
}
