//! Configuration management for the transaction guard
//!
//! Two layers:
//! - `GuardConfig`: the policy state owned by the facade (mode, tolerance,
//!   emergency stop, thresholds), updated at runtime via partial merges.
//! - `AppConfig`: service settings loaded from YAML files and environment
//!   variables. Environment variables override YAML values.

use crate::adapters::RiskMetrics;
use crate::detector::SolanaDetectorConfig;
use crate::error::{GuardError, GuardResult};
use crate::models::Chain;
use crate::rules::{CustomRules, RuleSpec};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

// =============================================================================
// POLICY CONFIG
// =============================================================================

/// Which severities trigger blocking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTolerance {
    Strict,
    #[default]
    Moderate,
    Permissive,
}

impl std::fmt::Display for RiskTolerance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskTolerance::Strict => write!(f, "strict"),
            RiskTolerance::Moderate => write!(f, "moderate"),
            RiskTolerance::Permissive => write!(f, "permissive"),
        }
    }
}

impl std::str::FromStr for RiskTolerance {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(RiskTolerance::Strict),
            "moderate" => Ok(RiskTolerance::Moderate),
            "permissive" => Ok(RiskTolerance::Permissive),
            _ => Err(GuardError::InvalidConfig(format!("Unknown risk tolerance: {}", s))),
        }
    }
}

/// Enforcement mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnforcementMode {
    /// Reject blocked transactions
    #[default]
    Block,
    /// Report only, never reject
    Warn,
    /// Same decision as block, findings logged at debug level only
    Monitor,
}

impl std::fmt::Display for EnforcementMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnforcementMode::Block => write!(f, "block"),
            EnforcementMode::Warn => write!(f, "warn"),
            EnforcementMode::Monitor => write!(f, "monitor"),
        }
    }
}

impl std::str::FromStr for EnforcementMode {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "block" => Ok(EnforcementMode::Block),
            "warn" => Ok(EnforcementMode::Warn),
            "monitor" => Ok(EnforcementMode::Monitor),
            _ => Err(GuardError::InvalidConfig(format!("Unknown enforcement mode: {}", s))),
        }
    }
}

/// Risk oracle settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulsarConfig {
    /// Query the oracle at all
    #[serde(default)]
    pub enabled: bool,
    /// Risk score above which an asset is flagged
    #[serde(default = "default_risk_threshold")]
    pub risk_threshold: f64,
    #[serde(default = "default_true")]
    pub enable_compliance_check: bool,
    #[serde(default = "default_true")]
    pub enable_counterparty_check: bool,
    #[serde(default = "default_true")]
    pub enable_oracle_check: bool,
    /// Swallow oracle failures instead of warning
    #[serde(default)]
    pub fallback_on_error: bool,
    /// Time budget for one batch lookup
    #[serde(default = "default_pulsar_timeout")]
    pub timeout_ms: u64,
}

fn default_risk_threshold() -> f64 {
    0.7
}

fn default_pulsar_timeout() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}

impl Default for PulsarConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            risk_threshold: default_risk_threshold(),
            enable_compliance_check: true,
            enable_counterparty_check: true,
            enable_oracle_check: true,
            fallback_on_error: false,
            timeout_ms: default_pulsar_timeout(),
        }
    }
}

/// Policy state owned by the facade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Slippage ceiling for `is_slippage_acceptable` (fraction, 0.1 = 10%)
    #[serde(default)]
    pub max_slippage: Option<f64>,
    #[serde(default)]
    pub risk_tolerance: RiskTolerance,
    #[serde(default)]
    pub mode: EnforcementMode,
    #[serde(default = "default_true")]
    pub enable_pattern_detection: bool,
    /// Hard kill-switch
    #[serde(default)]
    pub emergency_stop: bool,
    /// Runtime rules; not serializable
    #[serde(skip)]
    pub custom_rules: CustomRules,
    #[serde(default)]
    pub pulsar: Option<PulsarConfig>,
    #[serde(default = "default_true")]
    pub validate_transfer_hooks: bool,
    #[serde(default = "default_max_hook_accounts")]
    pub max_hook_accounts: usize,
    #[serde(default)]
    pub allowed_hook_programs: Vec<String>,
    /// Fallback network-average priority fee (wei) when no chain adapter reports one
    #[serde(default)]
    pub network_average_priority_fee: Option<u128>,
}

fn default_max_hook_accounts() -> usize {
    20
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            max_slippage: None,
            risk_tolerance: RiskTolerance::default(),
            mode: EnforcementMode::default(),
            enable_pattern_detection: true,
            emergency_stop: false,
            custom_rules: CustomRules::default(),
            pulsar: None,
            validate_transfer_hooks: true,
            max_hook_accounts: default_max_hook_accounts(),
            allowed_hook_programs: Vec::new(),
            network_average_priority_fee: None,
        }
    }
}

impl GuardConfig {
    /// Validate configuration values
    pub fn validate(&self) -> GuardResult<()> {
        if let Some(slippage) = self.max_slippage {
            if !slippage.is_finite() || !(0.0..=1.0).contains(&slippage) {
                return Err(GuardError::InvalidConfig(format!(
                    "max_slippage must be within [0, 1], got {}",
                    slippage
                )));
            }
        }

        if self.max_hook_accounts == 0 {
            return Err(GuardError::InvalidConfig(
                "max_hook_accounts must be greater than 0".to_string(),
            ));
        }

        if let Some(ref pulsar) = self.pulsar {
            if !pulsar.risk_threshold.is_finite() || !(0.0..=1.0).contains(&pulsar.risk_threshold)
            {
                return Err(GuardError::InvalidConfig(format!(
                    "pulsar.risk_threshold must be within [0, 1], got {}",
                    pulsar.risk_threshold
                )));
            }
            if pulsar.timeout_ms == 0 {
                return Err(GuardError::InvalidConfig(
                    "pulsar.timeout_ms must be greater than 0".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Oracle settings when the oracle is switched on
    pub fn active_pulsar(&self) -> Option<&PulsarConfig> {
        self.pulsar.as_ref().filter(|p| p.enabled)
    }

    /// Settings for the Solana detector
    pub fn solana_detector_config(&self) -> SolanaDetectorConfig {
        SolanaDetectorConfig {
            validate_transfer_hooks: self.validate_transfer_hooks,
            max_hook_accounts: self.max_hook_accounts,
            allowed_hook_programs: self.allowed_hook_programs.iter().cloned().collect(),
        }
    }

    /// Shallow merge: every field present in `update` replaces the current one
    pub fn merged(&self, update: GuardConfigUpdate) -> GuardConfig {
        let mut next = self.clone();
        if let Some(v) = update.max_slippage {
            next.max_slippage = Some(v);
        }
        if let Some(v) = update.risk_tolerance {
            next.risk_tolerance = v;
        }
        if let Some(v) = update.mode {
            next.mode = v;
        }
        if let Some(v) = update.enable_pattern_detection {
            next.enable_pattern_detection = v;
        }
        if let Some(v) = update.emergency_stop {
            next.emergency_stop = v;
        }
        if let Some(v) = update.custom_rules {
            next.custom_rules = v;
        }
        if let Some(v) = update.pulsar {
            next.pulsar = Some(v);
        }
        if let Some(v) = update.validate_transfer_hooks {
            next.validate_transfer_hooks = v;
        }
        if let Some(v) = update.max_hook_accounts {
            next.max_hook_accounts = v;
        }
        if let Some(v) = update.allowed_hook_programs {
            next.allowed_hook_programs = v;
        }
        if let Some(v) = update.network_average_priority_fee {
            next.network_average_priority_fee = Some(v);
        }
        next
    }
}

/// Partial update for `GuardConfig`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GuardConfigUpdate {
    #[serde(default)]
    pub max_slippage: Option<f64>,
    #[serde(default)]
    pub risk_tolerance: Option<RiskTolerance>,
    #[serde(default)]
    pub mode: Option<EnforcementMode>,
    #[serde(default)]
    pub enable_pattern_detection: Option<bool>,
    #[serde(default)]
    pub emergency_stop: Option<bool>,
    #[serde(skip)]
    pub custom_rules: Option<CustomRules>,
    #[serde(default)]
    pub pulsar: Option<PulsarConfig>,
    #[serde(default)]
    pub validate_transfer_hooks: Option<bool>,
    #[serde(default)]
    pub max_hook_accounts: Option<usize>,
    #[serde(default)]
    pub allowed_hook_programs: Option<Vec<String>>,
    #[serde(default)]
    pub network_average_priority_fee: Option<u128>,
}

// =============================================================================
// SERVICE CONFIG
// =============================================================================

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Security settings
    #[serde(default)]
    pub security: SecurityConfig,
    /// Policy config
    #[serde(default)]
    pub guard: GuardConfig,
    /// Declarative custom rules
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
    /// Static risk table for the bundled risk adapter
    #[serde(default)]
    pub risk: RiskTableConfig,
    /// Chain adapter registration
    #[serde(default)]
    pub chains: ChainsConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Security configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// API keys for the policy endpoints
    #[serde(default)]
    pub api_keys: Vec<ApiKeyConfig>,
    /// Allow unauthenticated readonly access
    #[serde(default)]
    pub allow_anonymous_readonly: bool,
    /// Rate limit: max requests per second
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_second: u32,
    /// Rate limit: burst size
    #[serde(default = "default_burst")]
    pub burst_size: u32,
}

/// API key configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeyConfig {
    /// The API key value
    pub key: String,
    /// The role: admin, operator, readonly
    pub role: String,
}

fn default_rate_limit() -> u32 {
    100
}

fn default_burst() -> u32 {
    150
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            allow_anonymous_readonly: false,
            rate_limit_per_second: default_rate_limit(),
            burst_size: default_burst(),
        }
    }
}

/// Static risk table
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RiskTableConfig {
    /// Metrics keyed by asset address
    #[serde(default)]
    pub assets: HashMap<String, RiskMetrics>,
}

/// Chain adapter registration
#[derive(Debug, Clone, Deserialize)]
pub struct ChainsConfig {
    /// Chains that get a structural adapter; empty disables structural checks
    #[serde(default = "default_chains")]
    pub structural: Vec<Chain>,
}

fn default_chains() -> Vec<Chain> {
    vec![
        Chain::Solana,
        Chain::Ethereum,
        Chain::Polygon,
        Chain::Arbitrum,
        Chain::Optimism,
        Chain::Base,
        Chain::Bsc,
        Chain::Avalanche,
    ]
}

impl Default for ChainsConfig {
    fn default() -> Self {
        Self {
            structural: default_chains(),
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (TXGUARD_*)
    /// 2. config/config.yaml (if exists)
    /// 3. config.yaml (if exists)
    /// 4. Default values
    pub fn load() -> Result<Self, ConfigError> {
        let builder = Self::defaults()?
            .add_source(File::with_name("config").required(false))
            .add_source(File::with_name("config/config").required(false));

        Self::finish(builder)
    }

    /// Load from an explicit file, still honoring environment overrides
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let builder = Self::defaults()?.add_source(File::from(path).required(true));
        Self::finish(builder)
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("guard.mode", "block")?
            .set_default("guard.risk_tolerance", "moderate")
    }

    fn finish(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        // TXGUARD_GUARD__MODE=warn -> guard.mode = "warn"
        builder
            .add_source(
                Environment::with_prefix("TXGUARD")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(","),
            )
            .build()?
            .try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> GuardResult<()> {
        self.guard.validate()?;

        for api_key in &self.security.api_keys {
            if api_key.key.is_empty() {
                return Err(GuardError::InvalidConfig("API key must not be empty".to_string()));
            }
            if api_key.role.parse::<crate::middleware::Role>().is_err() {
                return Err(GuardError::InvalidConfig(format!(
                    "Unknown role for API key: {}",
                    api_key.role
                )));
            }
        }

        if self.security.rate_limit_per_second == 0 {
            return Err(GuardError::InvalidConfig(
                "rate_limit_per_second must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
