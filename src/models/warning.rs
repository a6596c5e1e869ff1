//! Security warning models - the stable result surface of the engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ordinal threat level
///
/// Declaration order drives `Ord`: `Warning < Alert < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Suspicious but usually benign
    Warning,
    /// Needs operator attention
    Alert,
    /// Likely destructive or malicious
    Critical,
}

impl Severity {
    /// Check if this severity is Critical
    pub fn is_critical(&self) -> bool {
        matches!(self, Severity::Critical)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "WARNING"),
            Severity::Alert => write!(f, "ALERT"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Threat categories
///
/// Detector patterns carry the `P-1xx` (Solana) and `EVM-0xx` codes.
/// Engine-level findings use dedicated `GRD-xxx` codes so consumers can
/// route on them without confusing them with signer mismatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternId {
    MintKill,
    FreezeKill,
    SignerMismatch,
    DangerousClose,
    HookReentrancy,
    ExcessiveHookAccounts,
    MaliciousTransferHook,
    UnexpectedHookExecution,
    ReentrancyAttack,
    FlashLoanAttack,
    FrontRunning,
    UnauthorizedAccess,
    /// Global halt raised by the emergency stop
    EmergencyStop,
    /// Risk oracle threshold breach
    RiskThreshold,
    /// Risk oracle could not be queried
    RiskAssessmentFailure,
    /// Privacy requested without compression
    PrivacyCompliance,
    /// A custom rule rejected the transaction
    CustomRuleViolation,
    /// A custom rule failed to evaluate
    CustomRuleError,
    /// The chain adapter rejected the transaction structure
    ChainValidation,
}

impl PatternId {
    /// Every pattern, in code order
    pub const ALL: [PatternId; 19] = [
        PatternId::MintKill,
        PatternId::FreezeKill,
        PatternId::SignerMismatch,
        PatternId::DangerousClose,
        PatternId::HookReentrancy,
        PatternId::ExcessiveHookAccounts,
        PatternId::MaliciousTransferHook,
        PatternId::UnexpectedHookExecution,
        PatternId::ReentrancyAttack,
        PatternId::FlashLoanAttack,
        PatternId::FrontRunning,
        PatternId::UnauthorizedAccess,
        PatternId::EmergencyStop,
        PatternId::RiskThreshold,
        PatternId::RiskAssessmentFailure,
        PatternId::PrivacyCompliance,
        PatternId::CustomRuleViolation,
        PatternId::CustomRuleError,
        PatternId::ChainValidation,
    ];

    /// Short cross-system reference code
    pub fn code(&self) -> &'static str {
        match self {
            PatternId::MintKill => "P-101",
            PatternId::FreezeKill => "P-102",
            PatternId::SignerMismatch => "P-103",
            PatternId::DangerousClose => "P-104",
            PatternId::HookReentrancy => "P-105",
            PatternId::ExcessiveHookAccounts => "P-106",
            PatternId::MaliciousTransferHook => "P-107",
            PatternId::UnexpectedHookExecution => "P-108",
            PatternId::ReentrancyAttack => "EVM-001",
            PatternId::FlashLoanAttack => "EVM-002",
            PatternId::FrontRunning => "EVM-003",
            PatternId::UnauthorizedAccess => "EVM-004",
            PatternId::EmergencyStop => "GRD-001",
            PatternId::RiskThreshold => "GRD-101",
            PatternId::RiskAssessmentFailure => "GRD-102",
            PatternId::PrivacyCompliance => "GRD-201",
            PatternId::CustomRuleViolation => "GRD-301",
            PatternId::CustomRuleError => "GRD-302",
            PatternId::ChainValidation => "GRD-401",
        }
    }

    /// Human-readable name
    pub fn title(&self) -> &'static str {
        match self {
            PatternId::MintKill => "Mint Authority Kill",
            PatternId::FreezeKill => "Freeze Authority Kill",
            PatternId::SignerMismatch => "Signer Mismatch",
            PatternId::DangerousClose => "Dangerous Account Close",
            PatternId::HookReentrancy => "Transfer Hook Reentrancy",
            PatternId::ExcessiveHookAccounts => "Excessive Hook Accounts",
            PatternId::MaliciousTransferHook => "Malicious Transfer Hook",
            PatternId::UnexpectedHookExecution => "Unexpected Hook Execution",
            PatternId::ReentrancyAttack => "Reentrancy Attack",
            PatternId::FlashLoanAttack => "Flash Loan Attack",
            PatternId::FrontRunning => "Front-Running",
            PatternId::UnauthorizedAccess => "Unauthorized Access",
            PatternId::EmergencyStop => "Emergency Stop",
            PatternId::RiskThreshold => "Risk Threshold Breach",
            PatternId::RiskAssessmentFailure => "Risk Assessment Failure",
            PatternId::PrivacyCompliance => "Privacy Compliance",
            PatternId::CustomRuleViolation => "Custom Rule Violation",
            PatternId::CustomRuleError => "Custom Rule Error",
            PatternId::ChainValidation => "Chain Validation Failure",
        }
    }

    /// Look up a pattern by its short code
    pub fn from_code(code: &str) -> Option<PatternId> {
        PatternId::ALL.iter().copied().find(|p| p.code() == code)
    }
}

impl std::fmt::Display for PatternId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A single finding produced by one detector or check
///
/// Fields are private; a warning never changes after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityWarning {
    pattern_id: PatternId,
    severity: Severity,
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    affected_account: Option<String>,
    timestamp: DateTime<Utc>,
}

impl SecurityWarning {
    /// Create a warning stamped with the current time
    pub fn new(pattern_id: PatternId, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            pattern_id,
            severity,
            message: message.into(),
            affected_account: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach the account the finding is about
    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.affected_account = Some(account.into());
        self
    }

    /// Attach an account only when one is known
    pub fn with_optional_account(mut self, account: Option<String>) -> Self {
        self.affected_account = account;
        self
    }

    pub fn pattern_id(&self) -> PatternId {
        self.pattern_id
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn affected_account(&self) -> Option<&str> {
        self.affected_account.as_deref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Format the warning for terminal output
    pub fn format_terminal(&self) -> String {
        let icon = match self.severity {
            Severity::Critical => "🚨",
            Severity::Alert | Severity::Warning => "⚠️ ",
        };

        let mut output = format!(
            "{} {}: {} ({})\n",
            icon,
            self.severity,
            self.pattern_id.title(),
            self.pattern_id.code()
        );
        output.push_str(&format!("  {}\n", self.message));
        if let Some(ref account) = self.affected_account {
            output.push_str(&format!("  Affected Account: {}\n", account));
        }

        output
    }
}

/// Outcome of one validation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub warnings: Vec<SecurityWarning>,
    #[serde(default)]
    pub blocked_by: Vec<PatternId>,
}

impl ValidationResult {
    /// Build a result from collected warnings and the blocked patterns
    ///
    /// `blocked_by` is deduplicated keeping first-seen order, and
    /// `is_valid` is derived from it.
    pub fn from_decision(warnings: Vec<SecurityWarning>, blocked_by: Vec<PatternId>) -> Self {
        let mut distinct: Vec<PatternId> = Vec::with_capacity(blocked_by.len());
        for pattern in blocked_by {
            if !distinct.contains(&pattern) {
                distinct.push(pattern);
            }
        }

        Self {
            is_valid: distinct.is_empty(),
            warnings,
            blocked_by: distinct,
        }
    }

    /// Check whether the given pattern blocked this transaction
    pub fn is_blocked_by(&self, pattern: PatternId) -> bool {
        self.blocked_by.contains(&pattern)
    }

    /// Highest severity among the warnings
    pub fn max_severity(&self) -> Option<Severity> {
        self.warnings.iter().map(|w| w.severity()).max()
    }
}
