//! Blocking decision
//!
//! Maps (pattern, severity, tolerance) to block/allow and folds a warning
//! list into a `ValidationResult`.

use crate::config::{EnforcementMode, RiskTolerance};
use crate::models::{PatternId, SecurityWarning, Severity, ValidationResult};

/// Whether a single finding blocks under the given tolerance
///
/// | tolerance  | Critical                 | below Critical |
/// |------------|--------------------------|----------------|
/// | strict     | block                    | allow          |
/// | moderate   | block                    | allow          |
/// | permissive | MintKill/FreezeKill only | allow          |
pub fn should_block_pattern(
    pattern: PatternId,
    severity: Severity,
    tolerance: RiskTolerance,
) -> bool {
    if !severity.is_critical() {
        return false;
    }

    match tolerance {
        RiskTolerance::Strict | RiskTolerance::Moderate => true,
        RiskTolerance::Permissive => {
            matches!(pattern, PatternId::MintKill | PatternId::FreezeKill)
        }
    }
}

/// Fold collected warnings into a result
///
/// `warn` never blocks. `block` and `monitor` share the same matrix.
pub fn decide(
    warnings: Vec<SecurityWarning>,
    mode: EnforcementMode,
    tolerance: RiskTolerance,
) -> ValidationResult {
    let blocked_by = match mode {
        EnforcementMode::Warn => Vec::new(),
        EnforcementMode::Block | EnforcementMode::Monitor => warnings
            .iter()
            .filter(|w| should_block_pattern(w.pattern_id(), w.severity(), tolerance))
            .map(|w| w.pattern_id())
            .collect(),
    };

    ValidationResult::from_decision(warnings, blocked_by)
}

/// Result for a transaction the chain adapter rejected as malformed
///
/// Blocks under every tolerance; only `warn` mode lets it through.
pub fn reject_structural(warning: SecurityWarning, mode: EnforcementMode) -> ValidationResult {
    let blocked_by = match mode {
        EnforcementMode::Warn => Vec::new(),
        EnforcementMode::Block | EnforcementMode::Monitor => vec![warning.pattern_id()],
    };

    ValidationResult::from_decision(vec![warning], blocked_by)
}
