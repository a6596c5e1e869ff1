//! Blocking Policy Tests
//!
//! Tests the (pattern, severity, tolerance) matrix across every pattern and
//! the mode handling in `decide`.

use tx_guard::config::{EnforcementMode, RiskTolerance};
use tx_guard::engine::{decide, should_block_pattern};
use tx_guard::models::{PatternId, SecurityWarning, Severity};

const SEVERITIES: [Severity; 3] = [Severity::Warning, Severity::Alert, Severity::Critical];
const TOLERANCES: [RiskTolerance; 3] = [
    RiskTolerance::Strict,
    RiskTolerance::Moderate,
    RiskTolerance::Permissive,
];

#[test]
fn test_non_critical_never_blocks() {
    for pattern in PatternId::ALL {
        for tolerance in TOLERANCES {
            assert!(!should_block_pattern(pattern, Severity::Warning, tolerance));
            assert!(!should_block_pattern(pattern, Severity::Alert, tolerance));
        }
    }
}

#[test]
fn test_every_critical_blocks_under_strict_and_moderate() {
    for pattern in PatternId::ALL {
        assert!(should_block_pattern(pattern, Severity::Critical, RiskTolerance::Strict));
        assert!(should_block_pattern(pattern, Severity::Critical, RiskTolerance::Moderate));
    }
}

#[test]
fn test_permissive_blocks_exactly_authority_kills() {
    let blocked: Vec<PatternId> = PatternId::ALL
        .into_iter()
        .filter(|p| should_block_pattern(*p, Severity::Critical, RiskTolerance::Permissive))
        .collect();
    assert_eq!(blocked, vec![PatternId::MintKill, PatternId::FreezeKill]);
}

#[test]
fn test_warn_mode_is_always_valid() {
    for tolerance in TOLERANCES {
        let warnings: Vec<SecurityWarning> = PatternId::ALL
            .into_iter()
            .flat_map(|p| SEVERITIES.map(|s| SecurityWarning::new(p, s, "x")))
            .collect();
        let total = warnings.len();

        let result = decide(warnings, EnforcementMode::Warn, tolerance);
        assert!(result.is_valid);
        assert!(result.blocked_by.is_empty());
        assert_eq!(result.warnings.len(), total);
    }
}

#[test]
fn test_is_valid_matches_blocked_by() {
    for mode in [EnforcementMode::Block, EnforcementMode::Monitor] {
        for tolerance in TOLERANCES {
            let result = decide(
                vec![
                    SecurityWarning::new(PatternId::DangerousClose, Severity::Alert, "close"),
                    SecurityWarning::new(PatternId::UnauthorizedAccess, Severity::Critical, "owner"),
                ],
                mode,
                tolerance,
            );
            assert_eq!(result.is_valid, result.blocked_by.is_empty());
        }
    }
}

#[test]
fn test_blocked_by_has_no_duplicates() {
    let warnings = vec![
        SecurityWarning::new(PatternId::RiskThreshold, Severity::Critical, "a"),
        SecurityWarning::new(PatternId::MintKill, Severity::Critical, "b"),
        SecurityWarning::new(PatternId::RiskThreshold, Severity::Critical, "c"),
        SecurityWarning::new(PatternId::MintKill, Severity::Critical, "d"),
    ];
    let result = decide(warnings, EnforcementMode::Block, RiskTolerance::Strict);

    assert_eq!(
        result.blocked_by,
        vec![PatternId::RiskThreshold, PatternId::MintKill]
    );
    assert_eq!(result.warnings.len(), 4);
}

#[test]
fn test_result_serializes_wire_shape() {
    let result = decide(
        vec![SecurityWarning::new(PatternId::MintKill, Severity::Critical, "kill").with_account("Mint1")],
        EnforcementMode::Block,
        RiskTolerance::Moderate,
    );
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["isValid"], false);
    assert_eq!(json["blockedBy"][0], "MintKill");
    assert_eq!(json["warnings"][0]["patternId"], "MintKill");
    assert_eq!(json["warnings"][0]["severity"], "critical");
    assert_eq!(json["warnings"][0]["affectedAccount"], "Mint1");
    assert!(json["warnings"][0]["timestamp"].is_string());
}
