//! Solana Detector Tests
//!
//! Tests SPL token and transfer hook detection:
//! - SetAuthority decoding (mint kill, freeze kill, signer mismatch)
//! - CloseAccount
//! - Hook heuristics (excessive accounts, drainer hooks, reentrancy)
//! - Malformed instruction data

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::collections::HashSet;
use tx_guard::constants::programs;
use tx_guard::detector::{SolanaDetector, SolanaDetectorConfig};
use tx_guard::models::{AccountMeta, Instruction, PatternId, Severity};

const MINT: &str = "So11111111111111111111111111111111111111112";
const UNKNOWN_PROGRAM: &str = "Hook111111111111111111111111111111111111111";

fn key(pubkey: &str, is_signer: bool, is_writable: bool) -> AccountMeta {
    AccountMeta {
        pubkey: pubkey.to_string(),
        is_signer,
        is_writable,
    }
}

fn token_ix(data: &[u8]) -> Instruction {
    Instruction {
        program_id: programs::TOKEN.to_string(),
        data: STANDARD.encode(data),
        keys: vec![key(MINT, false, true)],
    }
}

fn program_ix(program: &str, accounts: usize, writable: usize) -> Instruction {
    Instruction {
        program_id: program.to_string(),
        data: String::new(),
        keys: (0..accounts)
            .map(|i| key(&format!("Acct{}", i), false, i < writable))
            .collect(),
    }
}

fn set_authority_data(authority_type: u8, new_authority: Option<[u8; 32]>) -> Vec<u8> {
    let mut data = vec![6, authority_type];
    match new_authority {
        Some(bytes) => {
            data.push(1);
            data.extend_from_slice(&bytes);
        }
        None => data.push(0),
    }
    data
}

fn analyze(instructions: &[Instruction]) -> Vec<tx_guard::SecurityWarning> {
    SolanaDetector::analyze(
        instructions,
        &HashSet::new(),
        &SolanaDetectorConfig::default(),
    )
}

// =============================================================================
// TOKEN INSTRUCTION TESTS
// =============================================================================

#[test]
fn test_mint_authority_removed_is_critical() {
    let warnings = analyze(&[token_ix(&set_authority_data(0, None))]);

    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].pattern_id(), PatternId::MintKill);
    assert_eq!(warnings[0].severity(), Severity::Critical);
    assert_eq!(warnings[0].affected_account(), Some(MINT));
}

#[test]
fn test_freeze_authority_removed_is_critical() {
    let warnings = analyze(&[token_ix(&set_authority_data(1, None))]);

    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].pattern_id(), PatternId::FreezeKill);
    assert_eq!(warnings[0].severity(), Severity::Critical);
}

#[test]
fn test_authority_to_non_signer_is_mismatch() {
    let new_authority = [7u8; 32];
    let warnings = analyze(&[token_ix(&set_authority_data(0, Some(new_authority)))]);

    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].pattern_id(), PatternId::SignerMismatch);
    assert_eq!(warnings[0].severity(), Severity::Warning);
}

#[test]
fn test_authority_to_current_signer_is_clean() {
    let new_authority = [7u8; 32];
    let signer = solana_sdk::pubkey::Pubkey::new_from_array(new_authority).to_string();
    let signers: HashSet<String> = [signer].into_iter().collect();

    let warnings = SolanaDetector::analyze(
        &[token_ix(&set_authority_data(1, Some(new_authority)))],
        &signers,
        &SolanaDetectorConfig::default(),
    );
    assert!(warnings.is_empty());
}

#[test]
fn test_close_account_is_alert() {
    let warnings = analyze(&[token_ix(&[9])]);

    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].pattern_id(), PatternId::DangerousClose);
    assert_eq!(warnings[0].severity(), Severity::Alert);
}

#[test]
fn test_token_2022_is_inspected() {
    let mut ix = token_ix(&set_authority_data(0, None));
    ix.program_id = programs::TOKEN_2022.to_string();

    let warnings = analyze(&[ix]);
    assert_eq!(warnings[0].pattern_id(), PatternId::MintKill);
}

// =============================================================================
// MALFORMED DATA TESTS
// =============================================================================

#[test]
fn test_invalid_base64_is_skipped() {
    let ix = Instruction {
        program_id: programs::TOKEN.to_string(),
        data: "%%%".to_string(),
        keys: vec![],
    };
    assert!(analyze(&[ix]).is_empty());
}

#[test]
fn test_truncated_set_authority_is_skipped() {
    // has_new_authority set but the key is missing
    assert!(analyze(&[token_ix(&[6, 0, 1, 1, 2])]).is_empty());
    assert!(analyze(&[token_ix(&[6])]).is_empty());
}

#[test]
fn test_transfer_produces_nothing() {
    assert!(analyze(&[token_ix(&[3, 1, 0, 0, 0, 0, 0, 0, 0])]).is_empty());
}

// =============================================================================
// TRANSFER HOOK TESTS
// =============================================================================

#[test]
fn test_excessive_hook_accounts() {
    let warnings = analyze(&[
        token_ix(&[3, 1, 0, 0, 0, 0, 0, 0, 0]),
        program_ix(UNKNOWN_PROGRAM, 21, 0),
    ]);

    assert!(warnings
        .iter()
        .any(|w| w.pattern_id() == PatternId::ExcessiveHookAccounts));
}

#[test]
fn test_drainer_hook_is_critical() {
    let warnings = analyze(&[
        token_ix(&[3, 1, 0, 0, 0, 0, 0, 0, 0]),
        program_ix(UNKNOWN_PROGRAM, 16, 11),
    ]);

    let malicious: Vec<_> = warnings
        .iter()
        .filter(|w| w.pattern_id() == PatternId::MaliciousTransferHook)
        .collect();
    assert_eq!(malicious.len(), 1);
    assert_eq!(malicious[0].severity(), Severity::Critical);
    assert_eq!(malicious[0].affected_account(), Some(UNKNOWN_PROGRAM));
}

#[test]
fn test_hook_without_transfer_is_unexpected() {
    let warnings = analyze(&[program_ix(UNKNOWN_PROGRAM, 11, 0)]);

    assert!(warnings
        .iter()
        .any(|w| w.pattern_id() == PatternId::UnexpectedHookExecution
            && w.severity() == Severity::Alert));
}

#[test]
fn test_sandwiched_program_flags_reentrancy() {
    let transfer = token_ix(&[3, 1, 0, 0, 0, 0, 0, 0, 0]);
    let warnings = analyze(&[
        transfer.clone(),
        program_ix(UNKNOWN_PROGRAM, 2, 0),
        transfer,
    ]);

    assert!(warnings
        .iter()
        .any(|w| w.pattern_id() == PatternId::HookReentrancy));
}

#[test]
fn test_repeated_invocations_flag_reentrancy_once() {
    let instructions: Vec<Instruction> = (0..7).map(|_| program_ix(UNKNOWN_PROGRAM, 1, 0)).collect();
    let warnings = analyze(&instructions);

    let reentrancy = warnings
        .iter()
        .filter(|w| w.pattern_id() == PatternId::HookReentrancy)
        .count();
    assert_eq!(reentrancy, 1);
}

#[test]
fn test_six_invocations_are_tolerated() {
    let instructions: Vec<Instruction> = (0..6).map(|_| program_ix(UNKNOWN_PROGRAM, 1, 0)).collect();
    assert!(analyze(&instructions).is_empty());
}

#[test]
fn test_allow_listed_hook_is_skipped() {
    let config = SolanaDetectorConfig {
        allowed_hook_programs: [UNKNOWN_PROGRAM.to_string()].into_iter().collect(),
        ..Default::default()
    };
    let warnings = SolanaDetector::analyze(
        &[program_ix(UNKNOWN_PROGRAM, 30, 20)],
        &HashSet::new(),
        &config,
    );
    assert!(warnings.is_empty());
}

#[test]
fn test_builtin_programs_are_trusted() {
    assert!(analyze(&[program_ix(programs::MEMO, 30, 20)]).is_empty());
    assert!(analyze(&[program_ix(programs::JUPITER, 30, 20)]).is_empty());
}

#[test]
fn test_hook_checks_can_be_disabled() {
    let config = SolanaDetectorConfig {
        validate_transfer_hooks: false,
        ..Default::default()
    };
    let warnings = SolanaDetector::analyze(
        &[program_ix(UNKNOWN_PROGRAM, 30, 20)],
        &HashSet::new(),
        &config,
    );
    assert!(warnings.is_empty());
}
