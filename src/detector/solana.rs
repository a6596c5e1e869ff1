//! Solana instruction detector
//!
//! Flags dangerous SPL token operations and suspicious transfer hook
//! invocations:
//! - P-101 Mint Kill / P-102 Freeze Kill (authority removed for good)
//! - P-103 Signer Mismatch (authority handed to a non-signer)
//! - P-104 Dangerous Close
//! - P-105..P-108 transfer hook heuristics

use crate::constants::{self, token_instruction, BUILTIN_HOOK_PROGRAMS, KNOWN_PROGRAMS};
use crate::models::{Instruction, PatternId, SecurityWarning, Severity};
use solana_sdk::pubkey::Pubkey;
use std::collections::{HashMap, HashSet};

/// Max invocations of one unknown program before it is treated as reentrant
pub const MAX_PROGRAM_INVOCATIONS: usize = 6;

/// Writable accounts above which a hook looks like a drainer
const MALICIOUS_HOOK_WRITABLE: usize = 10;
/// Total accounts paired with the writable threshold
const MALICIOUS_HOOK_ACCOUNTS: usize = 15;
/// Accounts above which a hook running without a transfer is unexpected
const UNEXPECTED_HOOK_ACCOUNTS: usize = 10;

/// Detector settings derived from the policy config
#[derive(Debug, Clone)]
pub struct SolanaDetectorConfig {
    /// Run the transfer hook heuristics
    pub validate_transfer_hooks: bool,
    /// Account count above which a hook is flagged
    pub max_hook_accounts: usize,
    /// Extra programs trusted as hooks
    pub allowed_hook_programs: HashSet<String>,
}

impl Default for SolanaDetectorConfig {
    fn default() -> Self {
        Self {
            validate_transfer_hooks: true,
            max_hook_accounts: 20,
            allowed_hook_programs: HashSet::new(),
        }
    }
}

impl SolanaDetectorConfig {
    fn is_trusted(&self, program_id: &str) -> bool {
        KNOWN_PROGRAMS.contains(&program_id)
            || BUILTIN_HOOK_PROGRAMS.contains(&program_id)
            || self.allowed_hook_programs.contains(program_id)
    }
}

/// SPL authority kinds as encoded in `SetAuthority`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorityType {
    MintTokens,
    FreezeAccount,
    AccountOwner,
    CloseAccount,
    Other(u8),
}

impl From<u8> for AuthorityType {
    fn from(value: u8) -> Self {
        match value {
            0 => AuthorityType::MintTokens,
            1 => AuthorityType::FreezeAccount,
            2 => AuthorityType::AccountOwner,
            3 => AuthorityType::CloseAccount,
            other => AuthorityType::Other(other),
        }
    }
}

impl std::fmt::Display for AuthorityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthorityType::MintTokens => write!(f, "mint"),
            AuthorityType::FreezeAccount => write!(f, "freeze"),
            AuthorityType::AccountOwner => write!(f, "account owner"),
            AuthorityType::CloseAccount => write!(f, "close account"),
            AuthorityType::Other(t) => write!(f, "type {}", t),
        }
    }
}

/// Decoded `SetAuthority` payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetAuthority {
    pub authority_type: AuthorityType,
    pub new_authority: Option<String>,
}

impl SetAuthority {
    /// Decode `[6, authority_type, has_new_authority, pubkey(32)?]`
    ///
    /// Returns `None` for short or truncated payloads.
    pub fn decode(data: &[u8]) -> Option<Self> {
        if data.len() < 3 || data[0] != token_instruction::SET_AUTHORITY {
            return None;
        }

        let authority_type = AuthorityType::from(data[1]);
        let new_authority = if data[2] != 0 {
            let key = Pubkey::try_from(data.get(3..35)?).ok()?;
            Some(key.to_string())
        } else {
            None
        };

        Some(Self {
            authority_type,
            new_authority,
        })
    }
}

/// Stateless Solana instruction analyzer
pub struct SolanaDetector;

impl SolanaDetector {
    /// Analyze an ordered instruction list
    pub fn analyze(
        instructions: &[Instruction],
        signers: &HashSet<String>,
        config: &SolanaDetectorConfig,
    ) -> Vec<SecurityWarning> {
        let mut warnings = Vec::new();

        for ix in instructions {
            if constants::is_token_program(&ix.program_id) {
                warnings.extend(Self::analyze_token_instruction(ix, signers));
            }
        }

        if config.validate_transfer_hooks {
            warnings.extend(Self::analyze_transfer_hooks(instructions, config));
        }

        if !warnings.is_empty() {
            tracing::debug!(
                instruction_count = instructions.len(),
                warning_count = warnings.len(),
                "Solana detector produced warnings"
            );
        }

        warnings
    }

    fn analyze_token_instruction(
        ix: &Instruction,
        signers: &HashSet<String>,
    ) -> Vec<SecurityWarning> {
        let data = match ix.decode_data() {
            Some(data) if !data.is_empty() => data,
            _ => return Vec::new(),
        };
        let account = ix.keys.first().map(|k| k.pubkey.clone());

        match data[0] {
            token_instruction::SET_AUTHORITY => match SetAuthority::decode(&data) {
                Some(set_authority) => {
                    Self::analyze_set_authority(&set_authority, signers, account)
                }
                None => Vec::new(),
            },
            token_instruction::CLOSE_ACCOUNT => vec![SecurityWarning::new(
                PatternId::DangerousClose,
                Severity::Alert,
                "Closing account. Ensure the account has no remaining balance or tokens to avoid loss.",
            )
            .with_optional_account(account)],
            _ => Vec::new(),
        }
    }

    fn analyze_set_authority(
        set_authority: &SetAuthority,
        signers: &HashSet<String>,
        account: Option<String>,
    ) -> Vec<SecurityWarning> {
        match (set_authority.authority_type, &set_authority.new_authority) {
            (AuthorityType::MintTokens, None) => vec![SecurityWarning::new(
                PatternId::MintKill,
                Severity::Critical,
                "You are permanently disabling Mint Authority. This token can NEVER be minted again.",
            )
            .with_optional_account(account)],
            (AuthorityType::FreezeAccount, None) => vec![SecurityWarning::new(
                PatternId::FreezeKill,
                Severity::Critical,
                "You are permanently disabling Freeze Authority. Accounts of this token can never be frozen again.",
            )
            .with_optional_account(account)],
            (authority_type, Some(new_authority)) if !signers.contains(new_authority) => {
                vec![SecurityWarning::new(
                    PatternId::SignerMismatch,
                    Severity::Warning,
                    format!(
                        "New {} authority ({}) is a wallet you don't currently sign for. Potential typo/lockout risk.",
                        authority_type, new_authority
                    ),
                )
                .with_optional_account(account)]
            }
            _ => Vec::new(),
        }
    }

    fn analyze_transfer_hooks(
        instructions: &[Instruction],
        config: &SolanaDetectorConfig,
    ) -> Vec<SecurityWarning> {
        let mut warnings = Vec::new();
        let has_transfer = instructions.iter().any(is_token_transfer);

        // first-seen order keeps transaction-level output deterministic
        let mut invocation_order: Vec<&str> = Vec::new();
        let mut invocations: HashMap<&str, usize> = HashMap::new();

        for (i, ix) in instructions.iter().enumerate() {
            let program = ix.program_id.as_str();
            if config.is_trusted(program) {
                continue;
            }

            let count = invocations.entry(program).or_insert(0);
            if *count == 0 {
                invocation_order.push(program);
            }
            *count += 1;

            let account_count = ix.keys.len();

            if account_count > config.max_hook_accounts {
                warnings.push(
                    SecurityWarning::new(
                        PatternId::ExcessiveHookAccounts,
                        Severity::Warning,
                        format!(
                            "Program {} invoked with {} accounts (max {})",
                            program, account_count, config.max_hook_accounts
                        ),
                    )
                    .with_account(program),
                );
            }

            let writable = ix.writable_count();
            if writable > MALICIOUS_HOOK_WRITABLE && account_count > MALICIOUS_HOOK_ACCOUNTS {
                warnings.push(
                    SecurityWarning::new(
                        PatternId::MaliciousTransferHook,
                        Severity::Critical,
                        format!(
                            "Program {} requests {} writable accounts out of {}; possible drainer hook",
                            program, writable, account_count
                        ),
                    )
                    .with_account(program),
                );
            }

            if !has_transfer && account_count > UNEXPECTED_HOOK_ACCOUNTS {
                warnings.push(
                    SecurityWarning::new(
                        PatternId::UnexpectedHookExecution,
                        Severity::Alert,
                        format!(
                            "Program {} touches {} accounts but the transaction has no token transfer",
                            program, account_count
                        ),
                    )
                    .with_account(program),
                );
            }

            let sandwiched = i > 0
                && i + 1 < instructions.len()
                && constants::is_token_program(&instructions[i - 1].program_id)
                && constants::is_token_program(&instructions[i + 1].program_id);
            if sandwiched {
                warnings.push(
                    SecurityWarning::new(
                        PatternId::HookReentrancy,
                        Severity::Critical,
                        format!(
                            "Program {} is sandwiched between token program instructions; possible hook reentrancy",
                            program
                        ),
                    )
                    .with_account(program),
                );
            }
        }

        for program in invocation_order {
            let count = invocations[program];
            if count > MAX_PROGRAM_INVOCATIONS {
                warnings.push(
                    SecurityWarning::new(
                        PatternId::HookReentrancy,
                        Severity::Critical,
                        format!(
                            "Program {} invoked {} times in one transaction (max {})",
                            program, count, MAX_PROGRAM_INVOCATIONS
                        ),
                    )
                    .with_account(program),
                );
            }
        }

        warnings
    }
}

/// SPL Transfer / TransferChecked
fn is_token_transfer(ix: &Instruction) -> bool {
    if !constants::is_token_program(&ix.program_id) {
        return false;
    }
    matches!(
        ix.decode_data().as_deref().and_then(|d| d.first()),
        Some(&token_instruction::TRANSFER) | Some(&token_instruction::TRANSFER_CHECKED)
    )
}
