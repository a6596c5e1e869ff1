//! EVM calldata detector
//!
//! Four independent sub-detectors run over the 4-byte selector and the raw
//! payload: reentrancy, flash loans, front-running and unauthorized access.
//! Results are concatenated as-is.

use crate::constants::GWEI;
use crate::models::{EvmData, PatternId, SecurityWarning, Severity};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// 4-byte function selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Selector(pub [u8; 4]);

impl Selector {
    /// Parse the selector from hex calldata (`0x` prefix optional)
    pub fn from_calldata(data: &str) -> Option<Self> {
        let hex_data = strip_hex_prefix(data.trim());
        let head = hex_data.get(0..8)?;
        let mut bytes = [0u8; 4];
        hex::decode_to_slice(head, &mut bytes).ok()?;
        Some(Selector(bytes))
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

fn strip_hex_prefix(data: &str) -> &str {
    data.strip_prefix("0x")
        .or_else(|| data.strip_prefix("0X"))
        .unwrap_or(data)
}

/// Selector tables
pub mod selectors {
    use super::Selector;

    pub const WITHDRAW: Selector = Selector([0x3c, 0xcf, 0xd6, 0x0b]);
    pub const WITHDRAW_AMOUNT: Selector = Selector([0x2e, 0x1a, 0x7d, 0x4d]);
    pub const WITHDRAW_TO: Selector = Selector([0x00, 0xf7, 0x14, 0xce]);
    pub const TRANSFER: Selector = Selector([0xa9, 0x05, 0x9c, 0xbb]);
    pub const TRANSFER_FROM: Selector = Selector([0x23, 0xb8, 0x72, 0xdd]);

    pub const AAVE_FLASH_LOAN: Selector = Selector([0xab, 0x9c, 0x4b, 0x5d]);
    pub const AAVE_FLASH_LOAN_SIMPLE: Selector = Selector([0x42, 0xb0, 0xb7, 0x7c]);
    pub const UNISWAP_V2_CALL: Selector = Selector([0x10, 0xd1, 0xe8, 0x5c]);
    pub const UNISWAP_V3_FLASH: Selector = Selector([0x49, 0x0e, 0x6c, 0xbc]);
    pub const UNISWAP_V3_FLASH_CALLBACK: Selector = Selector([0xe9, 0xcb, 0xaf, 0xb0]);
    pub const BALANCER_FLASH_LOAN: Selector = Selector([0x5c, 0x38, 0x44, 0x9e]);

    pub const EXEC_FROM_MODULE: Selector = Selector([0x46, 0x87, 0x21, 0xa7]);

    pub const TRANSFER_OWNERSHIP: Selector = Selector([0xf2, 0xfd, 0xe3, 0x8b]);
    pub const OWNER: Selector = Selector([0x8d, 0xa5, 0xcb, 0x5b]);
    pub const RENOUNCE_OWNERSHIP: Selector = Selector([0x71, 0x50, 0x18, 0xa6]);

    pub const UPGRADE_TO: Selector = Selector([0x36, 0x59, 0xcf, 0xe6]);
    pub const UPGRADE_TO_AND_CALL: Selector = Selector([0x4f, 0x1e, 0xf2, 0x86]);
    pub const UPGRADE: Selector = Selector([0x99, 0xa8, 0x8e, 0xc4]);

    pub const GRANT_ROLE: Selector = Selector([0x2f, 0x2f, 0xf1, 0x5d]);
    pub const REVOKE_ROLE: Selector = Selector([0xd5, 0x47, 0x74, 0x1f]);
    pub const RENOUNCE_ROLE: Selector = Selector([0x36, 0x56, 0x8a, 0xbe]);
}

/// Direct withdrawal entry points
static WITHDRAW_SELECTORS: Lazy<HashMap<Selector, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (selectors::WITHDRAW, "withdraw()"),
        (selectors::WITHDRAW_AMOUNT, "withdraw(uint256)"),
    ])
});

/// Calls that move value to an external party
static VALUE_CALL_SELECTORS: Lazy<HashMap<Selector, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (selectors::WITHDRAW, "withdraw()"),
        (selectors::WITHDRAW_AMOUNT, "withdraw(uint256)"),
        (selectors::WITHDRAW_TO, "withdraw(uint256,address)"),
        (selectors::TRANSFER, "transfer(address,uint256)"),
        (selectors::TRANSFER_FROM, "transferFrom(address,address,uint256)"),
    ])
});

/// Known flash loan entry points and callbacks, with protocol names
static FLASH_LOAN_SELECTORS: Lazy<HashMap<Selector, (&'static str, &'static str)>> =
    Lazy::new(|| {
        HashMap::from([
            (selectors::AAVE_FLASH_LOAN, ("Aave V2", "flashLoan")),
            (selectors::AAVE_FLASH_LOAN_SIMPLE, ("Aave V3", "flashLoanSimple")),
            (selectors::UNISWAP_V2_CALL, ("Uniswap V2", "uniswapV2Call")),
            (selectors::UNISWAP_V3_FLASH, ("Uniswap V3", "flash")),
            (selectors::UNISWAP_V3_FLASH_CALLBACK, ("Uniswap V3", "uniswapV3FlashCallback")),
            (selectors::BALANCER_FLASH_LOAN, ("Balancer", "flashLoan")),
        ])
    });

static DELEGATECALL_SELECTORS: Lazy<HashMap<Selector, &'static str>> = Lazy::new(|| {
    HashMap::from([(
        selectors::EXEC_FROM_MODULE,
        "execTransactionFromModule(address,uint256,bytes,uint8)",
    )])
});

static OWNERSHIP_SELECTORS: Lazy<HashMap<Selector, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (selectors::TRANSFER_OWNERSHIP, "transferOwnership(address)"),
        (selectors::OWNER, "owner()"),
        (selectors::RENOUNCE_OWNERSHIP, "renounceOwnership()"),
    ])
});

static UPGRADE_SELECTORS: Lazy<HashMap<Selector, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (selectors::UPGRADE_TO, "upgradeTo(address)"),
        (selectors::UPGRADE_TO_AND_CALL, "upgradeToAndCall(address,bytes)"),
        (selectors::UPGRADE, "upgrade(address,address)"),
    ])
});

static ROLE_SELECTORS: Lazy<HashMap<Selector, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (selectors::GRANT_ROLE, "grantRole(bytes32,address)"),
        (selectors::REVOKE_ROLE, "revokeRole(bytes32,address)"),
        (selectors::RENOUNCE_ROLE, "renounceRole(bytes32,address)"),
    ])
});

/// Occurrences of "call" above which the payload looks like nested calls
const MAX_CALL_MARKERS: usize = 2;
/// Priority fee multiple of the network average considered front-running
const PRIORITY_FEE_MULTIPLIER: u128 = 3;
/// Absolute priority fee ceiling when no network average is known
const MAX_PRIORITY_FEE_WEI: u128 = 100 * GWEI;
/// Legacy gas price ceiling
const MAX_GAS_PRICE_WEI: u128 = 500 * GWEI;

/// Stateless EVM transaction analyzer
pub struct EvmDetector;

impl EvmDetector {
    /// Run all sub-detectors over one transaction
    pub fn analyze(tx: &EvmData, network_avg_priority_fee: Option<u128>) -> Vec<SecurityWarning> {
        let selector = Selector::from_calldata(&tx.data);
        let payload = tx.data.to_lowercase();

        let mut warnings = Vec::new();
        warnings.extend(Self::detect_reentrancy(tx, selector, &payload));
        warnings.extend(Self::detect_flash_loan(selector, &payload));
        warnings.extend(Self::detect_front_running(tx, network_avg_priority_fee));
        warnings.extend(Self::detect_unauthorized_access(selector, &payload));

        let warnings: Vec<SecurityWarning> = warnings
            .into_iter()
            .map(|w| w.with_optional_account(tx.to.clone()))
            .collect();

        if !warnings.is_empty() {
            tracing::debug!(
                selector = ?selector.map(|s| s.to_string()),
                chain_id = tx.chain_id,
                warning_count = warnings.len(),
                "EVM detector produced warnings"
            );
        }

        warnings
    }

    fn detect_reentrancy(
        tx: &EvmData,
        selector: Option<Selector>,
        payload: &str,
    ) -> Vec<SecurityWarning> {
        let mut warnings = Vec::new();

        if let Some(signature) = selector.and_then(|s| WITHDRAW_SELECTORS.get(&s)) {
            warnings.push(SecurityWarning::new(
                PatternId::ReentrancyAttack,
                Severity::Warning,
                format!(
                    "Call to {} is a common reentrancy target; verify the contract follows checks-effects-interactions",
                    signature
                ),
            ));
        }

        let has_value = tx.value_wei().map(|v| v > 0).unwrap_or(false);
        if has_value {
            if let Some(signature) = selector.and_then(|s| VALUE_CALL_SELECTORS.get(&s)) {
                warnings.push(SecurityWarning::new(
                    PatternId::ReentrancyAttack,
                    Severity::Warning,
                    format!(
                        "Value transfer + external call via {}; reentrancy risk",
                        signature
                    ),
                ));
            }
        }

        let call_markers = payload.matches("call").count();
        if call_markers > MAX_CALL_MARKERS {
            warnings.push(SecurityWarning::new(
                PatternId::ReentrancyAttack,
                Severity::Alert,
                format!(
                    "Payload contains {} call markers; nested external calls may re-enter",
                    call_markers
                ),
            ));
        }

        warnings
    }

    fn detect_flash_loan(selector: Option<Selector>, payload: &str) -> Vec<SecurityWarning> {
        let mut warnings = Vec::new();

        if let Some((protocol, function)) = selector.and_then(|s| FLASH_LOAN_SELECTORS.get(&s)) {
            warnings.push(SecurityWarning::new(
                PatternId::FlashLoanAttack,
                Severity::Warning,
                format!("{} flash loan entry point detected ({})", protocol, function),
            ));
        }

        // "flashloan" contains "flash"
        if payload.contains("flash") {
            warnings.push(SecurityWarning::new(
                PatternId::FlashLoanAttack,
                Severity::Alert,
                "Payload references a flash loan",
            ));
        }

        warnings
    }

    fn detect_front_running(
        tx: &EvmData,
        network_avg_priority_fee: Option<u128>,
    ) -> Vec<SecurityWarning> {
        let mut warnings = Vec::new();

        if let Some(priority_fee) = tx.max_priority_fee_wei() {
            match network_avg_priority_fee {
                Some(avg) => {
                    if priority_fee > avg.saturating_mul(PRIORITY_FEE_MULTIPLIER) {
                        warnings.push(SecurityWarning::new(
                            PatternId::FrontRunning,
                            Severity::Alert,
                            format!(
                                "Priority fee {} gwei exceeds 3x the network average ({} gwei)",
                                format_gwei(priority_fee),
                                format_gwei(avg)
                            ),
                        ));
                    }
                }
                None => {
                    if priority_fee > MAX_PRIORITY_FEE_WEI {
                        warnings.push(SecurityWarning::new(
                            PatternId::FrontRunning,
                            Severity::Warning,
                            format!(
                                "Priority fee {} gwei exceeds 100 gwei",
                                format_gwei(priority_fee)
                            ),
                        ));
                    }
                }
            }
        }

        if let Some(gas_price) = tx.gas_price_wei() {
            if gas_price > MAX_GAS_PRICE_WEI {
                warnings.push(SecurityWarning::new(
                    PatternId::FrontRunning,
                    Severity::Alert,
                    format!(
                        "Gas price {} gwei exceeds 500 gwei",
                        format_gwei(gas_price)
                    ),
                ));
            }
        }

        warnings
    }

    fn detect_unauthorized_access(
        selector: Option<Selector>,
        payload: &str,
    ) -> Vec<SecurityWarning> {
        let mut warnings = Vec::new();

        let delegate_selector = selector.and_then(|s| DELEGATECALL_SELECTORS.get(&s));
        if payload.contains("delegatecall") || delegate_selector.is_some() {
            let detail = delegate_selector.copied().unwrap_or("delegatecall");
            warnings.push(SecurityWarning::new(
                PatternId::UnauthorizedAccess,
                Severity::Critical,
                format!(
                    "Delegatecall detected ({}); the callee runs with this contract's storage",
                    detail
                ),
            ));
        }

        if let Some(signature) = selector.and_then(|s| OWNERSHIP_SELECTORS.get(&s)) {
            warnings.push(SecurityWarning::new(
                PatternId::UnauthorizedAccess,
                Severity::Critical,
                format!("Ownership function {} called", signature),
            ));
        }

        if let Some(signature) = selector.and_then(|s| UPGRADE_SELECTORS.get(&s)) {
            warnings.push(SecurityWarning::new(
                PatternId::UnauthorizedAccess,
                Severity::Critical,
                format!("Proxy upgrade function {} called", signature),
            ));
        }

        if let Some(signature) = selector.and_then(|s| ROLE_SELECTORS.get(&s)) {
            warnings.push(SecurityWarning::new(
                PatternId::UnauthorizedAccess,
                Severity::Warning,
                format!("Access control function {} called", signature),
            ));
        }

        warnings
    }
}

/// Render wei as gwei with up to two decimals
fn format_gwei(wei: u128) -> String {
    let whole = wei / GWEI;
    let frac = (wei % GWEI) / (GWEI / 100);
    if frac == 0 {
        whole.to_string()
    } else {
        format!("{}.{:02}", whole, frac)
    }
}
