/// Solana program IDs (shared constants)
pub mod programs {
    /// SPL Token program
    pub const TOKEN: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
    /// SPL Token-2022 program
    pub const TOKEN_2022: &str = "TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb";
    /// System program
    pub const SYSTEM: &str = "11111111111111111111111111111111";
    /// Compute budget program
    pub const COMPUTE_BUDGET: &str = "ComputeBudget111111111111111111111111111111";
    /// Associated token account program
    pub const ASSOCIATED_TOKEN: &str = "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL";
    /// SPL Memo program (v2)
    pub const MEMO: &str = "MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr";
    /// Jupiter Aggregator Program ID
    pub const JUPITER: &str = "JUP6LkbZbjS1jKKwapdHNy74zcZ3tLUZoi5QNyVTaV4";
}

/// Programs that are never treated as transfer hooks
pub const KNOWN_PROGRAMS: [&str; 5] = [
    programs::TOKEN,
    programs::TOKEN_2022,
    programs::SYSTEM,
    programs::COMPUTE_BUDGET,
    programs::ASSOCIATED_TOKEN,
];

/// Built-in transfer hook allow-list, extended by `allowed_hook_programs`
pub const BUILTIN_HOOK_PROGRAMS: [&str; 2] = [programs::MEMO, programs::JUPITER];

/// SPL token instruction discriminators
pub mod token_instruction {
    pub const TRANSFER: u8 = 3;
    pub const SET_AUTHORITY: u8 = 6;
    pub const CLOSE_ACCOUNT: u8 = 9;
    pub const TRANSFER_CHECKED: u8 = 12;
}

/// 1 gwei in wei
pub const GWEI: u128 = 1_000_000_000;

/// Check whether a program is one of the SPL token programs
pub fn is_token_program(program_id: &str) -> bool {
    program_id == programs::TOKEN || program_id == programs::TOKEN_2022
}
