//! Transaction models - legacy single-chain and unified multi-chain shapes

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Account reference inside an instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountMeta {
    pub pubkey: String,
    #[serde(default)]
    pub is_signer: bool,
    #[serde(default)]
    pub is_writable: bool,
}

/// Decoded Solana instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instruction {
    pub program_id: String,
    /// Instruction data, base64 encoded
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub keys: Vec<AccountMeta>,
}

impl Instruction {
    /// Decode the base64 data; `None` when the payload is not valid base64
    pub fn decode_data(&self) -> Option<Vec<u8>> {
        BASE64.decode(self.data.as_bytes()).ok()
    }

    pub fn writable_count(&self) -> usize {
        self.keys.iter().filter(|k| k.is_writable).count()
    }
}

/// Privacy requirements attached by the caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivacyMetadata {
    #[serde(default)]
    pub requires_privacy: bool,
    #[serde(default)]
    pub compression_enabled: bool,
}

impl PrivacyMetadata {
    /// Privacy was requested but the transaction is not compressed
    pub fn is_uncompressed_private(&self) -> bool {
        self.requires_privacy && !self.compression_enabled
    }
}

/// Legacy single-chain (Solana) transaction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub instructions: Option<Vec<Instruction>>,
    #[serde(default)]
    pub signers: Option<Vec<String>>,
    #[serde(default)]
    pub asset_addresses: Option<Vec<String>>,
    #[serde(default)]
    pub privacy_metadata: Option<PrivacyMetadata>,
}

impl Transaction {
    pub fn instructions(&self) -> &[Instruction] {
        self.instructions.as_deref().unwrap_or(&[])
    }

    pub fn asset_addresses(&self) -> &[String] {
        self.asset_addresses.as_deref().unwrap_or(&[])
    }

    /// Signer set: the explicit list, or every key flagged as signer
    pub fn signer_set(&self) -> HashSet<String> {
        match self.signers {
            Some(ref signers) => signers.iter().cloned().collect(),
            None => self
                .instructions()
                .iter()
                .flat_map(|ix| ix.keys.iter())
                .filter(|k| k.is_signer)
                .map(|k| k.pubkey.clone())
                .collect(),
        }
    }
}

/// Supported chains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Solana,
    Ethereum,
    Polygon,
    Arbitrum,
    Optimism,
    Base,
    Bsc,
    Avalanche,
}

impl Chain {
    /// EVM family check
    pub fn is_evm(&self) -> bool {
        !matches!(self, Chain::Solana)
    }
}

impl std::fmt::Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Chain::Solana => "solana",
            Chain::Ethereum => "ethereum",
            Chain::Polygon => "polygon",
            Chain::Arbitrum => "arbitrum",
            Chain::Optimism => "optimism",
            Chain::Base => "base",
            Chain::Bsc => "bsc",
            Chain::Avalanche => "avalanche",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for Chain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "solana" => Ok(Chain::Solana),
            "ethereum" | "eth" => Ok(Chain::Ethereum),
            "polygon" => Ok(Chain::Polygon),
            "arbitrum" => Ok(Chain::Arbitrum),
            "optimism" => Ok(Chain::Optimism),
            "base" => Ok(Chain::Base),
            "bsc" => Ok(Chain::Bsc),
            "avalanche" => Ok(Chain::Avalanche),
            _ => Err(format!("Unknown chain: {}", s)),
        }
    }
}

/// Solana payload of a unified transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolanaData {
    #[serde(default)]
    pub instructions: Vec<Instruction>,
    #[serde(default)]
    pub signers: Option<Vec<String>>,
}

/// EVM payload of a unified transaction
///
/// Amounts are wei strings, decimal or `0x` hex quantities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvmData {
    #[serde(default)]
    pub to: Option<String>,
    /// Hex calldata, `0x` prefix optional
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub gas_limit: Option<String>,
    #[serde(default)]
    pub gas_price: Option<String>,
    #[serde(default)]
    pub max_fee_per_gas: Option<String>,
    #[serde(default)]
    pub max_priority_fee_per_gas: Option<String>,
    #[serde(default)]
    pub nonce: Option<u64>,
    #[serde(default)]
    pub chain_id: u64,
}

impl EvmData {
    pub fn value_wei(&self) -> Option<u128> {
        parse_wei(self.value.as_deref())
    }

    pub fn gas_price_wei(&self) -> Option<u128> {
        parse_wei(self.gas_price.as_deref())
    }

    pub fn max_priority_fee_wei(&self) -> Option<u128> {
        parse_wei(self.max_priority_fee_per_gas.as_deref())
    }
}

/// Parse a wei amount, either `0x`-prefixed hex (JSON-RPC quantity) or
/// decimal; anything unparseable counts as absent
pub fn parse_wei(raw: Option<&str>) -> Option<u128> {
    let s = raw?.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u128::from_str_radix(hex, 16).ok(),
        None => s.parse::<u128>().ok(),
    }
}

/// Chain-specific payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ChainTransactionData {
    Solana(SolanaData),
    Evm(EvmData),
}

/// High-level operation attached to a unified transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(rename = "type")]
    pub op_type: String,
    #[serde(flatten)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

/// Multi-chain transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedTransaction {
    pub id: String,
    #[serde(default)]
    pub status: String,
    pub chain: Chain,
    pub chain_data: ChainTransactionData,
    #[serde(default)]
    pub asset_addresses: Option<Vec<String>>,
    #[serde(default)]
    pub operations: Vec<Operation>,
    #[serde(default)]
    pub privacy_metadata: Option<PrivacyMetadata>,
}

impl UnifiedTransaction {
    pub fn asset_addresses(&self) -> &[String] {
        self.asset_addresses.as_deref().unwrap_or(&[])
    }

    /// Convert a Solana payload to the legacy shape; `None` for EVM payloads
    pub fn to_legacy(&self) -> Option<Transaction> {
        match self.chain_data {
            ChainTransactionData::Solana(ref data) => Some(Transaction {
                id: self.id.clone(),
                status: self.status.clone(),
                instructions: Some(data.instructions.clone()),
                signers: data.signers.clone(),
                asset_addresses: self.asset_addresses.clone(),
                privacy_metadata: self.privacy_metadata.clone(),
            }),
            ChainTransactionData::Evm(_) => None,
        }
    }
}
