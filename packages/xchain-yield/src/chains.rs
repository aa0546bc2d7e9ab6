//! Supported target chains
//!
//! Chains are identified by small positive integers (`1` = Solana,
//! `2` = Ethereum, ...). The set is an open enumeration held in a
//! [`ChainRegistry`]; operations validate membership against the
//! registry rather than matching on fixed ids.
//!
//! Each chain also declares how its addresses are written, so a user's
//! destination address text can be normalised to the program's 32-byte
//! `target_address`.

use eyre::{eyre, Result, WrapErr};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{ClientError, ClientResult};

/// Solana mainnet chain id
pub const CHAIN_SOLANA: u8 = 1;
/// Ethereum mainnet chain id
pub const CHAIN_ETHEREUM: u8 = 2;
/// Polygon PoS chain id
pub const CHAIN_POLYGON: u8 = 3;

/// Address format used by a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressKind {
    /// 20-byte hex addresses, left-padded to 32 bytes
    Evm,
    /// 32-byte base58 public keys
    Solana,
}

impl AddressKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressKind::Evm => "evm",
            AddressKind::Solana => "solana",
        }
    }

    /// Normalise an address string to the 32-byte on-chain form.
    pub fn parse_address(&self, text: &str) -> ClientResult<[u8; 32]> {
        let text = text.trim();
        match self {
            AddressKind::Evm => parse_evm_target(text),
            AddressKind::Solana => parse_solana_target(text),
        }
    }

    /// Render a 32-byte on-chain address in this chain's format.
    pub fn format_address(&self, bytes: &[u8; 32]) -> String {
        match self {
            AddressKind::Evm if bytes[..12].iter().all(|&b| b == 0) => {
                format!("0x{}", hex::encode(&bytes[12..]))
            }
            AddressKind::Evm => format!("0x{}", hex::encode(bytes)),
            AddressKind::Solana => Pubkey::new_from_array(*bytes).to_string(),
        }
    }
}

impl FromStr for AddressKind {
    type Err = eyre::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "evm" => Ok(AddressKind::Evm),
            "solana" => Ok(AddressKind::Solana),
            other => Err(eyre!("Unknown address kind '{}'", other)),
        }
    }
}

fn parse_evm_target(text: &str) -> ClientResult<[u8; 32]> {
    let hex_str = text.strip_prefix("0x").unwrap_or(text);
    let bytes = hex::decode(hex_str).map_err(|e| ClientError::InvalidAddress {
        reason: format!("'{}' is not hex: {}", text, e),
    })?;

    let mut result = [0u8; 32];
    match bytes.len() {
        20 => result[12..].copy_from_slice(&bytes),
        32 => result.copy_from_slice(&bytes),
        len => {
            return Err(ClientError::InvalidAddress {
                reason: format!("EVM address must be 20 or 32 bytes, got {}", len),
            })
        }
    }

    if result == [0u8; 32] {
        return Err(ClientError::InvalidAddress {
            reason: "zero address".to_string(),
        });
    }
    Ok(result)
}

fn parse_solana_target(text: &str) -> ClientResult<[u8; 32]> {
    let bytes = bs58::decode(text)
        .into_vec()
        .map_err(|e| ClientError::InvalidAddress {
            reason: format!("'{}' is not base58: {}", text, e),
        })?;
    <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| ClientError::InvalidAddress {
        reason: format!("Solana address must be 32 bytes, got {}", bytes.len()),
    })
}

/// A supported target chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainInfo {
    pub id: u8,
    pub name: String,
    pub symbol: String,
    pub address_kind: AddressKind,
}

impl ChainInfo {
    pub fn new(id: u8, name: &str, symbol: &str, address_kind: AddressKind) -> Self {
        Self {
            id,
            name: name.to_string(),
            symbol: symbol.to_string(),
            address_kind,
        }
    }
}

impl fmt::Display for ChainInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, id {})", self.name, self.symbol, self.id)
    }
}

/// The set of chains a deployment accepts as bridge targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainRegistry {
    chains: BTreeMap<u8, ChainInfo>,
}

impl ChainRegistry {
    pub fn new(chains: impl IntoIterator<Item = ChainInfo>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for chain in chains {
            if chain.id == 0 {
                return Err(eyre!("Chain id 0 is reserved ({})", chain.name));
            }
            let id = chain.id;
            if map.insert(id, chain).is_some() {
                return Err(eyre!("Duplicate chain id {}", id));
            }
        }
        if map.is_empty() {
            return Err(eyre!("Chain registry cannot be empty"));
        }
        Ok(Self { chains: map })
    }

    /// Parse `id:name:symbol:kind` entries separated by commas, e.g.
    /// `1:Solana:SOL:solana,2:Ethereum:ETH:evm`.
    pub fn parse(spec: &str) -> Result<Self> {
        let mut chains = Vec::new();
        for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let parts: Vec<&str> = entry.split(':').map(str::trim).collect();
            if parts.len() != 4 {
                return Err(eyre!(
                    "Chain entry '{}' must be id:name:symbol:kind",
                    entry
                ));
            }
            let id: u8 = parts[0]
                .parse()
                .wrap_err_with(|| format!("Invalid chain id in '{}'", entry))?;
            let kind: AddressKind = parts[3].parse()?;
            chains.push(ChainInfo::new(id, parts[1], parts[2], kind));
        }
        Self::new(chains)
    }

    pub fn get(&self, id: u8) -> Option<&ChainInfo> {
        self.chains.get(&id)
    }

    pub fn contains(&self, id: u8) -> bool {
        self.chains.contains_key(&id)
    }

    /// Look up a chain or fail with `UnsupportedChain`.
    pub fn require(&self, id: u8) -> ClientResult<&ChainInfo> {
        self.get(id)
            .ok_or(ClientError::UnsupportedChain { chain_id: id })
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChainInfo> {
        self.chains.values()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

impl Default for ChainRegistry {
    fn default() -> Self {
        use AddressKind::*;
        let chains = [
            ChainInfo::new(CHAIN_SOLANA, "Solana", "SOL", Solana),
            ChainInfo::new(CHAIN_ETHEREUM, "Ethereum", "ETH", Evm),
            ChainInfo::new(CHAIN_POLYGON, "Polygon", "MATIC", Evm),
            ChainInfo::new(4, "BNB Chain", "BNB", Evm),
            ChainInfo::new(5, "Arbitrum", "ARB", Evm),
            ChainInfo::new(6, "Optimism", "OP", Evm),
            ChainInfo::new(7, "Avalanche", "AVAX", Evm),
            ChainInfo::new(8, "Fantom", "FTM", Evm),
        ];
        Self {
            chains: chains.into_iter().map(|c| (c.id, c)).collect(),
        }
    }
}
