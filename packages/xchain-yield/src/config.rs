use eyre::{eyre, Result, WrapErr};
use solana_sdk::pubkey::Pubkey;
use std::env;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::amount::{AmountCodec, MAX_DECIMALS};
use crate::chains::ChainRegistry;
use crate::pda::RequestKeying;

/// Program id of the deployed aggregator
pub const DEFAULT_PROGRAM_ID: &str = "HeHD9gK7PC2tzxEVoL18eAz6EPLnXe7XY9CLnDCPeRiW";

/// Deployment configuration for the client
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub program_id: Pubkey,
    /// Decimal places of the deposited token
    pub token_decimals: u8,
    /// When set, the vault address is derived per mint
    pub token_mint: Option<Pubkey>,
    pub chains: ChainRegistry,
    /// Bridge request account seeds; per user unless the deployment
    /// sequences requests
    pub request_keying: RequestKeying,
}

/// Compact Debug that lists chain ids instead of the full registry.
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chain_ids: Vec<u8> = self.chains.iter().map(|c| c.id).collect();
        f.debug_struct("ClientConfig")
            .field("program_id", &self.program_id.to_string())
            .field("token_decimals", &self.token_decimals)
            .field("token_mint", &self.token_mint.map(|m| m.to_string()))
            .field("chains", &chain_ids)
            .field("request_keying", &self.request_keying.as_str())
            .finish()
    }
}

impl ClientConfig {
    /// Load configuration from environment variables
    /// Loads .env file if present, then reads from environment
    pub fn load() -> Result<Self> {
        Self::load_from_file(".env").or_else(|_| Self::load_from_env())
    }

    /// Load from a specific .env file path
    pub fn load_from_file(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            dotenvy::from_filename(path)
                .wrap_err_with(|| format!("Failed to load .env file from {}", path))?;
        }
        Self::load_from_env()
    }

    /// Load configuration from environment variables
    pub fn load_from_env() -> Result<Self> {
        let program_id = match env::var("PROGRAM_ID") {
            Ok(value) => parse_pubkey("PROGRAM_ID", &value)?,
            Err(_) => parse_pubkey("PROGRAM_ID", DEFAULT_PROGRAM_ID)?,
        };

        let token_decimals = env::var("TOKEN_DECIMALS")
            .map_err(|_| eyre!("TOKEN_DECIMALS environment variable is required"))?
            .trim()
            .parse()
            .wrap_err("TOKEN_DECIMALS must be a valid u8")?;

        let token_mint = env::var("TOKEN_MINT")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(|v| parse_pubkey("TOKEN_MINT", &v))
            .transpose()?;

        let chains = match env::var("SUPPORTED_CHAINS") {
            Ok(spec) if !spec.trim().is_empty() => {
                ChainRegistry::parse(&spec).wrap_err("SUPPORTED_CHAINS is malformed")?
            }
            _ => ChainRegistry::default(),
        };

        let request_keying = match env::var("BRIDGE_REQUEST_KEYING") {
            Ok(value) if !value.trim().is_empty() => value
                .parse()
                .map_err(|e| eyre!("BRIDGE_REQUEST_KEYING is invalid: {}", e))?,
            _ => RequestKeying::default(),
        };

        let config = ClientConfig {
            program_id,
            token_decimals,
            token_mint,
            chains,
            request_keying,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.token_decimals > MAX_DECIMALS {
            return Err(eyre!(
                "TOKEN_DECIMALS must be at most {}, got {}",
                MAX_DECIMALS,
                self.token_decimals
            ));
        }
        if self.chains.is_empty() {
            return Err(eyre!("at least one supported chain is required"));
        }
        Ok(())
    }

    pub fn amount_codec(&self) -> Result<AmountCodec> {
        AmountCodec::new(self.token_decimals).wrap_err("invalid TOKEN_DECIMALS")
    }
}

fn parse_pubkey(name: &str, value: &str) -> Result<Pubkey> {
    Pubkey::from_str(value.trim())
        .map_err(|e| eyre!("{} must be a base58 public key: {}", name, e))
}
