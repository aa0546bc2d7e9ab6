//! Program-derived address computation
//!
//! Every account the aggregator program owns lives at an address derived
//! from an ordered list of seed byte strings and the program id. The
//! derivation is the chain's own `find_program_address`, so the addresses
//! computed here match the program bit for bit.
//!
//! ## Seeds
//!
//! | Account        | Seeds                                          |
//! |----------------|------------------------------------------------|
//! | Global state   | `"global_state"`                               |
//! | User state     | `"user_state"`, user                           |
//! | Vault          | `"vault"` (optionally followed by the mint)    |
//! | Bridge request | `"bridge_request"`, user                       |
//!
//! Seeds are positional: reordering them yields a different address.
//!
//! The deployed program keeps one bridge request per user. Deployments
//! that allow several append the request sequence as a little-endian u64
//! seed; see [`RequestKeying::Sequenced`].

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::fmt;
use std::str::FromStr;

use crate::bridge::BridgeRequestId;
use crate::error::{ClientError, ClientResult};

/// Seed tag for the singleton global state account
pub const GLOBAL_STATE_SEED: &[u8] = b"global_state";

/// Seed tag for per-user state accounts
pub const USER_STATE_SEED: &[u8] = b"user_state";

/// Seed tag for the token vault
pub const VAULT_SEED: &[u8] = b"vault";

/// Seed tag for bridge request accounts
pub const BRIDGE_REQUEST_SEED: &[u8] = b"bridge_request";

/// A derived address together with the bump seed that moved it off the
/// ed25519 curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramAddress {
    pub address: Pubkey,
    pub bump: u8,
}

/// Derive the program address for `seeds` under `program_id`.
///
/// Pure and deterministic: no I/O, and the same inputs always produce the
/// same output.
pub fn derive(seeds: &[&[u8]], program_id: &Pubkey) -> ProgramAddress {
    let (address, bump) = Pubkey::find_program_address(seeds, program_id);
    ProgramAddress { address, bump }
}

/// How bridge request accounts are keyed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestKeying {
    /// `["bridge_request", user]`: one request per user, sequence always 0
    #[default]
    PerUser,
    /// `["bridge_request", user, sequence]`: any number of requests per user
    Sequenced,
}

impl RequestKeying {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKeying::PerUser => "per-user",
            RequestKeying::Sequenced => "sequenced",
        }
    }
}

impl fmt::Display for RequestKeying {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestKeying {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per-user" | "per_user" | "user" => Ok(RequestKeying::PerUser),
            "sequenced" | "sequence" => Ok(RequestKeying::Sequenced),
            other => Err(format!("unknown bridge request keying: {}", other)),
        }
    }
}

/// Address helper bound to one program deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressBook {
    program_id: Pubkey,
    keying: RequestKeying,
}

impl AddressBook {
    /// Addresses as the deployed program derives them.
    pub fn new(program_id: Pubkey) -> Self {
        Self::with_keying(program_id, RequestKeying::PerUser)
    }

    pub fn with_keying(program_id: Pubkey, keying: RequestKeying) -> Self {
        Self { program_id, keying }
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    pub fn keying(&self) -> RequestKeying {
        self.keying
    }

    pub fn global_state(&self) -> ProgramAddress {
        derive(&[GLOBAL_STATE_SEED], &self.program_id)
    }

    pub fn user_state(&self, user: &Pubkey) -> ProgramAddress {
        derive(&[USER_STATE_SEED, user.as_ref()], &self.program_id)
    }

    /// Vault token account. Deployments holding a single mint use the bare
    /// tag; per-mint vaults append the mint.
    pub fn vault(&self, mint: Option<&Pubkey>) -> ProgramAddress {
        match mint {
            Some(mint) => derive(&[VAULT_SEED, mint.as_ref()], &self.program_id),
            None => derive(&[VAULT_SEED], &self.program_id),
        }
    }

    /// The user's bridge request under the deployed program's seeds.
    pub fn bridge_request(&self, user: &Pubkey) -> ProgramAddress {
        derive(&[BRIDGE_REQUEST_SEED, user.as_ref()], &self.program_id)
    }

    pub fn sequenced_bridge_request(&self, user: &Pubkey, sequence: u64) -> ProgramAddress {
        derive(
            &[BRIDGE_REQUEST_SEED, user.as_ref(), &sequence.to_le_bytes()],
            &self.program_id,
        )
    }

    /// Address of request `id` under this book's keying. Per-user keying
    /// only knows sequence 0.
    pub fn bridge_request_at(&self, id: &BridgeRequestId) -> ClientResult<ProgramAddress> {
        match self.keying {
            RequestKeying::PerUser if id.sequence == 0 => Ok(self.bridge_request(&id.user)),
            RequestKeying::PerUser => Err(ClientError::InvalidAddress {
                reason: format!(
                    "bridge request {} has a sequence but requests are keyed per user",
                    id
                ),
            }),
            RequestKeying::Sequenced => Ok(self.sequenced_bridge_request(&id.user, id.sequence)),
        }
    }
}
