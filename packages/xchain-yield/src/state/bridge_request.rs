use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Serialize, Serializer};
use solana_sdk::pubkey::Pubkey;
use std::io;

use super::{non_negative, serialize_pubkey, ProgramAccount, DISCRIMINATOR_LEN};
use crate::bridge::BridgeStatus;
use crate::error::{ClientError, ClientResult};

/// One cross-chain transfer attempt. `amount` never changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize)]
pub struct BridgeRequest {
    #[serde(serialize_with = "serialize_pubkey")]
    pub user: Pubkey,
    pub target_chain: u8,
    pub amount: u64,
    #[serde(serialize_with = "serialize_hex32")]
    pub target_address: [u8; 32],
    pub status: BridgeStatus,
    pub created_at: i64,
    /// Zero until the request reaches a terminal status
    pub completed_at: i64,
    pub bump: u8,
}

impl ProgramAccount for BridgeRequest {
    const NAME: &'static str = "BridgeRequest";
    const LEN: usize = DISCRIMINATOR_LEN + 32 + 1 + 8 + 32 + 1 + 8 + 8 + 1;

    fn validate(&self) -> ClientResult<()> {
        non_negative(Self::NAME, "created_at", self.created_at)?;
        non_negative(Self::NAME, "completed_at", self.completed_at)?;
        match (self.status.is_terminal(), self.completed_at) {
            (false, 0) => Ok(()),
            (false, at) => Err(ClientError::schema(
                Self::NAME,
                format!("{} request has completed_at {}", self.status, at),
            )),
            (true, 0) => Err(ClientError::schema(
                Self::NAME,
                format!("{} request has no completed_at", self.status),
            )),
            (true, at) if at < self.created_at => Err(ClientError::schema(
                Self::NAME,
                format!("completed_at {} precedes created_at {}", at, self.created_at),
            )),
            (true, _) => Ok(()),
        }
    }
}

// Status is a single byte on the wire; unknown values are schema errors.
impl BorshSerialize for BridgeStatus {
    fn serialize<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        BorshSerialize::serialize(&self.as_u8(), writer)
    }
}

impl BorshDeserialize for BridgeStatus {
    fn deserialize_reader<R: io::Read>(reader: &mut R) -> io::Result<Self> {
        let byte = u8::deserialize_reader(reader)?;
        BridgeStatus::try_from(byte)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
    }
}

fn serialize_hex32<S: Serializer>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&format_args!("0x{}", hex::encode(bytes)))
}
