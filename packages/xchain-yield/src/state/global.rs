use borsh::{BorshDeserialize, BorshSerialize};
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;

use super::{non_negative, serialize_pubkey, OracleData, ProgramAccount, DISCRIMINATOR_LEN};
use crate::error::{ClientError, ClientResult};

/// Program-wide singleton. Created by `initialize`, never closed.
///
/// `total_deposits` tracks the sum of every user's `deposited_amount`;
/// `pending_cross_chain_amount` tracks the sum of non-terminal bridge
/// request amounts; `total_cross_chain_deposits` the sum of completed ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize)]
pub struct GlobalState {
    #[serde(serialize_with = "serialize_pubkey")]
    pub authority: Pubkey,
    pub total_deposits: u64,
    pub total_yield_earned: u64,
    /// Basis points
    pub solana_yield_rate: u64,
    /// Basis points
    pub ethereum_yield_rate: u64,
    /// Basis points
    pub polygon_yield_rate: u64,
    pub last_yield_update: i64,
    pub is_initialized: bool,
    pub bump: u8,
    pub pending_cross_chain_amount: u64,
    pub total_cross_chain_deposits: u64,
    pub oracle_data: OracleData,
    pub last_oracle_update: i64,
}

impl GlobalState {
    /// State written by `initialize`: caller becomes authority, counters zeroed.
    pub fn initialized(authority: Pubkey, bump: u8) -> Self {
        Self {
            authority,
            is_initialized: true,
            bump,
            ..Default::default()
        }
    }

    pub fn ensure_initialized(&self) -> ClientResult<()> {
        if !self.is_initialized {
            return Err(ClientError::NotInitialized);
        }
        Ok(())
    }

    pub fn ensure_authority(&self, signer: &Pubkey) -> ClientResult<()> {
        if *signer != self.authority {
            return Err(ClientError::Unauthorized {
                signer: *signer,
                expected: self.authority,
            });
        }
        Ok(())
    }

    /// Fixed per-chain rate fields for the three launch chains.
    pub fn base_yield_rate(&self, chain_id: u8) -> Option<u64> {
        match chain_id {
            1 => Some(self.solana_yield_rate),
            2 => Some(self.ethereum_yield_rate),
            3 => Some(self.polygon_yield_rate),
            _ => None,
        }
    }
}

impl ProgramAccount for GlobalState {
    const NAME: &'static str = "GlobalState";
    const LEN: usize =
        DISCRIMINATOR_LEN + 32 + 8 * 5 + 8 + 1 + 1 + 8 + 8 + OracleData::LEN + 8;

    fn validate(&self) -> ClientResult<()> {
        non_negative(Self::NAME, "last_yield_update", self.last_yield_update)?;
        non_negative(Self::NAME, "last_oracle_update", self.last_oracle_update)?;
        self.oracle_data.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GlobalState {
        let mut state = GlobalState::initialized(Pubkey::new_unique(), 253);
        state.total_deposits = 1_500_000_000;
        state.total_yield_earned = 12_345;
        state.solana_yield_rate = 520;
        state.ethereum_yield_rate = 810;
        state.polygon_yield_rate = 1230;
        state.last_yield_update = 1_700_000_000;
        state.pending_cross_chain_amount = 25_000_000;
        state.total_cross_chain_deposits = 50_000_000;
        state.oracle_data.source_chain = 1;
        state.oracle_data.timestamp = 1_700_000_100;
        state.oracle_data.yield_rates[..3].copy_from_slice(&[520, 810, 1230]);
        state.oracle_data.total_value_locked = 1_000_000_000_000;
        state.last_oracle_update = 1_700_000_100;
        state
    }

    #[test]
    fn test_encode_decode_preserves_every_field() {
        let state = sample();
        let data = state.encode().unwrap();
        assert_eq!(data.len(), GlobalState::LEN);
        assert_eq!(GlobalState::decode(&data).unwrap(), state);
    }

    #[test]
    fn test_field_order_on_the_wire() {
        let state = sample();
        let data = state.encode().unwrap();
        // authority immediately follows the discriminator
        assert_eq!(&data[8..40], state.authority.as_ref());
        // then total_deposits, little-endian
        assert_eq!(&data[40..48], &1_500_000_000u64.to_le_bytes());
        // is_initialized and bump after five u64 and one i64
        assert_eq!(data[88], 1);
        assert_eq!(data[89], 253);
    }

    #[test]
    fn test_decode_rejects_negative_timestamp() {
        let mut state = sample();
        state.last_yield_update = -1;
        let mut data = GlobalState::discriminator().to_vec();
        borsh::to_writer(&mut data, &state).unwrap();
        assert!(matches!(
            GlobalState::decode(&data),
            Err(ClientError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_invalid_bool() {
        let mut data = sample().encode().unwrap();
        data[88] = 2;
        assert!(GlobalState::decode(&data).is_err());
    }

    #[test]
    fn test_authority_check() {
        let state = sample();
        assert!(state.ensure_authority(&state.authority).is_ok());
        let intruder = Pubkey::new_unique();
        assert_eq!(
            state.ensure_authority(&intruder).unwrap_err(),
            ClientError::Unauthorized {
                signer: intruder,
                expected: state.authority,
            }
        );
    }

    #[test]
    fn test_uninitialized_is_rejected() {
        assert_eq!(
            GlobalState::default().ensure_initialized().unwrap_err(),
            ClientError::NotInitialized
        );
        assert!(sample().ensure_initialized().is_ok());
    }
}
