use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::error::ClientResult;

/// Number of chain slots in an oracle snapshot
pub const MAX_ORACLE_CHAINS: usize = 10;

/// Cross-chain yield snapshot embedded in the global state.
///
/// Slot `i` of `yield_rates` and `apy_data` belongs to chain id `i + 1`.
/// The snapshot is overwritten wholesale on every update.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct OracleData {
    pub source_chain: u8,
    pub timestamp: i64,
    /// Basis points per chain slot
    pub yield_rates: [u64; MAX_ORACLE_CHAINS],
    pub total_value_locked: u64,
    /// Basis points per chain slot
    pub apy_data: [u64; MAX_ORACLE_CHAINS],
}

impl OracleData {
    pub const LEN: usize = 1 + 8 + 8 * MAX_ORACLE_CHAINS + 8 + 8 * MAX_ORACLE_CHAINS;

    fn slot(chain_id: u8) -> Option<usize> {
        let index = (chain_id as usize).checked_sub(1)?;
        (index < MAX_ORACLE_CHAINS).then_some(index)
    }

    /// Reported yield rate for a chain, if the chain has a slot.
    pub fn yield_rate(&self, chain_id: u8) -> Option<u64> {
        Self::slot(chain_id).map(|i| self.yield_rates[i])
    }

    pub fn apy(&self, chain_id: u8) -> Option<u64> {
        Self::slot(chain_id).map(|i| self.apy_data[i])
    }

    pub fn has_slot(chain_id: u8) -> bool {
        Self::slot(chain_id).is_some()
    }

    pub(crate) fn validate(&self) -> ClientResult<()> {
        super::non_negative("GlobalState", "oracle_data.timestamp", self.timestamp)
    }
}
