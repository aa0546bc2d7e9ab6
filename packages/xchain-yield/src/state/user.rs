use borsh::{BorshDeserialize, BorshSerialize};
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;

use super::{non_negative, serialize_pubkey, ProgramAccount, DISCRIMINATOR_LEN};
use crate::error::{ClientError, ClientResult};

/// Per-user position, created lazily on first deposit.
///
/// `pending_cross_chain_transfers` is the part of `deposited_amount`
/// earmarked by in-flight bridge requests. This client never lets it exceed
/// the deposit, but accounts written elsewhere may, and still decode.
#[derive(Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize)]
pub struct UserState {
    #[serde(serialize_with = "serialize_pubkey")]
    pub user: Pubkey,
    pub deposited_amount: u64,
    pub total_yield_claimed: u64,
    pub last_deposit_timestamp: i64,
    pub last_withdrawal_timestamp: i64,
    pub last_yield_claim: i64,
    pub bump: u8,
    pub pending_cross_chain_transfers: u64,
    pub cross_chain_deposits: u64,
}

impl UserState {
    pub fn new(user: Pubkey, bump: u8) -> Self {
        Self {
            user,
            bump,
            ..Default::default()
        }
    }

    /// Principal not earmarked by an in-flight bridge request.
    pub fn available_balance(&self) -> u64 {
        self.deposited_amount
            .saturating_sub(self.pending_cross_chain_transfers)
    }

    pub fn ensure_owner(&self, signer: &Pubkey) -> ClientResult<()> {
        if *signer != self.user {
            return Err(ClientError::Unauthorized {
                signer: *signer,
                expected: self.user,
            });
        }
        Ok(())
    }

    pub fn ensure_available(&self, amount: u64) -> ClientResult<()> {
        let available = self.available_balance();
        if amount > available {
            return Err(ClientError::InsufficientBalance {
                requested: amount,
                available,
            });
        }
        Ok(())
    }
}

impl ProgramAccount for UserState {
    const NAME: &'static str = "UserState";
    const LEN: usize = DISCRIMINATOR_LEN + 32 + 8 + 8 + 8 + 8 + 8 + 1 + 8 + 8;

    fn validate(&self) -> ClientResult<()> {
        non_negative(Self::NAME, "last_deposit_timestamp", self.last_deposit_timestamp)?;
        non_negative(
            Self::NAME,
            "last_withdrawal_timestamp",
            self.last_withdrawal_timestamp,
        )?;
        non_negative(Self::NAME, "last_yield_claim", self.last_yield_claim)?;
        Ok(())
    }
}
