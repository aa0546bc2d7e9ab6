//! Bridge request lifecycle
//!
//! ```text
//!   Pending(0) ──► Processing(1) ──┬──► Completed(2)
//!       │                          └──► Failed(3)
//!       └──────────────────────────┬──► Completed(2)
//!                                  └──► Failed(3)
//! ```
//!
//! A request is created `Pending`. `Processing` is reported by off-chain
//! relayers and only recorded. `Completed` and `Failed` are reached through
//! `complete_cross_chain_transfer`, stamp `completed_at`, and are final.

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::fmt;

use crate::error::{ClientError, ClientResult};
use crate::state::BridgeRequest;

/// Status of a bridge request, with its on-chain byte value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum BridgeStatus {
    Pending = 0,
    Processing = 1,
    Completed = 2,
    Failed = 3,
}

impl BridgeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BridgeStatus::Pending => "pending",
            BridgeStatus::Processing => "processing",
            BridgeStatus::Completed => "completed",
            BridgeStatus::Failed => "failed",
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BridgeStatus::Completed | BridgeStatus::Failed)
    }

    /// The transition table. Anything not listed is rejected.
    pub fn can_transition_to(&self, next: BridgeStatus) -> bool {
        use BridgeStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Completed)
                | (Pending, Failed)
                | (Processing, Completed)
                | (Processing, Failed)
        )
    }

    pub fn transition(self, next: BridgeStatus) -> ClientResult<BridgeStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ClientError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl TryFrom<u8> for BridgeStatus {
    type Error = ClientError;

    fn try_from(value: u8) -> ClientResult<Self> {
        match value {
            0 => Ok(BridgeStatus::Pending),
            1 => Ok(BridgeStatus::Processing),
            2 => Ok(BridgeStatus::Completed),
            3 => Ok(BridgeStatus::Failed),
            other => Err(ClientError::schema(
                "BridgeRequest",
                format!("status {} outside 0..=3", other),
            )),
        }
    }
}

impl fmt::Display for BridgeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Terminal outcome reported by the authority
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeOutcome {
    Completed,
    Failed,
}

impl BridgeOutcome {
    pub fn from_success(success: bool) -> Self {
        if success {
            BridgeOutcome::Completed
        } else {
            BridgeOutcome::Failed
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BridgeOutcome::Completed)
    }

    pub fn status(&self) -> BridgeStatus {
        match self {
            BridgeOutcome::Completed => BridgeStatus::Completed,
            BridgeOutcome::Failed => BridgeStatus::Failed,
        }
    }
}

/// Identifies one bridge request: the initiating user plus the request's
/// zero-based sequence among that user's requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BridgeRequestId {
    pub user: Pubkey,
    pub sequence: u64,
}

impl BridgeRequestId {
    pub fn new(user: Pubkey, sequence: u64) -> Self {
        Self { user, sequence }
    }
}

impl fmt::Display for BridgeRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.user, self.sequence)
    }
}

impl BridgeRequest {
    /// A freshly initiated request. Always starts `Pending`.
    pub fn open(
        user: Pubkey,
        target_chain: u8,
        amount: u64,
        target_address: [u8; 32],
        now: i64,
        bump: u8,
    ) -> Self {
        Self {
            user,
            target_chain,
            amount,
            target_address,
            status: BridgeStatus::Pending,
            created_at: now,
            completed_at: 0,
            bump,
        }
    }

    /// Record a relayer's `Processing` report.
    pub fn mark_processing(&mut self) -> ClientResult<()> {
        self.status = self.status.transition(BridgeStatus::Processing)?;
        Ok(())
    }

    /// Move to a terminal status and stamp the completion time.
    pub fn finalize(&mut self, outcome: BridgeOutcome, now: i64) -> ClientResult<()> {
        self.status = self.status.transition(outcome.status())?;
        self.completed_at = now;
        Ok(())
    }
}
