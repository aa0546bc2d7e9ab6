//! Error types for the yield aggregator client
//!
//! Every failure names the precondition that failed. Validation and
//! authority errors are raised before any instruction is built, so a
//! returned error never implies a partial state change, with the single
//! exception of [`ClientError::OutcomeUnknown`].

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

use crate::bridge::BridgeStatus;

/// Result alias used throughout the client.
pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    // ========================================================================
    // Input Errors (recovered locally, never submitted)
    // ========================================================================
    #[error("Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    #[error("Invalid address: {reason}")]
    InvalidAddress { reason: String },

    #[error("Unsupported chain: {chain_id}")]
    UnsupportedChain { chain_id: u8 },

    // ========================================================================
    // Balance Errors
    // ========================================================================
    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: u64, available: u64 },

    #[error("No yield to claim for {user}")]
    NoYieldToClaim { user: Pubkey },

    #[error("Arithmetic overflow in {field}")]
    Overflow { field: &'static str },

    // ========================================================================
    // Authorization Errors
    // ========================================================================
    #[error("Unauthorized: {signer} is not {expected}")]
    Unauthorized { signer: Pubkey, expected: Pubkey },

    #[error("Program already initialized (authority {authority})")]
    AlreadyInitialized { authority: Pubkey },

    #[error("Program not initialized")]
    NotInitialized,

    // ========================================================================
    // State Errors
    // ========================================================================
    #[error("Schema mismatch for {account}: {reason}")]
    SchemaMismatch {
        account: &'static str,
        reason: String,
    },

    #[error("Account not found: {kind} at {address}")]
    AccountNotFound { kind: &'static str, address: Pubkey },

    #[error("Bridge request already exists at {address}")]
    BridgeRequestExists { address: Pubkey },

    #[error("Invalid bridge transition: {from} -> {to}")]
    InvalidTransition { from: BridgeStatus, to: BridgeStatus },

    // ========================================================================
    // Submission Errors
    // ========================================================================
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("Transaction {signature} rejected: {reason}")]
    ConfirmationFailed { signature: String, reason: String },

    #[error("Outcome unknown for transaction {signature}: {reason}")]
    OutcomeUnknown { signature: String, reason: String },
}

impl ClientError {
    pub fn invalid_amount(reason: impl Into<String>) -> Self {
        ClientError::InvalidAmount {
            reason: reason.into(),
        }
    }

    pub fn schema(account: &'static str, reason: impl Into<String>) -> Self {
        ClientError::SchemaMismatch {
            account,
            reason: reason.into(),
        }
    }

    /// Only transport failures before submission are safe to retry, and
    /// only the caller decides to do so.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::NetworkFailure(_))
    }
}
