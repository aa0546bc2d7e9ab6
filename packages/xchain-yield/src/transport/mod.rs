//! Ledger transport boundary
//!
//! The client never talks to an RPC node directly. It reads raw account
//! bytes, submits instructions, and asks for confirmation through the
//! [`Transport`] trait, so the same client drives a live cluster or the
//! in-process [`MemoryTransport`].

mod memory;

pub use memory::MemoryTransport;

use async_trait::async_trait;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use std::time::Duration;
use thiserror::Error;

/// Final word on a submitted transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    /// Executed and committed
    Confirmed,
    /// Executed and rolled back, with the program's reason
    Rejected(String),
    /// No verdict obtained; the transaction may or may not have landed
    Unknown(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("rpc error: {0}")]
    Rpc(String),
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Raw account data, or `None` if nothing lives at `address`.
    async fn fetch_account(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, TransportError>;

    /// Sign with `signer` and submit. Returns once the transaction is
    /// accepted for processing, not once it executes.
    async fn submit(
        &self,
        instruction: Instruction,
        signer: &Pubkey,
    ) -> Result<Signature, TransportError>;

    async fn confirm(&self, signature: &Signature) -> Result<Confirmation, TransportError>;
}
