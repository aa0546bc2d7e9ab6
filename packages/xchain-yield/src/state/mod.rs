//! Account state model
//!
//! Typed schemas for the accounts the aggregator program owns. Every
//! account is laid out as
//!
//! ```text
//! | discriminator (8) | borsh-encoded fields in declaration order |
//! ```
//!
//! where the discriminator is the first 8 bytes of
//! `sha256("account:<TypeName>")`. All decoding goes through
//! [`decode_account`], which checks the discriminator, the body, and the
//! per-account invariants in one place.

mod bridge_request;
mod global;
mod oracle;
mod user;

pub use bridge_request::BridgeRequest;
pub use global::GlobalState;
pub use oracle::{OracleData, MAX_ORACLE_CHAINS};
pub use user::UserState;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::Serialize;
use solana_sdk::hash::hashv;
use solana_sdk::pubkey::Pubkey;

use crate::error::{ClientError, ClientResult};

/// Length of every account discriminator
pub const DISCRIMINATOR_LEN: usize = 8;

/// Compute the discriminator for an account type name.
pub fn account_discriminator(name: &str) -> [u8; DISCRIMINATOR_LEN] {
    let hash = hashv(&[b"account:", name.as_bytes()]);
    let mut out = [0u8; DISCRIMINATOR_LEN];
    out.copy_from_slice(&hash.to_bytes()[..DISCRIMINATOR_LEN]);
    out
}

/// An account kind owned by the aggregator program
pub trait ProgramAccount: BorshSerialize + BorshDeserialize + Sized {
    /// Type name hashed into the discriminator
    const NAME: &'static str;

    /// Encoded size including the discriminator
    const LEN: usize;

    fn discriminator() -> [u8; DISCRIMINATOR_LEN] {
        account_discriminator(Self::NAME)
    }

    /// Invariants checked after every decode and before every encode.
    fn validate(&self) -> ClientResult<()>;

    fn decode(data: &[u8]) -> ClientResult<Self> {
        decode_account(data)
    }

    fn encode(&self) -> ClientResult<Vec<u8>> {
        self.validate()?;
        let mut data = Vec::with_capacity(Self::LEN);
        data.extend_from_slice(&Self::discriminator());
        self.serialize(&mut data)
            .map_err(|e| ClientError::schema(Self::NAME, e.to_string()))?;
        Ok(data)
    }
}

/// Decode and validate an account of kind `T`.
///
/// Rejects a wrong discriminator, a truncated body, non-zero bytes after
/// the body (zero padding from over-allocation is accepted), and any
/// invariant violation.
pub fn decode_account<T: ProgramAccount>(data: &[u8]) -> ClientResult<T> {
    if data.len() < DISCRIMINATOR_LEN {
        return Err(ClientError::schema(
            T::NAME,
            format!("{} bytes is shorter than the discriminator", data.len()),
        ));
    }

    let (tag, mut body) = data.split_at(DISCRIMINATOR_LEN);
    if tag != T::discriminator() {
        return Err(ClientError::schema(
            T::NAME,
            format!("discriminator 0x{} does not match", hex::encode(tag)),
        ));
    }

    let account =
        T::deserialize(&mut body).map_err(|e| ClientError::schema(T::NAME, e.to_string()))?;

    if body.iter().any(|&b| b != 0) {
        return Err(ClientError::schema(
            T::NAME,
            format!("{} unexpected trailing bytes", body.len()),
        ));
    }

    account.validate()?;
    Ok(account)
}

/// Any decoded program account, identified by its discriminator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccountData {
    GlobalState(GlobalState),
    UserState(UserState),
    BridgeRequest(BridgeRequest),
}

impl AccountData {
    /// Decode a buffer of unknown kind.
    pub fn decode(data: &[u8]) -> ClientResult<Self> {
        let tag = data.get(..DISCRIMINATOR_LEN).ok_or_else(|| {
            ClientError::schema("account", format!("{} bytes is too short", data.len()))
        })?;

        if tag == GlobalState::discriminator() {
            decode_account(data).map(AccountData::GlobalState)
        } else if tag == UserState::discriminator() {
            decode_account(data).map(AccountData::UserState)
        } else if tag == BridgeRequest::discriminator() {
            decode_account(data).map(AccountData::BridgeRequest)
        } else {
            Err(ClientError::schema(
                "account",
                format!("unknown discriminator 0x{}", hex::encode(tag)),
            ))
        }
    }
}

pub(crate) fn non_negative(account: &'static str, field: &str, value: i64) -> ClientResult<()> {
    if value < 0 {
        return Err(ClientError::schema(
            account,
            format!("{} is negative ({})", field, value),
        ));
    }
    Ok(())
}

pub(crate) fn serialize_pubkey<S>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_str(key)
}
