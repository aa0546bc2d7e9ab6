//! Program state transitions
//!
//! Each function takes the accounts an instruction touches, checks every
//! precondition, and only then writes the new values. On `Err` the inputs
//! are untouched. The client runs these to project the state a submitted
//! instruction will produce; [`crate::transport::MemoryTransport`] runs
//! them as its program.

use solana_sdk::pubkey::Pubkey;

use crate::accrual::accrued_yield;
use crate::bridge::BridgeOutcome;
use crate::chains::ChainRegistry;
use crate::error::{ClientError, ClientResult};
use crate::state::{BridgeRequest, GlobalState, OracleData, UserState};

fn add(field: &'static str, a: u64, b: u64) -> ClientResult<u64> {
    a.checked_add(b).ok_or(ClientError::Overflow { field })
}

fn sub(field: &'static str, a: u64, b: u64) -> ClientResult<u64> {
    a.checked_sub(b).ok_or(ClientError::Overflow { field })
}

fn ensure_positive(amount: u64) -> ClientResult<()> {
    if amount == 0 {
        return Err(ClientError::invalid_amount("amount must be greater than zero"));
    }
    Ok(())
}

/// Create the global state. Fails if it already exists initialized.
pub fn initialize(
    existing: Option<&GlobalState>,
    authority: Pubkey,
    bump: u8,
) -> ClientResult<GlobalState> {
    if let Some(state) = existing.filter(|s| s.is_initialized) {
        return Err(ClientError::AlreadyInitialized {
            authority: state.authority,
        });
    }
    Ok(GlobalState::initialized(authority, bump))
}

/// Move `amount` into the vault and credit the user.
///
/// A user's yield clock starts when their principal goes from zero to
/// non-zero.
pub fn deposit(
    global: &mut GlobalState,
    user: &mut UserState,
    signer: &Pubkey,
    amount: u64,
    now: i64,
) -> ClientResult<()> {
    global.ensure_initialized()?;
    ensure_positive(amount)?;
    user.ensure_owner(signer)?;

    let deposited = add("deposited_amount", user.deposited_amount, amount)?;
    let total = add("total_deposits", global.total_deposits, amount)?;

    if user.deposited_amount == 0 {
        user.last_yield_claim = now;
    }
    user.deposited_amount = deposited;
    user.last_deposit_timestamp = now;
    global.total_deposits = total;
    Ok(())
}

/// Return `amount` of available principal to the user.
pub fn withdraw(
    global: &mut GlobalState,
    user: &mut UserState,
    signer: &Pubkey,
    amount: u64,
    now: i64,
) -> ClientResult<()> {
    global.ensure_initialized()?;
    ensure_positive(amount)?;
    user.ensure_owner(signer)?;
    user.ensure_available(amount)?;

    let deposited = sub("deposited_amount", user.deposited_amount, amount)?;
    let total = sub("total_deposits", global.total_deposits, amount)?;

    user.deposited_amount = deposited;
    user.last_withdrawal_timestamp = now;
    global.total_deposits = total;
    Ok(())
}

/// Yield the user could claim at `now`.
pub fn pending_yield(global: &GlobalState, user: &UserState, now: i64) -> u64 {
    accrued_yield(
        user.deposited_amount,
        now.saturating_sub(user.last_yield_claim),
        global.solana_yield_rate,
    )
}

/// Pay out accrued yield and restart the user's yield clock. Returns the
/// amount paid.
pub fn claim_yield(
    global: &mut GlobalState,
    user: &mut UserState,
    signer: &Pubkey,
    now: i64,
) -> ClientResult<u64> {
    global.ensure_initialized()?;
    user.ensure_owner(signer)?;

    let accrued = pending_yield(global, user, now);
    if accrued == 0 {
        return Err(ClientError::NoYieldToClaim { user: user.user });
    }
    let claimed = add("total_yield_claimed", user.total_yield_claimed, accrued)?;
    let earned = add("total_yield_earned", global.total_yield_earned, accrued)?;

    user.total_yield_claimed = claimed;
    user.last_yield_claim = now;
    global.total_yield_earned = earned;
    Ok(accrued)
}

pub fn set_authority(
    global: &mut GlobalState,
    signer: &Pubkey,
    new_authority: Pubkey,
) -> ClientResult<()> {
    global.ensure_initialized()?;
    global.ensure_authority(signer)?;
    global.authority = new_authority;
    Ok(())
}

/// Per-chain base rates in basis points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct YieldRates {
    pub solana: u64,
    pub ethereum: u64,
    pub polygon: u64,
}

pub fn update_yield_data(
    global: &mut GlobalState,
    signer: &Pubkey,
    rates: YieldRates,
    now: i64,
) -> ClientResult<()> {
    global.ensure_initialized()?;
    global.ensure_authority(signer)?;
    global.solana_yield_rate = rates.solana;
    global.ethereum_yield_rate = rates.ethereum;
    global.polygon_yield_rate = rates.polygon;
    global.last_yield_update = now;
    Ok(())
}

pub fn update_oracle_data(
    global: &mut GlobalState,
    signer: &Pubkey,
    chains: &ChainRegistry,
    oracle: OracleData,
    now: i64,
) -> ClientResult<()> {
    global.ensure_initialized()?;
    global.ensure_authority(signer)?;
    chains.require(oracle.source_chain)?;
    oracle.validate()?;
    global.oracle_data = oracle;
    global.last_oracle_update = now;
    Ok(())
}

/// Arguments of a bridge initiation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRequest {
    pub target_chain: u8,
    pub amount: u64,
    pub target_address: [u8; 32],
}

/// Open a `Pending` bridge request and earmark its amount.
///
/// The amount stays in `deposited_amount` but is no longer available for
/// withdrawal or another transfer until the request is completed.
pub fn initiate_transfer(
    global: &mut GlobalState,
    user: &mut UserState,
    signer: &Pubkey,
    chains: &ChainRegistry,
    transfer: TransferRequest,
    now: i64,
    bump: u8,
) -> ClientResult<BridgeRequest> {
    global.ensure_initialized()?;
    chains.require(transfer.target_chain)?;
    ensure_positive(transfer.amount)?;
    user.ensure_owner(signer)?;
    user.ensure_available(transfer.amount)?;

    let user_pending = add(
        "pending_cross_chain_transfers",
        user.pending_cross_chain_transfers,
        transfer.amount,
    )?;
    let global_pending = add(
        "pending_cross_chain_amount",
        global.pending_cross_chain_amount,
        transfer.amount,
    )?;

    user.pending_cross_chain_transfers = user_pending;
    global.pending_cross_chain_amount = global_pending;
    Ok(BridgeRequest::open(
        user.user,
        transfer.target_chain,
        transfer.amount,
        transfer.target_address,
        now,
        bump,
    ))
}

/// Record the terminal outcome of a bridge request.
///
/// Either outcome releases the earmark. Success also counts the amount
/// toward the cross-chain totals.
pub fn complete_transfer(
    global: &mut GlobalState,
    user: &mut UserState,
    request: &mut BridgeRequest,
    signer: &Pubkey,
    outcome: BridgeOutcome,
    now: i64,
) -> ClientResult<()> {
    global.ensure_initialized()?;
    global.ensure_authority(signer)?;
    if request.user != user.user {
        return Err(ClientError::schema(
            "BridgeRequest",
            format!("request belongs to {}, not {}", request.user, user.user),
        ));
    }

    let mut finished = request.clone();
    finished.finalize(outcome, now)?;

    let user_pending = sub(
        "pending_cross_chain_transfers",
        user.pending_cross_chain_transfers,
        request.amount,
    )?;
    let global_pending = sub(
        "pending_cross_chain_amount",
        global.pending_cross_chain_amount,
        request.amount,
    )?;
    let (user_bridged, global_bridged) = if outcome.is_success() {
        (
            add("cross_chain_deposits", user.cross_chain_deposits, request.amount)?,
            add(
                "total_cross_chain_deposits",
                global.total_cross_chain_deposits,
                request.amount,
            )?,
        )
    } else {
        (user.cross_chain_deposits, global.total_cross_chain_deposits)
    };

    user.pending_cross_chain_transfers = user_pending;
    user.cross_chain_deposits = user_bridged;
    global.pending_cross_chain_amount = global_pending;
    global.total_cross_chain_deposits = global_bridged;
    *request = finished;
    Ok(())
}
