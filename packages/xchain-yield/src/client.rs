//! Instruction client
//!
//! Every state-changing operation follows the same path:
//!
//! 1. parse and validate user input (amounts, chain, target address)
//! 2. fetch and decode the accounts the instruction touches
//! 3. run the program's transition locally; any failed precondition is
//!    returned here and nothing is submitted
//! 4. build the instruction, submit it, and wait for confirmation
//!
//! The returned [`Receipt`] carries the signature and the state the
//! transition projects. A confirmation that never arrives is reported as
//! [`ClientError::OutcomeUnknown`]; the client never retries on its own.

use serde::Serialize;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::amount::AmountCodec;
use crate::bridge::{BridgeOutcome, BridgeRequestId};
use crate::chains::{ChainInfo, ChainRegistry};
use crate::clock::Clock;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::instruction::{InstructionBuilder, YieldInstruction};
use crate::pda::{AddressBook, RequestKeying};
use crate::processor::{self, TransferRequest, YieldRates};
use crate::state::{BridgeRequest, GlobalState, OracleData, ProgramAccount, UserState};
use crate::transport::{Confirmation, Transport, TransportError};

/// Everything an operation needs, passed explicitly
#[derive(Clone)]
pub struct ClientContext {
    pub program_id: Pubkey,
    pub amounts: AmountCodec,
    pub mint: Option<Pubkey>,
    pub chains: ChainRegistry,
    pub keying: RequestKeying,
    pub transport: Arc<dyn Transport>,
    pub clock: Arc<dyn Clock>,
}

impl ClientContext {
    pub fn from_config(
        config: &ClientConfig,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> eyre::Result<Self> {
        Ok(Self {
            program_id: config.program_id,
            amounts: config.amount_codec()?,
            mint: config.token_mint,
            chains: config.chains.clone(),
            keying: config.request_keying,
            transport,
            clock,
        })
    }
}

/// Result of a confirmed operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub signature: Signature,
    /// Base units moved or paid out; zero for admin operations
    pub amount: u64,
    pub global: GlobalState,
    pub user: Option<UserState>,
    pub bridge: Option<(BridgeRequestId, BridgeRequest)>,
}

/// Current yield for one supported chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainYield {
    pub chain: ChainInfo,
    pub rate_bps: u64,
    pub apy_bps: u64,
}

pub struct YieldClient {
    ctx: ClientContext,
    book: AddressBook,
    builder: InstructionBuilder,
}

impl YieldClient {
    pub fn new(ctx: ClientContext) -> Self {
        let book = AddressBook::with_keying(ctx.program_id, ctx.keying);
        let builder = InstructionBuilder::new(book, ctx.mint);
        Self { ctx, book, builder }
    }

    pub fn context(&self) -> &ClientContext {
        &self.ctx
    }

    pub fn addresses(&self) -> &AddressBook {
        &self.book
    }

    /// Render base units as decimal text.
    pub fn format_amount(&self, base_units: u64) -> String {
        self.ctx.amounts.format(base_units)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    async fn fetch<T: ProgramAccount>(&self, address: &Pubkey) -> ClientResult<Option<T>> {
        let data = self
            .ctx
            .transport
            .fetch_account(address)
            .await
            .map_err(|e| ClientError::NetworkFailure(e.to_string()))?;
        debug!(
            kind = T::NAME,
            address = %address,
            found = data.is_some(),
            "Fetched account"
        );
        data.map(|bytes| T::decode(&bytes)).transpose()
    }

    /// Initialized global state. A missing account means the program was
    /// never initialized.
    pub async fn global_state(&self) -> ClientResult<GlobalState> {
        let address = self.book.global_state().address;
        let global = self
            .fetch::<GlobalState>(&address)
            .await?
            .ok_or(ClientError::NotInitialized)?;
        global.ensure_initialized()?;
        Ok(global)
    }

    pub async fn user_state(&self, user: &Pubkey) -> ClientResult<Option<UserState>> {
        self.fetch(&self.book.user_state(user).address).await
    }

    /// The user's state, or a fresh empty one if they never deposited.
    async fn user_state_or_empty(&self, user: &Pubkey) -> ClientResult<UserState> {
        Ok(self
            .user_state(user)
            .await?
            .unwrap_or_else(|| UserState::new(*user, self.book.user_state(user).bump)))
    }

    pub async fn bridge_request(
        &self,
        id: &BridgeRequestId,
    ) -> ClientResult<Option<BridgeRequest>> {
        let address = self.book.bridge_request_at(id)?.address;
        self.fetch(&address).await
    }

    async fn require_bridge_request(&self, id: &BridgeRequestId) -> ClientResult<BridgeRequest> {
        let address = self.book.bridge_request_at(id)?.address;
        self.fetch(&address)
            .await?
            .ok_or(ClientError::AccountNotFound {
                kind: BridgeRequest::NAME,
                address,
            })
    }

    /// All of a user's bridge requests in sequence order. Per-user keying
    /// holds at most one.
    pub async fn bridge_requests(
        &self,
        user: &Pubkey,
    ) -> ClientResult<Vec<(BridgeRequestId, BridgeRequest)>> {
        let mut requests = Vec::new();
        for sequence in 0.. {
            let id = BridgeRequestId::new(*user, sequence);
            match self.bridge_request(&id).await? {
                Some(request) => requests.push((id, request)),
                None => break,
            }
            if self.book.keying() == RequestKeying::PerUser {
                break;
            }
        }
        Ok(requests)
    }

    async fn account_exists(&self, address: &Pubkey) -> ClientResult<bool> {
        Ok(self
            .ctx
            .transport
            .fetch_account(address)
            .await
            .map_err(|e| ClientError::NetworkFailure(e.to_string()))?
            .is_some())
    }

    /// Sequence the user's next bridge request will take. Under per-user
    /// keying a user whose request account exists cannot open another.
    pub async fn next_bridge_sequence(&self, user: &Pubkey) -> ClientResult<u64> {
        if self.book.keying() == RequestKeying::PerUser {
            let address = self.book.bridge_request(user).address;
            if self.account_exists(&address).await? {
                return Err(ClientError::BridgeRequestExists { address });
            }
            return Ok(0);
        }

        let mut sequence = 0u64;
        loop {
            let address = self.book.sequenced_bridge_request(user, sequence).address;
            if !self.account_exists(&address).await? {
                return Ok(sequence);
            }
            sequence = sequence
                .checked_add(1)
                .ok_or(ClientError::Overflow { field: "bridge_sequence" })?;
        }
    }

    /// Yield the user could claim right now, in base units.
    pub async fn pending_yield(&self, user: &Pubkey) -> ClientResult<u64> {
        let global = self.global_state().await?;
        let state = self.user_state_or_empty(user).await?;
        Ok(processor::pending_yield(&global, &state, self.ctx.clock.now()))
    }

    /// Rate and APY per supported chain. Oracle slots win; an empty slot
    /// falls back to the global per-chain rates.
    pub async fn chain_yields(&self) -> ClientResult<Vec<ChainYield>> {
        let global = self.global_state().await?;
        let oracle = &global.oracle_data;
        Ok(self
            .ctx
            .chains
            .iter()
            .map(|chain| {
                let rate_bps = oracle
                    .yield_rate(chain.id)
                    .filter(|rate| *rate > 0)
                    .or_else(|| global.base_yield_rate(chain.id))
                    .unwrap_or(0);
                let apy_bps = oracle
                    .apy(chain.id)
                    .filter(|apy| *apy > 0)
                    .unwrap_or(rate_bps);
                ChainYield {
                    chain: chain.clone(),
                    rate_bps,
                    apy_bps,
                }
            })
            .collect())
    }

    /// Apply a relayer's `Processing` report to the current request. The
    /// result is local only and never submitted.
    pub async fn record_processing(&self, id: &BridgeRequestId) -> ClientResult<BridgeRequest> {
        let mut request = self.require_bridge_request(id).await?;
        request.mark_processing()?;
        info!(request = %id, status = %request.status, "Recorded relayer status");
        Ok(request)
    }

    // ------------------------------------------------------------------
    // Submission
    // ------------------------------------------------------------------

    async fn send(
        &self,
        operation: &'static str,
        instruction: Instruction,
        signer: &Pubkey,
    ) -> ClientResult<Signature> {
        info!(
            operation,
            signer = %signer,
            accounts = instruction.accounts.len(),
            "Submitting instruction"
        );

        let signature = self
            .ctx
            .transport
            .submit(instruction, signer)
            .await
            .map_err(|e| match e {
                TransportError::Timeout(_) => ClientError::OutcomeUnknown {
                    signature: "unknown".to_string(),
                    reason: e.to_string(),
                },
                other => ClientError::NetworkFailure(other.to_string()),
            })?;

        let outcome = self
            .ctx
            .transport
            .confirm(&signature)
            .await
            .unwrap_or_else(|e| Confirmation::Unknown(e.to_string()));

        match outcome {
            Confirmation::Confirmed => {
                info!(operation, signature = %signature, "Instruction confirmed");
                Ok(signature)
            }
            Confirmation::Rejected(reason) => {
                warn!(operation, signature = %signature, reason = %reason, "Instruction rejected");
                Err(ClientError::ConfirmationFailed {
                    signature: signature.to_string(),
                    reason,
                })
            }
            Confirmation::Unknown(reason) => {
                warn!(operation, signature = %signature, reason = %reason, "Outcome unknown");
                Err(ClientError::OutcomeUnknown {
                    signature: signature.to_string(),
                    reason,
                })
            }
        }
    }

    fn rejected_locally(operation: &'static str, error: ClientError) -> ClientError {
        debug!(operation, error = %error, "Rejected before submission");
        error
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Create the global state with `authority` as the admin.
    pub async fn initialize(&self, authority: &Pubkey) -> ClientResult<Receipt> {
        let key = self.book.global_state();
        let existing = self.fetch::<GlobalState>(&key.address).await?;
        let global = processor::initialize(existing.as_ref(), *authority, key.bump)
            .map_err(|e| Self::rejected_locally("initialize", e))?;

        let signature = self
            .send("initialize", self.builder.initialize(authority)?, authority)
            .await?;
        Ok(Receipt {
            signature,
            amount: 0,
            global,
            user: None,
            bridge: None,
        })
    }

    /// Deposit `amount` (decimal text) from `token_account` into the vault.
    pub async fn deposit(
        &self,
        user: &Pubkey,
        token_account: &Pubkey,
        amount: &str,
    ) -> ClientResult<Receipt> {
        let amount = self.ctx.amounts.parse_positive(amount)?;
        let mut global = self.global_state().await?;
        let mut state = self.user_state_or_empty(user).await?;
        processor::deposit(&mut global, &mut state, user, amount, self.ctx.clock.now())
            .map_err(|e| Self::rejected_locally("deposit", e))?;

        info!(user = %user, amount, "Depositing");
        let instruction = self.builder.deposit(user, token_account, amount)?;
        let signature = self.send("deposit", instruction, user).await?;
        Ok(Receipt {
            signature,
            amount,
            global,
            user: Some(state),
            bridge: None,
        })
    }

    /// Withdraw `amount` (decimal text) of available principal.
    pub async fn withdraw(
        &self,
        user: &Pubkey,
        token_account: &Pubkey,
        amount: &str,
    ) -> ClientResult<Receipt> {
        let amount = self.ctx.amounts.parse_positive(amount)?;
        let mut global = self.global_state().await?;
        let mut state = self.user_state_or_empty(user).await?;
        processor::withdraw(&mut global, &mut state, user, amount, self.ctx.clock.now())
            .map_err(|e| Self::rejected_locally("withdraw", e))?;

        info!(user = %user, amount, "Withdrawing");
        let instruction = self.builder.withdraw(user, token_account, amount)?;
        let signature = self.send("withdraw", instruction, user).await?;
        Ok(Receipt {
            signature,
            amount,
            global,
            user: Some(state),
            bridge: None,
        })
    }

    /// Claim all yield accrued since the last claim.
    pub async fn claim_yield(
        &self,
        user: &Pubkey,
        token_account: &Pubkey,
    ) -> ClientResult<Receipt> {
        let mut global = self.global_state().await?;
        let mut state = self.user_state_or_empty(user).await?;
        let amount = processor::claim_yield(&mut global, &mut state, user, self.ctx.clock.now())
            .map_err(|e| Self::rejected_locally("claim_yield", e))?;

        info!(user = %user, amount, "Claiming yield");
        let instruction = self.builder.claim_yield(user, token_account)?;
        let signature = self.send("claim_yield", instruction, user).await?;
        Ok(Receipt {
            signature,
            amount,
            global,
            user: Some(state),
            bridge: None,
        })
    }

    /// Open a bridge request moving `amount` to `target_address` on
    /// `target_chain`. The amount is earmarked until completion.
    pub async fn initiate_cross_chain_transfer(
        &self,
        user: &Pubkey,
        target_chain: u8,
        amount: &str,
        target_address: &str,
    ) -> ClientResult<Receipt> {
        let chain = self.ctx.chains.require(target_chain)?;
        let amount = self.ctx.amounts.parse_positive(amount)?;
        let target_address = chain.address_kind.parse_address(target_address)?;

        let mut global = self.global_state().await?;
        let mut state = self.user_state_or_empty(user).await?;
        let sequence = self
            .next_bridge_sequence(user)
            .await
            .map_err(|e| Self::rejected_locally("initiate_cross_chain_transfer", e))?;
        let id = BridgeRequestId::new(*user, sequence);
        let key = self.book.bridge_request_at(&id)?;
        let transfer = TransferRequest {
            target_chain,
            amount,
            target_address,
        };
        let request = processor::initiate_transfer(
            &mut global,
            &mut state,
            user,
            &self.ctx.chains,
            transfer,
            self.ctx.clock.now(),
            key.bump,
        )
        .map_err(|e| Self::rejected_locally("initiate_cross_chain_transfer", e))?;

        info!(
            request = %id,
            target_chain = %chain,
            amount,
            "Initiating cross-chain transfer"
        );
        let instruction =
            self.builder
                .initiate_cross_chain_transfer(&id, target_chain, amount, target_address)?;
        let signature = self
            .send("initiate_cross_chain_transfer", instruction, user)
            .await?;
        Ok(Receipt {
            signature,
            amount,
            global,
            user: Some(state),
            bridge: Some((id, request)),
        })
    }

    /// Record the terminal outcome of a bridge request. Authority only.
    pub async fn complete_cross_chain_transfer(
        &self,
        authority: &Pubkey,
        id: &BridgeRequestId,
        success: bool,
    ) -> ClientResult<Receipt> {
        let mut global = self.global_state().await?;
        let mut request = self.require_bridge_request(id).await?;
        let mut state = self
            .user_state(&id.user)
            .await?
            .ok_or(ClientError::AccountNotFound {
                kind: UserState::NAME,
                address: self.book.user_state(&id.user).address,
            })?;
        processor::complete_transfer(
            &mut global,
            &mut state,
            &mut request,
            authority,
            BridgeOutcome::from_success(success),
            self.ctx.clock.now(),
        )
        .map_err(|e| Self::rejected_locally("complete_cross_chain_transfer", e))?;

        info!(request = %id, success, amount = request.amount, "Completing cross-chain transfer");
        let instruction = self
            .builder
            .complete_cross_chain_transfer(authority, id, success)?;
        let signature = self
            .send("complete_cross_chain_transfer", instruction, authority)
            .await?;
        Ok(Receipt {
            signature,
            amount: request.amount,
            global,
            user: Some(state),
            bridge: Some((*id, request)),
        })
    }

    async fn admin(
        &self,
        authority: &Pubkey,
        instruction: YieldInstruction,
        apply: impl FnOnce(&mut GlobalState, i64) -> ClientResult<()>,
    ) -> ClientResult<Receipt> {
        let operation = instruction.name();
        let mut global = self.global_state().await?;
        apply(&mut global, self.ctx.clock.now())
            .map_err(|e| Self::rejected_locally(operation, e))?;

        let signature = self
            .send(operation, self.builder.admin(authority, &instruction)?, authority)
            .await?;
        Ok(Receipt {
            signature,
            amount: 0,
            global,
            user: None,
            bridge: None,
        })
    }

    /// Hand the admin role to `new_authority`.
    pub async fn set_authority(
        &self,
        authority: &Pubkey,
        new_authority: &Pubkey,
    ) -> ClientResult<Receipt> {
        let new_authority = *new_authority;
        self.admin(
            authority,
            YieldInstruction::SetAuthority { new_authority },
            |global, _| processor::set_authority(global, authority, new_authority),
        )
        .await
    }

    pub async fn update_yield_data(
        &self,
        authority: &Pubkey,
        rates: YieldRates,
    ) -> ClientResult<Receipt> {
        self.admin(
            authority,
            YieldInstruction::UpdateYieldData {
                solana_yield: rates.solana,
                ethereum_yield: rates.ethereum,
                polygon_yield: rates.polygon,
            },
            |global, now| processor::update_yield_data(global, authority, rates, now),
        )
        .await
    }

    pub async fn update_oracle_data(
        &self,
        authority: &Pubkey,
        oracle: OracleData,
    ) -> ClientResult<Receipt> {
        let chains = &self.ctx.chains;
        self.admin(
            authority,
            YieldInstruction::UpdateOracleData {
                oracle_data: oracle.clone(),
            },
            |global, now| processor::update_oracle_data(global, authority, chains, oracle, now),
        )
        .await
    }
}
