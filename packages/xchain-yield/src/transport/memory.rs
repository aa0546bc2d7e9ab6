//! In-process ledger that executes aggregator instructions
//!
//! Accounts are held as raw bytes keyed by address and every instruction
//! is decoded and run through [`crate::processor`], so the client's codecs
//! and account lists are exercised end to end. Execution is atomic: all of
//! an instruction's account writes land together or not at all.
//!
//! Token movements to and from the vault are not modelled. Outcomes are
//! kept until `confirm` reads them once.

use async_trait::async_trait;
use solana_sdk::hash::hashv;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{Confirmation, Transport, TransportError};
use crate::bridge::{BridgeOutcome, BridgeRequestId};
use crate::chains::ChainRegistry;
use crate::clock::Clock;
use crate::error::{ClientError, ClientResult};
use crate::instruction::YieldInstruction;
use crate::pda::{AddressBook, ProgramAddress, RequestKeying};
use crate::processor::{self, TransferRequest, YieldRates};
use crate::state::{BridgeRequest, GlobalState, ProgramAccount, UserState, DISCRIMINATOR_LEN};

#[derive(Default)]
struct Ledger {
    accounts: HashMap<Pubkey, Vec<u8>>,
    outcomes: HashMap<Signature, Confirmation>,
    submitted: u64,
}

/// Account writes produced by one instruction
type Writes = Vec<(Pubkey, Vec<u8>)>;

pub struct MemoryTransport {
    book: AddressBook,
    chains: ChainRegistry,
    clock: Arc<dyn Clock>,
    ledger: Mutex<Ledger>,
    fail_submits: AtomicBool,
    drop_confirmations: AtomicBool,
}

impl MemoryTransport {
    pub fn new(program_id: Pubkey, chains: ChainRegistry, clock: Arc<dyn Clock>) -> Self {
        Self {
            book: AddressBook::new(program_id),
            chains,
            clock,
            ledger: Mutex::new(Ledger::default()),
            fail_submits: AtomicBool::new(false),
            drop_confirmations: AtomicBool::new(false),
        }
    }

    /// Key bridge requests the way `keying` says instead of per user.
    pub fn with_keying(mut self, keying: RequestKeying) -> Self {
        self.book = AddressBook::with_keying(*self.book.program_id(), keying);
        self
    }

    /// While set, `submit` fails with a connection error before anything
    /// reaches the ledger.
    pub fn set_fail_submits(&self, fail: bool) {
        self.fail_submits.store(fail, Ordering::SeqCst);
    }

    /// While set, `confirm` reports [`Confirmation::Unknown`] even though
    /// submitted instructions still execute.
    pub fn set_drop_confirmations(&self, drop: bool) {
        self.drop_confirmations.store(drop, Ordering::SeqCst);
    }

    /// Overwrite raw account bytes.
    pub async fn set_account(&self, address: Pubkey, data: Vec<u8>) {
        self.ledger.lock().await.accounts.insert(address, data);
    }

    pub async fn account(&self, address: &Pubkey) -> Option<Vec<u8>> {
        self.ledger.lock().await.accounts.get(address).cloned()
    }

    /// Every stored account of kind `T`, by address.
    pub async fn accounts_of<T: ProgramAccount>(&self) -> ClientResult<Vec<(Pubkey, T)>> {
        let ledger = self.ledger.lock().await;
        let tag = T::discriminator();
        ledger
            .accounts
            .iter()
            .filter(|(_, data)| data.get(..DISCRIMINATOR_LEN) == Some(&tag[..]))
            .map(|(address, data)| T::decode(data).map(|account| (*address, account)))
            .collect()
    }

    /// Number of instructions that reached the ledger, executed or not.
    pub async fn submitted_count(&self) -> u64 {
        self.ledger.lock().await.submitted
    }

    /// Outcomes submitted but not yet read by `confirm`.
    pub async fn unconfirmed_count(&self) -> usize {
        self.ledger.lock().await.outcomes.len()
    }

    /// Account the signer's next bridge request is created at.
    fn next_request_key(
        &self,
        accounts: &HashMap<Pubkey, Vec<u8>>,
        user: &Pubkey,
    ) -> ClientResult<ProgramAddress> {
        match self.book.keying() {
            RequestKeying::PerUser => {
                let key = self.book.bridge_request(user);
                if accounts.contains_key(&key.address) {
                    return Err(ClientError::BridgeRequestExists {
                        address: key.address,
                    });
                }
                Ok(key)
            }
            RequestKeying::Sequenced => {
                let sequence = (0..)
                    .find(|seq| {
                        let key = self.book.sequenced_bridge_request(user, *seq);
                        !accounts.contains_key(&key.address)
                    })
                    .ok_or(ClientError::Overflow {
                        field: "bridge_sequence",
                    })?;
                Ok(self.book.sequenced_bridge_request(user, sequence))
            }
        }
    }

    fn signature_for(&self, sequence: u64, instruction: &Instruction) -> Signature {
        let seq = sequence.to_le_bytes();
        let first = hashv(&[
            self.book.program_id().as_ref(),
            seq.as_slice(),
            instruction.data.as_slice(),
        ]);
        let second = hashv(&[first.as_ref(), seq.as_slice()]);
        let mut bytes = [0u8; 64];
        bytes[..32].copy_from_slice(first.as_ref());
        bytes[32..].copy_from_slice(second.as_ref());
        Signature::from(bytes)
    }

    fn execute(
        &self,
        accounts: &HashMap<Pubkey, Vec<u8>>,
        instruction: &Instruction,
        signer: &Pubkey,
    ) -> ClientResult<Writes> {
        if instruction.program_id != *self.book.program_id() {
            return Err(ClientError::schema(
                "instruction",
                format!("unknown program {}", instruction.program_id),
            ));
        }
        let signed = instruction
            .accounts
            .iter()
            .any(|meta| meta.is_signer && meta.pubkey == *signer);
        if !signed {
            return Err(ClientError::schema(
                "instruction",
                format!("{} is not a signer of this instruction", signer),
            ));
        }

        let now = self.clock.now();
        let global_key = self.book.global_state();
        let ix = YieldInstruction::unpack(&instruction.data)?;
        debug!(instruction = ix.name(), signer = %signer, "Executing instruction");

        match ix {
            YieldInstruction::Initialize => {
                expect_account(instruction, 0, &global_key.address)?;
                let existing = load::<GlobalState>(accounts, &global_key.address)?;
                let global = processor::initialize(existing.as_ref(), *signer, global_key.bump)?;
                Ok(vec![(global_key.address, global.encode()?)])
            }
            YieldInstruction::Deposit { amount } => {
                let user_key = self.book.user_state(signer);
                expect_account(instruction, 0, &user_key.address)?;
                expect_account(instruction, 1, &global_key.address)?;
                let mut global = require::<GlobalState>(accounts, &global_key.address)?;
                let mut user = load::<UserState>(accounts, &user_key.address)?
                    .unwrap_or_else(|| UserState::new(*signer, user_key.bump));
                processor::deposit(&mut global, &mut user, signer, amount, now)?;
                Ok(vec![
                    (user_key.address, user.encode()?),
                    (global_key.address, global.encode()?),
                ])
            }
            YieldInstruction::Withdraw { amount } => {
                let (user_address, mut global, mut user) =
                    self.load_position(accounts, instruction, signer)?;
                processor::withdraw(&mut global, &mut user, signer, amount, now)?;
                Ok(vec![
                    (user_address, user.encode()?),
                    (global_key.address, global.encode()?),
                ])
            }
            YieldInstruction::ClaimYield => {
                let (user_address, mut global, mut user) =
                    self.load_position(accounts, instruction, signer)?;
                let paid = processor::claim_yield(&mut global, &mut user, signer, now)?;
                debug!(user = %signer, paid, "Yield claimed");
                Ok(vec![
                    (user_address, user.encode()?),
                    (global_key.address, global.encode()?),
                ])
            }
            YieldInstruction::SetAuthority { new_authority } => {
                let mut global = self.load_global_for_admin(accounts, instruction)?;
                processor::set_authority(&mut global, signer, new_authority)?;
                Ok(vec![(global_key.address, global.encode()?)])
            }
            YieldInstruction::UpdateYieldData {
                solana_yield,
                ethereum_yield,
                polygon_yield,
            } => {
                let mut global = self.load_global_for_admin(accounts, instruction)?;
                let rates = YieldRates {
                    solana: solana_yield,
                    ethereum: ethereum_yield,
                    polygon: polygon_yield,
                };
                processor::update_yield_data(&mut global, signer, rates, now)?;
                Ok(vec![(global_key.address, global.encode()?)])
            }
            YieldInstruction::UpdateOracleData { oracle_data } => {
                let mut global = self.load_global_for_admin(accounts, instruction)?;
                processor::update_oracle_data(&mut global, signer, &self.chains, oracle_data, now)?;
                Ok(vec![(global_key.address, global.encode()?)])
            }
            YieldInstruction::InitiateCrossChainTransfer {
                target_chain,
                amount,
                target_address,
            } => {
                let request_key = self.next_request_key(accounts, signer)?;
                let user_key = self.book.user_state(signer);
                expect_account(instruction, 0, &request_key.address)?;
                expect_account(instruction, 1, &user_key.address)?;
                expect_account(instruction, 2, &global_key.address)?;

                let mut global = require::<GlobalState>(accounts, &global_key.address)?;
                let mut user = require::<UserState>(accounts, &user_key.address)?;
                let transfer = TransferRequest {
                    target_chain,
                    amount,
                    target_address,
                };
                let request = processor::initiate_transfer(
                    &mut global,
                    &mut user,
                    signer,
                    &self.chains,
                    transfer,
                    now,
                    request_key.bump,
                )?;
                Ok(vec![
                    (request_key.address, request.encode()?),
                    (user_key.address, user.encode()?),
                    (global_key.address, global.encode()?),
                ])
            }
            YieldInstruction::CompleteCrossChainTransfer {
                bridge_request_id,
                success,
            } => {
                let request_address = account_at(instruction, 0)?;
                let mut request = require::<BridgeRequest>(accounts, &request_address)?;
                let id = BridgeRequestId::new(request.user, bridge_request_id);
                expect_account(instruction, 0, &self.book.bridge_request_at(&id)?.address)?;
                let user_address = self.book.user_state(&request.user).address;
                expect_account(instruction, 1, &user_address)?;
                expect_account(instruction, 2, &global_key.address)?;

                let mut global = require::<GlobalState>(accounts, &global_key.address)?;
                let mut user = require::<UserState>(accounts, &user_address)?;
                processor::complete_transfer(
                    &mut global,
                    &mut user,
                    &mut request,
                    signer,
                    BridgeOutcome::from_success(success),
                    now,
                )?;
                Ok(vec![
                    (request_address, request.encode()?),
                    (user_address, user.encode()?),
                    (global_key.address, global.encode()?),
                ])
            }
        }
    }

    fn load_position(
        &self,
        accounts: &HashMap<Pubkey, Vec<u8>>,
        instruction: &Instruction,
        signer: &Pubkey,
    ) -> ClientResult<(Pubkey, GlobalState, UserState)> {
        let user_address = self.book.user_state(signer).address;
        let global_address = self.book.global_state().address;
        expect_account(instruction, 0, &user_address)?;
        expect_account(instruction, 1, &global_address)?;
        let global = require::<GlobalState>(accounts, &global_address)?;
        let user = require::<UserState>(accounts, &user_address)?;
        Ok((user_address, global, user))
    }

    fn load_global_for_admin(
        &self,
        accounts: &HashMap<Pubkey, Vec<u8>>,
        instruction: &Instruction,
    ) -> ClientResult<GlobalState> {
        let global_address = self.book.global_state().address;
        expect_account(instruction, 0, &global_address)?;
        require::<GlobalState>(accounts, &global_address)
    }
}

fn load<T: ProgramAccount>(
    accounts: &HashMap<Pubkey, Vec<u8>>,
    address: &Pubkey,
) -> ClientResult<Option<T>> {
    accounts.get(address).map(|data| T::decode(data)).transpose()
}

fn require<T: ProgramAccount>(
    accounts: &HashMap<Pubkey, Vec<u8>>,
    address: &Pubkey,
) -> ClientResult<T> {
    load(accounts, address)?.ok_or(ClientError::AccountNotFound {
        kind: T::NAME,
        address: *address,
    })
}

fn account_at(instruction: &Instruction, index: usize) -> ClientResult<Pubkey> {
    instruction
        .accounts
        .get(index)
        .map(|meta| meta.pubkey)
        .ok_or_else(|| ClientError::schema("instruction", format!("missing account {}", index)))
}

fn expect_account(instruction: &Instruction, index: usize, expected: &Pubkey) -> ClientResult<()> {
    let actual = account_at(instruction, index)?;
    if actual != *expected {
        return Err(ClientError::schema(
            "instruction",
            format!("account {} is {}, expected {}", index, actual, expected),
        ));
    }
    Ok(())
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn fetch_account(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(self.account(address).await)
    }

    async fn submit(
        &self,
        instruction: Instruction,
        signer: &Pubkey,
    ) -> Result<Signature, TransportError> {
        if self.fail_submits.load(Ordering::SeqCst) {
            return Err(TransportError::Connection("memory transport offline".into()));
        }

        let mut ledger = self.ledger.lock().await;
        ledger.submitted += 1;
        let signature = self.signature_for(ledger.submitted, &instruction);

        let result = self.execute(&ledger.accounts, &instruction, signer);
        let outcome = match result {
            Ok(writes) => {
                ledger.accounts.extend(writes);
                Confirmation::Confirmed
            }
            Err(e) => {
                warn!(signature = %signature, error = %e, "Instruction rejected");
                Confirmation::Rejected(e.to_string())
            }
        };
        ledger.outcomes.insert(signature, outcome);
        Ok(signature)
    }

    async fn confirm(&self, signature: &Signature) -> Result<Confirmation, TransportError> {
        if self.drop_confirmations.load(Ordering::SeqCst) {
            return Ok(Confirmation::Unknown("confirmation dropped".into()));
        }
        let mut ledger = self.ledger.lock().await;
        Ok(ledger
            .outcomes
            .remove(signature)
            .unwrap_or_else(|| Confirmation::Unknown(format!("{} not found", signature))))
    }
}
