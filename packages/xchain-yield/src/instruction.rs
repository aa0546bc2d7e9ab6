//! Instruction encoding
//!
//! Instruction data is
//!
//! ```text
//! | sha256("global:<snake_name>")[..8] | borsh-encoded arguments |
//! ```
//!
//! and the account lists follow the program's expected order. The
//! builders here are pure; submitting is the transport's job.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::hash::hashv;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_program;

use crate::bridge::BridgeRequestId;
use crate::error::{ClientError, ClientResult};
use crate::pda::AddressBook;
use crate::state::OracleData;

/// SPL token program
pub const TOKEN_PROGRAM_ID: Pubkey =
    solana_sdk::pubkey!("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");

const SIGHASH_LEN: usize = 8;

/// Compute the 8-byte instruction selector.
pub fn sighash(name: &str) -> [u8; SIGHASH_LEN] {
    let hash = hashv(&[b"global:", name.as_bytes()]);
    let mut out = [0u8; SIGHASH_LEN];
    out.copy_from_slice(&hash.to_bytes()[..SIGHASH_LEN]);
    out
}

/// Every instruction the aggregator program accepts, with its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum YieldInstruction {
    Initialize,
    Deposit {
        amount: u64,
    },
    Withdraw {
        amount: u64,
    },
    UpdateYieldData {
        solana_yield: u64,
        ethereum_yield: u64,
        polygon_yield: u64,
    },
    ClaimYield,
    SetAuthority {
        new_authority: Pubkey,
    },
    InitiateCrossChainTransfer {
        target_chain: u8,
        amount: u64,
        target_address: [u8; 32],
    },
    CompleteCrossChainTransfer {
        bridge_request_id: u64,
        success: bool,
    },
    UpdateOracleData {
        oracle_data: OracleData,
    },
}

const ALL_NAMES: [&str; 9] = [
    "initialize",
    "deposit",
    "withdraw",
    "update_yield_data",
    "claim_yield",
    "set_authority",
    "initiate_cross_chain_transfer",
    "complete_cross_chain_transfer",
    "update_oracle_data",
];

impl YieldInstruction {
    /// Snake-case program method name
    pub fn name(&self) -> &'static str {
        match self {
            YieldInstruction::Initialize => "initialize",
            YieldInstruction::Deposit { .. } => "deposit",
            YieldInstruction::Withdraw { .. } => "withdraw",
            YieldInstruction::UpdateYieldData { .. } => "update_yield_data",
            YieldInstruction::ClaimYield => "claim_yield",
            YieldInstruction::SetAuthority { .. } => "set_authority",
            YieldInstruction::InitiateCrossChainTransfer { .. } => "initiate_cross_chain_transfer",
            YieldInstruction::CompleteCrossChainTransfer { .. } => "complete_cross_chain_transfer",
            YieldInstruction::UpdateOracleData { .. } => "update_oracle_data",
        }
    }

    /// Encode selector and arguments.
    pub fn pack(&self) -> ClientResult<Vec<u8>> {
        let mut data = sighash(self.name()).to_vec();
        let written = match self {
            YieldInstruction::Initialize | YieldInstruction::ClaimYield => Ok(()),
            YieldInstruction::Deposit { amount } | YieldInstruction::Withdraw { amount } => {
                amount.serialize(&mut data)
            }
            YieldInstruction::UpdateYieldData {
                solana_yield,
                ethereum_yield,
                polygon_yield,
            } => (solana_yield, ethereum_yield, polygon_yield).serialize(&mut data),
            YieldInstruction::SetAuthority { new_authority } => new_authority.serialize(&mut data),
            YieldInstruction::InitiateCrossChainTransfer {
                target_chain,
                amount,
                target_address,
            } => (target_chain, amount, target_address).serialize(&mut data),
            YieldInstruction::CompleteCrossChainTransfer {
                bridge_request_id,
                success,
            } => (bridge_request_id, success).serialize(&mut data),
            YieldInstruction::UpdateOracleData { oracle_data } => oracle_data.serialize(&mut data),
        };
        written.map_err(|e| ClientError::schema("instruction", e.to_string()))?;
        Ok(data)
    }

    /// Decode instruction data produced by [`YieldInstruction::pack`].
    pub fn unpack(data: &[u8]) -> ClientResult<Self> {
        if data.len() < SIGHASH_LEN {
            return Err(ClientError::schema("instruction", "data shorter than selector"));
        }
        let (selector, mut args) = data.split_at(SIGHASH_LEN);
        let name = ALL_NAMES
            .iter()
            .copied()
            .find(|name| selector == sighash(name))
            .ok_or_else(|| {
                ClientError::schema(
                    "instruction",
                    format!("unknown selector 0x{}", hex::encode(selector)),
                )
            })?;

        let parsed = Self::unpack_args(name, &mut args)
            .map_err(|e| ClientError::schema("instruction", format!("{}: {}", name, e)))?;
        if !args.is_empty() {
            return Err(ClientError::schema(
                "instruction",
                format!("{}: {} trailing bytes", name, args.len()),
            ));
        }
        Ok(parsed)
    }

    fn unpack_args(name: &str, args: &mut &[u8]) -> std::io::Result<Self> {
        Ok(match name {
            "initialize" => YieldInstruction::Initialize,
            "claim_yield" => YieldInstruction::ClaimYield,
            "deposit" => YieldInstruction::Deposit {
                amount: u64::deserialize(args)?,
            },
            "withdraw" => YieldInstruction::Withdraw {
                amount: u64::deserialize(args)?,
            },
            "update_yield_data" => {
                let (solana_yield, ethereum_yield, polygon_yield) =
                    <(u64, u64, u64)>::deserialize(args)?;
                YieldInstruction::UpdateYieldData {
                    solana_yield,
                    ethereum_yield,
                    polygon_yield,
                }
            }
            "set_authority" => YieldInstruction::SetAuthority {
                new_authority: Pubkey::deserialize(args)?,
            },
            "initiate_cross_chain_transfer" => {
                let (target_chain, amount, target_address) =
                    <(u8, u64, [u8; 32])>::deserialize(args)?;
                YieldInstruction::InitiateCrossChainTransfer {
                    target_chain,
                    amount,
                    target_address,
                }
            }
            "complete_cross_chain_transfer" => {
                let (bridge_request_id, success) = <(u64, bool)>::deserialize(args)?;
                YieldInstruction::CompleteCrossChainTransfer {
                    bridge_request_id,
                    success,
                }
            }
            "update_oracle_data" => YieldInstruction::UpdateOracleData {
                oracle_data: OracleData::deserialize(args)?,
            },
            other => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("no argument layout for {}", other),
                ))
            }
        })
    }
}

/// Builds program instructions with the correct account lists.
#[derive(Debug, Clone, Copy)]
pub struct InstructionBuilder {
    book: AddressBook,
    mint: Option<Pubkey>,
}

impl InstructionBuilder {
    pub fn new(book: AddressBook, mint: Option<Pubkey>) -> Self {
        Self { book, mint }
    }

    fn build(
        &self,
        ix: &YieldInstruction,
        accounts: Vec<AccountMeta>,
    ) -> ClientResult<Instruction> {
        Ok(Instruction {
            program_id: *self.book.program_id(),
            accounts,
            data: ix.pack()?,
        })
    }

    pub fn initialize(&self, authority: &Pubkey) -> ClientResult<Instruction> {
        self.build(
            &YieldInstruction::Initialize,
            vec![
                AccountMeta::new(self.book.global_state().address, false),
                AccountMeta::new(*authority, true),
                AccountMeta::new_readonly(system_program::ID, false),
            ],
        )
    }

    /// Shared account list of the vault-moving instructions.
    fn vault_accounts(&self, user: &Pubkey, user_token_account: &Pubkey) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.book.user_state(user).address, false),
            AccountMeta::new(self.book.global_state().address, false),
            AccountMeta::new(*user, true),
            AccountMeta::new(*user_token_account, false),
            AccountMeta::new(self.book.vault(self.mint.as_ref()).address, false),
            AccountMeta::new_readonly(TOKEN_PROGRAM_ID, false),
        ]
    }

    pub fn deposit(
        &self,
        user: &Pubkey,
        user_token_account: &Pubkey,
        amount: u64,
    ) -> ClientResult<Instruction> {
        let mut accounts = self.vault_accounts(user, user_token_account);
        accounts.push(AccountMeta::new_readonly(system_program::ID, false));
        self.build(&YieldInstruction::Deposit { amount }, accounts)
    }

    pub fn withdraw(
        &self,
        user: &Pubkey,
        user_token_account: &Pubkey,
        amount: u64,
    ) -> ClientResult<Instruction> {
        self.build(
            &YieldInstruction::Withdraw { amount },
            self.vault_accounts(user, user_token_account),
        )
    }

    pub fn claim_yield(
        &self,
        user: &Pubkey,
        user_token_account: &Pubkey,
    ) -> ClientResult<Instruction> {
        self.build(
            &YieldInstruction::ClaimYield,
            self.vault_accounts(user, user_token_account),
        )
    }

    /// Authority-only instructions that touch nothing but the global state.
    pub fn admin(
        &self,
        authority: &Pubkey,
        ix: &YieldInstruction,
    ) -> ClientResult<Instruction> {
        match ix {
            YieldInstruction::SetAuthority { .. }
            | YieldInstruction::UpdateYieldData { .. }
            | YieldInstruction::UpdateOracleData { .. } => self.build(
                ix,
                vec![
                    AccountMeta::new(self.book.global_state().address, false),
                    AccountMeta::new_readonly(*authority, true),
                ],
            ),
            other => Err(ClientError::schema(
                "instruction",
                format!("{} is not an admin instruction", other.name()),
            )),
        }
    }

    /// Open request `id`, signed by `id.user`. The request account comes
    /// from the address book's keying.
    pub fn initiate_cross_chain_transfer(
        &self,
        id: &BridgeRequestId,
        target_chain: u8,
        amount: u64,
        target_address: [u8; 32],
    ) -> ClientResult<Instruction> {
        let request = self.book.bridge_request_at(id)?;
        let user = &id.user;
        self.build(
            &YieldInstruction::InitiateCrossChainTransfer {
                target_chain,
                amount,
                target_address,
            },
            vec![
                AccountMeta::new(request.address, false),
                AccountMeta::new(self.book.user_state(user).address, false),
                AccountMeta::new(self.book.global_state().address, false),
                AccountMeta::new(*user, true),
                AccountMeta::new_readonly(system_program::ID, false),
            ],
        )
    }

    pub fn complete_cross_chain_transfer(
        &self,
        authority: &Pubkey,
        id: &BridgeRequestId,
        success: bool,
    ) -> ClientResult<Instruction> {
        let request = self.book.bridge_request_at(id)?;
        self.build(
            &YieldInstruction::CompleteCrossChainTransfer {
                bridge_request_id: id.sequence,
                success,
            },
            vec![
                AccountMeta::new(request.address, false),
                AccountMeta::new(self.book.user_state(&id.user).address, false),
                AccountMeta::new(self.book.global_state().address, false),
                AccountMeta::new_readonly(*authority, true),
            ],
        )
    }
}
