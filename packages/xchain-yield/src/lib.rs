//! xchain-yield: Client Core for the Cross-Chain Yield Aggregator
//!
//! This crate holds everything a caller needs to drive the on-chain yield
//! aggregator program:
//!
//! - **Amounts** - Exact decimal text <-> base unit conversion
//! - **Addresses** - Program-derived addresses for every program account
//! - **State** - Typed account schemas with discriminator-checked decoding
//! - **Instructions** - Instruction data and account lists for every
//!   program method
//! - **Bridge** - The bridge request lifecycle state machine
//! - **Client** - Validate, project, submit and confirm each operation over
//!   a pluggable [`Transport`]
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! xchain-yield = { path = "../xchain-yield" }
//! ```
//!
//! ```ignore
//! let config = ClientConfig::load()?;
//! let ctx = ClientContext::from_config(&config, transport, Arc::new(SystemClock))?;
//! let client = YieldClient::new(ctx);
//! let receipt = client.deposit(&user, &token_account, "100.5").await?;
//! ```

pub mod accrual;
pub mod amount;
pub mod bridge;
pub mod chains;
pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod instruction;
pub mod pda;
pub mod processor;
pub mod state;
pub mod transport;

// Re-export commonly used items at the crate root
pub use amount::{format_amount, parse_amount, AmountCodec};
pub use bridge::{BridgeOutcome, BridgeRequestId, BridgeStatus};
pub use chains::{AddressKind, ChainInfo, ChainRegistry};
pub use client::{ChainYield, ClientContext, Receipt, YieldClient};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use instruction::{InstructionBuilder, YieldInstruction};
pub use pda::{AddressBook, ProgramAddress, RequestKeying};
pub use processor::YieldRates;
pub use state::{AccountData, BridgeRequest, GlobalState, OracleData, ProgramAccount, UserState};
pub use transport::{Confirmation, MemoryTransport, Transport, TransportError};
