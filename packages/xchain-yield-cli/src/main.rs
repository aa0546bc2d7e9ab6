//! Operator CLI for the cross-chain yield aggregator
//!
//! Offline helpers over the client library plus an in-process scenario
//! runner. Results go to stdout as JSON; logs go to stderr.

use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, Result, WrapErr};
use serde_json::json;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use std::str::FromStr;
use std::sync::Arc;

use xchain_yield::accrual::format_bps;
use xchain_yield::{
    AccountData, AddressBook, BridgeRequestId, ClientConfig, ClientContext, Clock, ManualClock,
    MemoryTransport, SystemClock, YieldClient, YieldRates,
};

#[derive(Parser)]
#[command(name = "xchain-yield")]
#[command(about = "Client tooling for the cross-chain yield aggregator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Load configuration from this .env file instead of ./.env
    #[arg(long, global = true)]
    env_file: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the program-derived addresses of the deployment
    Addresses {
        /// Also derive the user state and bridge request addresses of this user
        #[arg(short, long)]
        user: Option<String>,

        /// Bridge request sequence to derive (sequenced keying only)
        #[arg(long, default_value_t = 0)]
        sequence: u64,
    },

    /// Convert decimal text to base units
    ParseAmount { amount: String },

    /// Convert base units to decimal text
    FormatAmount { base_units: u64 },

    /// Decode hex-encoded account data to JSON
    Decode { data: String },

    /// List supported target chains
    Chains,

    /// Run deposit, withdraw and bridge scenarios against an in-memory ledger
    Simulate {
        /// Target chain of the simulated bridge transfer
        #[arg(long, default_value_t = 2)]
        target_chain: u8,

        /// Destination address on the target chain
        #[arg(long, default_value = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266")]
        target_address: String,

        /// Report the simulated transfer as failed
        #[arg(long)]
        fail_transfer: bool,
    },
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,xchain_yield=debug"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_pubkey(text: &str) -> Result<Pubkey> {
    Pubkey::from_str(text.trim()).map_err(|e| eyre!("'{}' is not a public key: {}", text, e))
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging();

    let config = match &cli.env_file {
        Some(path) => ClientConfig::load_from_file(path)?,
        None => ClientConfig::load()?,
    };
    tracing::debug!(?config, "Configuration loaded");

    match cli.command {
        Commands::Addresses { user, sequence } => addresses(&config, user.as_deref(), sequence),
        Commands::ParseAmount { amount } => {
            let base_units = config.amount_codec()?.parse(&amount)?;
            print_json(&json!({ "amount": amount.trim(), "base_units": base_units }))
        }
        Commands::FormatAmount { base_units } => {
            let amount = config.amount_codec()?.format(base_units);
            print_json(&json!({ "base_units": base_units, "amount": amount }))
        }
        Commands::Decode { data } => {
            let bytes = hex::decode(data.trim().trim_start_matches("0x"))
                .wrap_err("account data must be hex")?;
            let account = AccountData::decode(&bytes)?;
            print_json(&serde_json::to_value(&account)?)
        }
        Commands::Chains => {
            let chains: Vec<_> = config.chains.iter().collect();
            print_json(&serde_json::to_value(chains)?)
        }
        Commands::Simulate {
            target_chain,
            target_address,
            fail_transfer,
        } => simulate(&config, target_chain, &target_address, !fail_transfer).await,
    }
}

fn addresses(config: &ClientConfig, user: Option<&str>, sequence: u64) -> Result<()> {
    let book = AddressBook::with_keying(config.program_id, config.request_keying);
    let global = book.global_state();
    let vault = book.vault(config.token_mint.as_ref());

    let mut out = json!({
        "program_id": config.program_id.to_string(),
        "request_keying": config.request_keying,
        "global_state": { "address": global.address.to_string(), "bump": global.bump },
        "vault": { "address": vault.address.to_string(), "bump": vault.bump },
    });

    if let Some(user) = user {
        let user = parse_pubkey(user)?;
        let state = book.user_state(&user);
        let request = book.bridge_request_at(&BridgeRequestId::new(user, sequence))?;
        out["user_state"] = json!({ "address": state.address.to_string(), "bump": state.bump });
        out["bridge_request"] = json!({
            "sequence": sequence,
            "address": request.address.to_string(),
            "bump": request.bump,
        });
    }
    print_json(&out)
}

/// Walk one user through deposit, withdraw, a bridge round trip and a
/// yield claim on an in-memory ledger, printing the resulting state.
async fn simulate(
    config: &ClientConfig,
    target_chain: u8,
    target_address: &str,
    success: bool,
) -> Result<()> {
    let clock = Arc::new(ManualClock::new(SystemClock.now()));
    let transport = Arc::new(
        MemoryTransport::new(config.program_id, config.chains.clone(), clock.clone())
            .with_keying(config.request_keying),
    );
    let ctx = ClientContext::from_config(config, transport, clock.clone())?;
    let client = YieldClient::new(ctx);

    let authority = Keypair::new().pubkey();
    let user = Keypair::new().pubkey();
    let token_account = Keypair::new().pubkey();

    tracing::info!(authority = %authority, user = %user, "Starting simulation");
    client.initialize(&authority).await?;
    client
        .update_yield_data(
            &authority,
            YieldRates {
                solana: 520,
                ethereum: 810,
                polygon: 1230,
            },
        )
        .await?;

    client.deposit(&user, &token_account, "100").await?;
    client.withdraw(&user, &token_account, "25").await?;

    let receipt = client
        .initiate_cross_chain_transfer(&user, target_chain, "25", target_address)
        .await?;
    let id: BridgeRequestId = receipt
        .bridge
        .map(|(id, _)| id)
        .ok_or_else(|| eyre!("initiation returned no bridge request"))?;

    clock.advance(600);
    client
        .complete_cross_chain_transfer(&authority, &id, success)
        .await?;

    clock.advance(86_400);
    let claimed = client.claim_yield(&user, &token_account).await?.amount;

    let global = client.global_state().await?;
    let state = client.user_state(&user).await?;
    let request = client.bridge_request(&id).await?;
    let yields: Vec<_> = client
        .chain_yields()
        .await?
        .into_iter()
        .map(|y| {
            json!({
                "chain": y.chain.name,
                "rate": format_bps(y.rate_bps),
                "apy": format_bps(y.apy_bps),
            })
        })
        .collect();

    print_json(&json!({
        "claimed_yield": client.format_amount(claimed),
        "global_state": global,
        "user_state": state,
        "bridge_request": { "id": id.to_string(), "request": request },
        "chain_yields": yields,
    }))
}
