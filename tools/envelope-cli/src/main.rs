use std::{str::FromStr, time::Duration};

use alloy_primitives::{Address, B256, U256};
use anyhow::Result;
use clap::{Parser, Subcommand};
use red_envelope_client::PollConfig;
use red_envelope_types::{parse_ether, EnvelopeKind, DEFAULT_FEE_BPS};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod demo;
mod display;

/// Create, claim and inspect RedEnvelope escrows over JSON-RPC.
///
/// Global options can also be set through the environment or a `.env` file.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// JSON-RPC endpoint of the node.
    #[arg(long, env = "RPC_URL", default_value = "http://127.0.0.1:8545", global = true)]
    pub rpc_url: String,

    /// Signing key (hex string, 0x...).
    #[arg(long, env = "PKEY", hide_env_values = true, global = true)]
    pub private_key: Option<String>,

    /// Deployed RedEnvelope contract.
    #[arg(long = "contract", env = "CONTRACT_ADDRESS", global = true)]
    pub contract_address: Option<String>,

    /// Platform fee in basis points, used for quotes only.
    #[arg(long, env = "FEE_BPS", default_value_t = DEFAULT_FEE_BPS, global = true)]
    pub fee_bps: u16,

    /// Receipt lookups before `--wait` gives up.
    #[arg(long, env = "RECEIPT_ATTEMPTS", default_value_t = 30, global = true)]
    pub receipt_attempts: u32,

    /// Pause between receipt lookups, in milliseconds.
    #[arg(long, env = "RECEIPT_INTERVAL_MS", default_value_t = 1000, global = true)]
    pub receipt_interval_ms: u64,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            attempts: self.receipt_attempts,
            interval: Duration::from_millis(self.receipt_interval_ms),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Signer, balance and latest block.
    Chain,

    /// Send native currency and wait for it to be mined.
    Transfer {
        #[arg(long, value_parser = parse_address_arg)]
        to: Address,
        /// Amount in ether, eg `0.5`.
        #[arg(long, value_parser = parse_ether_arg)]
        amount: U256,
    },

    /// Id the next created envelope will get.
    NextId,

    /// Read an envelope.
    Get {
        #[arg(value_parser = parse_u256_arg)]
        id: U256,
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Whether an address has claimed an envelope (defaults to the signer).
    HasClaimed {
        #[arg(value_parser = parse_u256_arg)]
        id: U256,
        #[arg(long, value_parser = parse_address_arg)]
        user: Option<Address>,
    },

    /// keccak256 of a room id, as passed to `create --room-hash`.
    RoomHash { room: String },

    /// Create an envelope.
    Create {
        /// DIRECT_FIXED, GROUP_FIXED or GROUP_RANDOM (or 0, 1, 2).
        #[arg(long, default_value = "GROUP_FIXED")]
        kind: EnvelopeKind,
        /// Amount in ether: per claim for GROUP_FIXED, the whole pot otherwise.
        #[arg(long, value_parser = parse_ether_arg)]
        amount: U256,
        #[arg(long, default_value_t = 1)]
        claims: u32,
        /// Seconds from now until the envelope expires.
        #[arg(long, default_value_t = 86_400)]
        expiry_secs: u64,
        /// Restrict claims to a room; hashed locally.
        #[arg(long, conflicts_with = "room_hash")]
        room: Option<String>,
        /// Precomputed room hash.
        #[arg(long, value_parser = parse_b256_arg)]
        room_hash: Option<B256>,
        /// Only this address may claim. Required for DIRECT_FIXED.
        #[arg(long, value_parser = parse_address_arg)]
        recipient: Option<Address>,
        /// ERC-20 token; native currency when omitted.
        #[arg(long, value_parser = parse_address_arg)]
        token: Option<Address>,
        /// Wait for the receipt.
        #[arg(long)]
        wait: bool,
    },

    /// Claim an envelope.
    Claim {
        #[arg(value_parser = parse_u256_arg)]
        id: U256,
        #[arg(long)]
        wait: bool,
    },

    /// Refund the unclaimed remainder of an expired envelope.
    Refund {
        #[arg(value_parser = parse_u256_arg)]
        id: U256,
        #[arg(long)]
        wait: bool,
    },

    /// Walk through create, read back and claim on a dev node.
    Demo,
}

fn parse_u256_arg(s: &str) -> Result<U256, String> {
    U256::from_str(s.trim()).map_err(|e| format!("invalid integer `{s}`: {e}"))
}

fn parse_address_arg(s: &str) -> Result<Address, String> {
    Address::from_str(s.trim()).map_err(|e| format!("invalid address `{s}`: {e}"))
}

fn parse_b256_arg(s: &str) -> Result<B256, String> {
    B256::from_str(s.trim()).map_err(|e| format!("invalid 32-byte hex `{s}`: {e}"))
}

fn parse_ether_arg(s: &str) -> Result<U256, String> {
    parse_ether(s).ok_or_else(|| format!("invalid ether amount `{s}`"))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    commands::run(&cli).await
}
