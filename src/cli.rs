//! Command line surface

use crate::contract::tokens::parse_u256;
use crate::tx::Overrides;

use clap::{ArgAction, Parser, ValueEnum};
use ethers::types::{Address, U256};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::filter::LevelFilter;

/// Log levels from quietest to noisiest; `-v`/`-q` step through them
const LEVELS: [LevelFilter; 6] = [
    LevelFilter::OFF,
    LevelFilter::ERROR,
    LevelFilter::WARN,
    LevelFilter::INFO,
    LevelFilter::DEBUG,
    LevelFilter::TRACE,
];
const DEFAULT_LEVEL: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Command {
    /// Print the configured provider and sender
    Show,
    /// Current gas price
    Gas,
    /// EIP-55 form of the given addresses
    Checksum,
    Balance,
    Nonce,
    /// Raw JSON-RPC request: METHOD [PARAMS..]
    Exec,
    /// Transaction by hash
    Status,
    /// Receipt by hash
    Receipt,
    /// Read-only contract call: FUNCTION [ARGS..]
    #[value(alias = "query")]
    Call,
    /// Deploy the contract given with -c: [CONSTRUCTOR ARGS..]
    Deploy,
    /// Value transfer, or contract invocation with -c: FUNCTION [ARGS..]
    #[value(alias = "invoke")]
    Send,
    Version,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "dymka", version, about = "Interact with an Ethereum network")]
pub struct Cli {
    #[arg(value_enum)]
    pub command: Command,

    /// Optional arguments to the command
    #[arg(allow_negative_numbers = true)]
    pub arguments: Vec<String>,

    /// Contract address to send to or call
    #[arg(short, long)]
    pub address: Option<String>,

    /// Contract name or path of its json artifact
    #[arg(short, long)]
    pub contract: Option<String>,

    /// Account name to transact from
    #[arg(short, long)]
    pub from: Option<String>,

    /// Account name or address to transact to
    #[arg(short, long)]
    pub to: Option<String>,

    #[arg(long = "chainId")]
    pub chain_id: Option<u64>,

    #[arg(long, value_parser = parse_u256)]
    pub gas: Option<U256>,

    #[arg(long = "gasPrice", value_parser = parse_u256)]
    pub gas_price: Option<U256>,

    /// Explicit nonce, decimal or hex
    #[arg(long)]
    pub nonce: Option<String>,

    /// Amount of wei to send
    #[arg(long, value_parser = parse_u256)]
    pub value: Option<U256>,

    /// Seconds to wait for a receipt
    #[arg(long, default_value_t = 120)]
    pub timeout: u64,

    #[arg(long, env = "DYMKA_CONFIG", default_value = "./dymka.json")]
    pub config: PathBuf,

    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    #[arg(short, long, action = ArgAction::Count)]
    pub quiet: u8,
}

impl Cli {
    /// Log level after applying `-v` and `-q`
    pub fn log_level(&self) -> LevelFilter {
        let index = DEFAULT_LEVEL as i32 + self.verbose as i32 - self.quiet as i32;
        LEVELS[index.clamp(0, LEVELS.len() as i32 - 1) as usize]
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Numeric overrides plus an already resolved recipient
    pub fn overrides(&self, to: Option<Address>) -> Overrides {
        Overrides {
            chain_id: self.chain_id,
            gas: self.gas,
            gas_price: self.gas_price,
            value: self.value,
            to,
        }
    }
}
