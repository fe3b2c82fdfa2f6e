//! dymka - command line client for Ethereum JSON-RPC nodes
//!
//! Queries balances and nonces, reads compiled contract artifacts, calls
//! contracts, and signs, submits and confirms transactions with locally
//! configured keys.

use anyhow::{Context as _, Result};
use clap::Parser;
use serde_json::Value;
use tokio::signal;
use tracing::{error, warn};
use tracing_subscriber::filter::LevelFilter;

mod account;
mod chain;
mod cli;
mod commands;
mod config;
mod contract;
mod error;
mod tx;

use chain::NodeClient;
use cli::{Cli, Command};
use commands::Context;
use config::Settings;
use error::DymkaError;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    let level = cli.log_level();
    init_logging(level);

    if let Err(e) = run(cli).await {
        if level >= LevelFilter::DEBUG {
            eprintln!("Error: {:?}", e);
        } else {
            error!("{:#}", e);
        }

        if let Some(hint) = e.downcast_ref::<DymkaError>().and_then(pending_hint) {
            warn!("{}", hint);
        }
        std::process::exit(1);
    }
}

/// Follow-up advice for errors after which a transaction may still land
fn pending_hint(err: &DymkaError) -> Option<String> {
    match err {
        DymkaError::SubmissionTimeout { hash, .. } => Some(format!(
            "Transaction {:?} may still be mined, check it later with `dymka receipt {:?}`",
            hash, hash
        )),
        // The signal may have arrived before or after broadcasting
        DymkaError::Interrupted => Some(
            "If a transaction was already broadcast it may still be mined; \
             its hash is logged at -v"
                .to_string(),
        ),
        _ => None,
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Needs neither configuration nor a node
    if cli.command == Command::Version {
        println!("{}", commands::version());
        return Ok(());
    }

    let settings = Settings::load(&cli.config)
        .with_context(|| format!("Loading configuration from {}", cli.config.display()))?;
    let node = NodeClient::connect(&settings.provider)?;
    let ctx = Context::new(cli, settings);

    let output = tokio::select! {
        result = commands::execute(&ctx, &node) => result?,
        _ = shutdown_signal() => return Err(DymkaError::Interrupted.into()),
    };

    match output {
        Value::String(text) => println!("{}", text),
        other => println!("{}", serde_json::to_string_pretty(&other)?),
    }
    Ok(())
}

fn init_logging(level: LevelFilter) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
