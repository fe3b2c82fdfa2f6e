//! Command dispatch
//!
//! Every command receives an explicit [`Context`] and a node client and
//! produces a JSON value for the caller to print.

mod inspect;
mod transact;

use crate::account::AccountResolver;
use crate::chain::NodeClient;
use crate::cli::{Cli, Command};
use crate::config::Settings;
use crate::contract::{parse_arguments, ArgValue, ContractArtifactLoader};
use crate::error::{DymkaError, DymkaResult};

use ethers::prelude::*;
use serde::Serialize;
use serde_json::Value;

/// Everything a command needs besides the node
pub struct Context {
    pub cli: Cli,
    pub settings: Settings,
    pub artifacts: ContractArtifactLoader,
}

impl Context {
    pub fn new(cli: Cli, settings: Settings) -> Self {
        Self {
            cli,
            settings,
            artifacts: ContractArtifactLoader::current_dir(),
        }
    }

    pub fn accounts(&self) -> AccountResolver<'_> {
        AccountResolver::new(&self.settings)
    }

    /// Address of the `-f` account, if one was given
    pub fn sender(&self) -> DymkaResult<Option<Address>> {
        self.cli
            .from
            .as_deref()
            .map(|name| self.accounts().address(name))
            .transpose()
    }

    /// The `-t` recipient, by account name or address
    pub fn recipient(&self) -> DymkaResult<Option<Address>> {
        self.cli
            .to
            .as_deref()
            .map(|value| self.accounts().address_or_literal(value))
            .transpose()
    }

    /// The `-a` contract address
    pub fn contract_address(&self) -> DymkaResult<Address> {
        let value = self.cli.address.as_deref().ok_or_else(|| {
            DymkaError::ArgumentParse("contract address is required, use -a".to_string())
        })?;
        self.accounts().address_or_literal(value)
    }

    pub fn contract_name(&self) -> DymkaResult<&str> {
        self.cli.contract.as_deref().ok_or_else(|| {
            DymkaError::ArgumentParse("contract is required, use -c".to_string())
        })
    }

    /// Positional argument `index`, which the command cannot do without
    pub fn required_argument(&self, index: usize, what: &str) -> DymkaResult<&str> {
        self.cli
            .arguments
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| DymkaError::ArgumentParse(format!("missing {}", what)))
    }

    /// Structured arguments from position `from` on
    pub fn literal_arguments(&self, from: usize) -> DymkaResult<Vec<ArgValue>> {
        let rest = self.cli.arguments.get(from..).unwrap_or_default();
        parse_arguments(rest)
    }
}

/// Run the parsed command against `node`
pub async fn execute<M: Middleware>(ctx: &Context, node: &NodeClient<M>) -> DymkaResult<Value> {
    match ctx.cli.command {
        Command::Version => Ok(Value::String(version())),
        Command::Show => inspect::show(ctx),
        Command::Gas => inspect::gas(node).await,
        Command::Checksum => inspect::checksum(ctx),
        Command::Balance => inspect::balance(ctx, node).await,
        Command::Nonce => inspect::nonce(ctx, node).await,
        Command::Exec => inspect::exec(ctx, node).await,
        Command::Status => inspect::status(ctx, node).await,
        Command::Receipt => inspect::receipt(ctx, node).await,
        Command::Call => transact::call(ctx, node).await,
        Command::Deploy => transact::deploy(ctx, node).await,
        Command::Send => transact::send(ctx, node).await,
    }
}

pub fn version() -> String {
    format!("Version: {}", env!("CARGO_PKG_VERSION"))
}

fn to_json<T: Serialize>(value: &T) -> DymkaResult<Value> {
    serde_json::to_value(value).map_err(|e| DymkaError::rpc("encode response", e))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use clap::Parser;
    use ethers::providers::{MockProvider, Provider};
    use std::path::Path;
    use std::time::Duration;

    pub const KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
    pub const ADDRESS: &str = "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23";

    pub fn context(args: &[&str], artifacts: &Path) -> Context {
        let cli = Cli::try_parse_from(std::iter::once("dymka").chain(args.iter().copied()))
            .unwrap();
        let settings = Settings::from_json(&format!(
            r#"{{"provider": {{"url": "http://localhost:8545"}}, "accounts": {{"alice": "{}"}}}}"#,
            KEY
        ))
        .unwrap();
        Context {
            cli,
            settings,
            artifacts: ContractArtifactLoader::new(artifacts),
        }
    }

    pub fn mocked() -> (NodeClient<Provider<MockProvider>>, MockProvider) {
        let (provider, mock) = Provider::mocked();
        (NodeClient::new(provider, Duration::from_millis(10)), mock)
    }
}
