//! Read-only commands: node and account inspection

use super::{to_json, Context};
use crate::account::checksummed;
use crate::chain::NodeClient;
use crate::config::ProviderConfig;
use crate::error::{DymkaError, DymkaResult};

use ethers::prelude::*;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::str::FromStr;

#[derive(Debug, Serialize)]
struct ShowResponse<'a> {
    provider: &'a ProviderConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<String>,
}

pub(super) fn show(ctx: &Context) -> DymkaResult<Value> {
    let address = ctx.sender()?.as_ref().map(checksummed);
    to_json(&ShowResponse {
        provider: &ctx.settings.provider,
        name: address.as_ref().and(ctx.cli.from.as_deref()),
        address,
    })
}

pub(super) async fn gas<M: Middleware>(node: &NodeClient<M>) -> DymkaResult<Value> {
    Ok(json!(node.get_gas_price().await?.to_string()))
}

/// Accounts named on the command line: positional arguments, then the
/// sender, then the recipient. Each comes with the text it was given as.
fn listed_accounts(ctx: &Context) -> DymkaResult<Vec<(String, Address)>> {
    let resolver = ctx.accounts();
    let mut accounts = Vec::new();

    for argument in &ctx.cli.arguments {
        accounts.push((argument.clone(), resolver.address_or_literal(argument)?));
    }
    if let Some(sender) = ctx.sender()? {
        accounts.push((checksummed(&sender), sender));
    }
    if let (Some(text), Some(recipient)) = (ctx.cli.to.as_ref(), ctx.recipient()?) {
        accounts.push((text.clone(), recipient));
    }
    Ok(accounts)
}

fn account_entry(account: String, field: &str, value: Value) -> Value {
    let mut entry = Map::new();
    entry.insert("account".to_string(), Value::String(account));
    entry.insert(field.to_string(), value);
    Value::Object(entry)
}

pub(super) fn checksum(ctx: &Context) -> DymkaResult<Value> {
    let entries = listed_accounts(ctx)?
        .into_iter()
        .map(|(account, address)| account_entry(account, "checksummed", json!(checksummed(&address))))
        .collect();
    Ok(Value::Array(entries))
}

pub(super) async fn balance<M: Middleware>(
    ctx: &Context,
    node: &NodeClient<M>,
) -> DymkaResult<Value> {
    let mut entries = Vec::new();
    for (account, address) in listed_accounts(ctx)? {
        let balance = node.get_balance(address).await?;
        entries.push(account_entry(account, "balance", json!(balance.to_string())));
    }
    Ok(Value::Array(entries))
}

pub(super) async fn nonce<M: Middleware>(
    ctx: &Context,
    node: &NodeClient<M>,
) -> DymkaResult<Value> {
    let mut entries = Vec::new();
    for (account, address) in listed_accounts(ctx)? {
        let nonce = node.get_transaction_count(address).await?;
        entries.push(account_entry(account, "nonce", json!(nonce.to_string())));
    }
    Ok(Value::Array(entries))
}

/// Arbitrary JSON-RPC method with literal parameters
pub(super) async fn exec<M: Middleware>(
    ctx: &Context,
    node: &NodeClient<M>,
) -> DymkaResult<Value> {
    let method = ctx.required_argument(0, "method name")?;
    let params = ctx
        .literal_arguments(1)?
        .iter()
        .map(|arg| arg.to_json())
        .collect();
    node.request(method, params).await
}

fn transaction_hash(ctx: &Context) -> DymkaResult<H256> {
    let text = ctx.required_argument(0, "transaction hash")?;
    H256::from_str(text.trim())
        .map_err(|e| DymkaError::ArgumentParse(format!("invalid transaction hash {}: {}", text, e)))
}

pub(super) async fn status<M: Middleware>(
    ctx: &Context,
    node: &NodeClient<M>,
) -> DymkaResult<Value> {
    let hash = transaction_hash(ctx)?;
    let tx = node
        .get_transaction(hash)
        .await?
        .ok_or(DymkaError::TransactionNotFound { hash })?;
    to_json(&tx)
}

pub(super) async fn receipt<M: Middleware>(
    ctx: &Context,
    node: &NodeClient<M>,
) -> DymkaResult<Value> {
    let hash = transaction_hash(ctx)?;
    let receipt = node
        .get_transaction_receipt(hash)
        .await?
        .ok_or(DymkaError::TransactionNotFound { hash })?;
    to_json(&receipt)
}
