//! Contract calls and signed transactions

use super::{to_json, Context};
use crate::account::checksummed;
use crate::chain::NodeClient;
use crate::contract::tokens::outputs_to_json;
use crate::contract::CallBuilder;
use crate::error::{DymkaError, DymkaResult};
use crate::tx::{TransactionOptions, TransactionOptionsBuilder, TransactionSubmitter};

use ethers::prelude::*;
use ethers::types::transaction::eip2718::TypedTransaction;
use serde_json::{json, Value};
use tracing::debug;

/// `call FUNCTION [ARGS..]`: read-only, nothing is broadcast
pub(super) async fn call<M: Middleware>(ctx: &Context, node: &NodeClient<M>) -> DymkaResult<Value> {
    let function = ctx.required_argument(0, "function name")?;
    let artifact = ctx.artifacts.load(ctx.contract_name()?)?;
    let address = ctx.contract_address()?;
    let args = ctx.literal_arguments(1)?;

    let outputs = CallBuilder::new(&artifact.abi)
        .call(node, address, ctx.sender()?, function, &args)
        .await?;
    Ok(json!({ "result": outputs_to_json(&outputs) }))
}

/// `deploy [CONSTRUCTOR ARGS..]`
pub(super) async fn deploy<M: Middleware>(
    ctx: &Context,
    node: &NodeClient<M>,
) -> DymkaResult<Value> {
    let options = transaction_options(ctx, node).await?;
    let artifact = ctx.artifacts.load(ctx.contract_name()?)?;
    let args = ctx.literal_arguments(0)?;

    let tx = CallBuilder::new(&artifact.abi).build_deploy_tx(artifact.bytecode()?, &args, &options)?;
    let (hash, receipt) = sign_and_wait(ctx, node, tx).await?;

    Ok(json!({
        "hash": format!("{:?}", hash),
        "address": receipt.contract_address.as_ref().map(checksummed),
    }))
}

/// `send`: a plain transfer, or `send FUNCTION [ARGS..]` with `-c`
pub(super) async fn send<M: Middleware>(ctx: &Context, node: &NodeClient<M>) -> DymkaResult<Value> {
    let options = transaction_options(ctx, node).await?;

    let tx: TypedTransaction = match ctx.cli.contract.as_deref() {
        Some(contract) => {
            let artifact = ctx.artifacts.load(contract)?;
            let function = ctx.required_argument(0, "function name")?;
            let args = ctx.literal_arguments(1)?;
            CallBuilder::new(&artifact.abi).build_send_tx(
                ctx.contract_address()?,
                function,
                &args,
                &options,
            )?
        }
        None => options.to_request().into(),
    };

    let (_, receipt) = sign_and_wait(ctx, node, tx).await?;
    Ok(json!({ "receipt": to_json(&receipt)? }))
}

async fn transaction_options<M: Middleware>(
    ctx: &Context,
    node: &NodeClient<M>,
) -> DymkaResult<TransactionOptions> {
    let overrides = ctx.cli.overrides(ctx.recipient()?);
    TransactionOptionsBuilder::new(node)
        .build(ctx.sender()?, ctx.cli.nonce.as_deref(), &overrides)
        .await
}

async fn sign_and_wait<M: Middleware>(
    ctx: &Context,
    node: &NodeClient<M>,
    tx: TypedTransaction,
) -> DymkaResult<(H256, TransactionReceipt)> {
    let name = ctx.cli.from.as_deref().ok_or(DymkaError::MissingSender)?;
    let submitter = TransactionSubmitter::new(node, ctx.accounts().wallet(name)?);
    debug!("Signing as {} ({:?})", name, submitter.address());

    submitter
        .submit_and_wait(tx, ctx.cli.receipt_timeout())
        .await
}
