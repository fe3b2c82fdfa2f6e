//! Read calls, state changing sends and deployments built from an ABI

use super::literal::ArgValue;
use super::tokens::tokenize_all;
use crate::chain::NodeClient;
use crate::error::{DymkaError, DymkaResult};
use crate::tx::TransactionOptions;

use ethers::abi::{Abi, Function, Token};
use ethers::prelude::*;
use ethers::types::transaction::eip2718::TypedTransaction;
use tracing::debug;

/// Builds call objects and unsigned transactions for one contract interface
pub struct CallBuilder<'a> {
    abi: &'a Abi,
}

impl<'a> CallBuilder<'a> {
    pub fn new(abi: &'a Abi) -> Self {
        Self { abi }
    }

    /// Look up a function by exact name, using the argument count to pick
    /// between overloads
    pub fn function(&self, name: &str, arg_count: usize) -> DymkaResult<&'a Function> {
        let overloads = self
            .abi
            .functions_by_name(name)
            .map_err(|_| DymkaError::UnknownFunction {
                name: name.to_string(),
            })?;

        match overloads.as_slice() {
            [only] => Ok(only),
            many => many
                .iter()
                .find(|f| f.inputs.len() == arg_count)
                .ok_or_else(|| {
                    DymkaError::ArgumentParse(format!(
                        "no overload of {} takes {} arguments",
                        name, arg_count
                    ))
                }),
        }
    }

    /// Selector plus encoded arguments
    pub fn encode_call(&self, name: &str, args: &[ArgValue]) -> DymkaResult<(&'a Function, Bytes)> {
        let function = self.function(name, args.len())?;
        let tokens = tokenize_all(&function.inputs, args)?;
        let data = function
            .encode_input(&tokens)
            .map_err(|e| DymkaError::ArgumentParse(format!("{}: {}", name, e)))?;
        debug!("Encoded {} with {} arguments", function.signature(), tokens.len());
        Ok((function, data.into()))
    }

    /// Call object for a read-only invocation from `from`
    pub fn build_call(
        &self,
        address: Address,
        from: Option<Address>,
        name: &str,
        args: &[ArgValue],
    ) -> DymkaResult<TypedTransaction> {
        let (_, data) = self.encode_call(name, args)?;
        let mut request = TransactionRequest::new().to(address).data(data);
        if let Some(from) = from {
            request = request.from(from);
        }
        Ok(request.into())
    }

    /// Execute a read-only call and decode its return values; nothing is
    /// broadcast
    pub async fn call<M: Middleware>(
        &self,
        node: &NodeClient<M>,
        address: Address,
        from: Option<Address>,
        name: &str,
        args: &[ArgValue],
    ) -> DymkaResult<Vec<Token>> {
        let function = self.function(name, args.len())?;
        let tx = self.build_call(address, from, name, args)?;
        let output = node.call(&tx).await?;

        function
            .decode_output(&output)
            .map_err(|e| DymkaError::rpc("decode call output", e))
    }

    /// Unsigned transaction invoking `name` on the contract at `address`
    pub fn build_send_tx(
        &self,
        address: Address,
        name: &str,
        args: &[ArgValue],
        options: &TransactionOptions,
    ) -> DymkaResult<TypedTransaction> {
        let (_, data) = self.encode_call(name, args)?;
        if let Some(to) = options.to {
            if to != address {
                return Err(DymkaError::ArgumentParse(format!(
                    "recipient {:?} conflicts with contract address {:?}",
                    to, address
                )));
            }
        }

        let request = options.to_request().to(address).data(data);
        Ok(request.into())
    }

    /// Unsigned deployment of `bytecode` with constructor arguments
    pub fn build_deploy_tx(
        &self,
        bytecode: Bytes,
        args: &[ArgValue],
        options: &TransactionOptions,
    ) -> DymkaResult<TypedTransaction> {
        let data = match self.abi.constructor() {
            Some(constructor) => {
                let tokens = tokenize_all(&constructor.inputs, args)?;
                constructor
                    .encode_input(bytecode.to_vec(), &tokens)
                    .map_err(|e| DymkaError::ArgumentParse(format!("constructor: {}", e)))?
            }
            None if args.is_empty() => bytecode.to_vec(),
            None => {
                return Err(DymkaError::ArgumentParse(format!(
                    "contract has no constructor but {} arguments were given",
                    args.len()
                )))
            }
        };

        if options.to.is_some() {
            return Err(DymkaError::ArgumentParse(
                "deployment cannot have a recipient".to_string(),
            ));
        }

        let request = options.to_request().data(data);
        Ok(request.into())
    }
}
