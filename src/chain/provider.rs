//! Node client over an ethers middleware

use crate::config::ProviderConfig;
use crate::error::{DymkaError, DymkaResult};

use ethers::prelude::*;
use ethers::providers::{Http, Provider};
use ethers::types::transaction::eip2718::TypedTransaction;
use std::time::Duration;
use tracing::debug;

/// Wraps the JSON-RPC middleware and maps failures into `DymkaError::Rpc`
pub struct NodeClient<M> {
    middleware: M,
    poll_interval: Duration,
}

impl NodeClient<Provider<Http>> {
    /// Connect to the configured HTTP endpoint
    pub fn connect(config: &ProviderConfig) -> DymkaResult<Self> {
        let url = config.url.trim();
        let provider = Provider::<Http>::try_from(url).map_err(|e| {
            DymkaError::Configuration(format!("Invalid provider url {}: {}", url, e))
        })?;
        let poll_interval = Duration::from_millis(config.poll_interval_ms);
        debug!("Using node {} (poll interval {:?})", url, poll_interval);

        Ok(Self::new(provider.interval(poll_interval), poll_interval))
    }
}

impl<M: Middleware> NodeClient<M> {
    pub fn new(middleware: M, poll_interval: Duration) -> Self {
        Self {
            middleware,
            poll_interval,
        }
    }

    /// Interval between receipt polls
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub async fn get_transaction_count(&self, address: Address) -> DymkaResult<U256> {
        self.middleware
            .get_transaction_count(address, None)
            .await
            .map_err(|e| DymkaError::rpc("eth_getTransactionCount", e))
    }

    pub async fn get_balance(&self, address: Address) -> DymkaResult<U256> {
        self.middleware
            .get_balance(address, None)
            .await
            .map_err(|e| DymkaError::rpc("eth_getBalance", e))
    }

    pub async fn get_gas_price(&self) -> DymkaResult<U256> {
        self.middleware
            .get_gas_price()
            .await
            .map_err(|e| DymkaError::rpc("eth_gasPrice", e))
    }

    pub async fn get_chain_id(&self) -> DymkaResult<U256> {
        self.middleware
            .get_chainid()
            .await
            .map_err(|e| DymkaError::rpc("eth_chainId", e))
    }

    /// Execute a read-only call without broadcasting anything
    pub async fn call(&self, tx: &TypedTransaction) -> DymkaResult<Bytes> {
        self.middleware
            .call(tx, None)
            .await
            .map_err(|e| DymkaError::rpc("eth_call", e))
    }

    /// Fill gas price and gas limit the caller left unset
    pub async fn fill_transaction(&self, tx: &mut TypedTransaction) -> DymkaResult<()> {
        self.middleware
            .fill_transaction(tx, None)
            .await
            .map_err(|e| DymkaError::rpc("fill transaction", e))
    }

    /// Broadcast a signed payload, returning the hash reported by the node
    pub async fn send_raw_transaction(&self, raw: Bytes) -> DymkaResult<H256> {
        let pending = self
            .middleware
            .send_raw_transaction(raw)
            .await
            .map_err(|e| DymkaError::rpc("eth_sendRawTransaction", e))?;
        Ok(pending.tx_hash())
    }

    pub async fn get_transaction(&self, hash: H256) -> DymkaResult<Option<Transaction>> {
        self.middleware
            .get_transaction(hash)
            .await
            .map_err(|e| DymkaError::rpc("eth_getTransactionByHash", e))
    }

    pub async fn get_transaction_receipt(
        &self,
        hash: H256,
    ) -> DymkaResult<Option<TransactionReceipt>> {
        self.middleware
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| DymkaError::rpc("eth_getTransactionReceipt", e))
    }

    /// Raw JSON-RPC request for methods without a typed wrapper
    pub async fn request(
        &self,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> DymkaResult<serde_json::Value> {
        debug!("Raw request {} {:?}", method, params);
        self.middleware
            .provider()
            .request(method, params)
            .await
            .map_err(|e| DymkaError::rpc(method, e))
    }
}
