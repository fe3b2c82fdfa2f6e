//! Transaction options: sender, nonce and explicit overrides
//!
//! `from` and `nonce` are always present. The remaining fields are merged
//! only when the caller supplied a non-zero value, so the node or library
//! defaults are never overridden by a zero placeholder. A literal `0` for
//! gas, gas price, value or chain id is therefore treated as unset.

use crate::chain::NodeClient;
use crate::contract::tokens::parse_u256;
use crate::error::{DymkaError, DymkaResult};

use ethers::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

/// Explicit values from the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub chain_id: Option<u64>,
    pub gas: Option<U256>,
    pub gas_price: Option<U256>,
    pub value: Option<U256>,
    pub to: Option<Address>,
}

/// Options merged into every state changing transaction
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOptions {
    pub from: Address,
    pub nonce: U256,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
}

impl TransactionOptions {
    /// Legacy request carrying every present option
    pub fn to_request(&self) -> TransactionRequest {
        let mut request = TransactionRequest::new().from(self.from).nonce(self.nonce);
        if let Some(chain_id) = self.chain_id {
            request = request.chain_id(chain_id);
        }
        if let Some(gas) = self.gas {
            request = request.gas(gas);
        }
        if let Some(gas_price) = self.gas_price {
            request = request.gas_price(gas_price);
        }
        if let Some(value) = self.value {
            request = request.value(value);
        }
        if let Some(to) = self.to {
            request = request.to(to);
        }
        request
    }
}

/// Zero is the "not set" sentinel for numeric overrides
fn non_zero(value: Option<U256>) -> Option<U256> {
    value.filter(|v| !v.is_zero())
}

/// Builds options from overrides and node-queried defaults
pub struct TransactionOptionsBuilder<'a, M> {
    node: &'a NodeClient<M>,
}

impl<'a, M: Middleware> TransactionOptionsBuilder<'a, M> {
    pub fn new(node: &'a NodeClient<M>) -> Self {
        Self { node }
    }

    /// Assemble options for `sender`.
    ///
    /// The nonce is taken from `explicit_nonce` (decimal or hex text) when
    /// given, otherwise queried from the node once.
    pub async fn build(
        &self,
        sender: Option<Address>,
        explicit_nonce: Option<&str>,
        overrides: &Overrides,
    ) -> DymkaResult<TransactionOptions> {
        let from = sender.ok_or(DymkaError::MissingSender)?;

        let nonce = match explicit_nonce.map(str::trim).filter(|n| !n.is_empty()) {
            Some(text) => parse_u256(text).map_err(DymkaError::ArgumentParse)?,
            None => {
                let nonce = self.node.get_transaction_count(from).await?;
                debug!("Fetched nonce {} for {:?}", nonce, from);
                nonce
            }
        };

        let options = TransactionOptions {
            from,
            nonce,
            chain_id: overrides.chain_id.filter(|id| *id != 0),
            gas: non_zero(overrides.gas),
            gas_price: non_zero(overrides.gas_price),
            value: non_zero(overrides.value),
            to: overrides.to.filter(|to| !to.is_zero()),
        };

        info!(
            "Transaction options: {}",
            serde_json::to_string(&options).unwrap_or_default()
        );
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::providers::{MockProvider, Provider};
    use serde_json::json;
    use std::str::FromStr;
    use std::time::Duration;
    use tokio_test::assert_ok;

    fn mocked() -> (NodeClient<Provider<MockProvider>>, MockProvider) {
        let (provider, mock) = Provider::mocked();
        (NodeClient::new(provider, Duration::from_millis(10)), mock)
    }

    fn sender() -> Address {
        Address::repeat_byte(0x11)
    }

    #[tokio::test]
    async fn test_zero_overrides_are_omitted() {
        let (node, mock) = mocked();
        mock.push(U256::from(7)).unwrap();
        let to = Address::from_str("0x0000000000000000000000000000000000000abc").unwrap();

        let overrides = Overrides {
            gas: Some(U256::zero()),
            to: Some(to),
            ..Default::default()
        };
        let options = assert_ok!(
            TransactionOptionsBuilder::new(&node)
                .build(Some(sender()), None, &overrides)
                .await
        );

        assert_eq!(
            options,
            TransactionOptions {
                from: sender(),
                nonce: U256::from(7),
                chain_id: None,
                gas: None,
                gas_price: None,
                value: None,
                to: Some(to),
            }
        );
        let keys: Vec<String> = serde_json::to_value(&options)
            .unwrap()
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(keys.len(), 3);
        assert!(keys.contains(&"from".to_string()));
        assert!(keys.contains(&"nonce".to_string()));
        assert!(keys.contains(&"to".to_string()));
    }

    #[tokio::test]
    async fn test_all_zero_overrides() {
        let (node, mock) = mocked();
        mock.push(U256::from(1)).unwrap();
        let overrides = Overrides {
            chain_id: Some(0),
            gas: Some(U256::zero()),
            gas_price: Some(U256::zero()),
            value: Some(U256::zero()),
            to: Some(Address::zero()),
        };
        let options = TransactionOptionsBuilder::new(&node)
            .build(Some(sender()), None, &overrides)
            .await
            .unwrap();
        assert_eq!(
            serde_json::to_value(&options).unwrap(),
            json!({"from": format!("{:?}", sender()), "nonce": "0x1"})
        );
    }

    #[tokio::test]
    async fn test_explicit_nonce_skips_node() {
        let (node, mock) = mocked();
        let overrides = Overrides {
            chain_id: Some(5),
            gas_price: Some(U256::from(1_000_000_000u64)),
            value: Some(U256::from(10)),
            ..Default::default()
        };
        let options = TransactionOptionsBuilder::new(&node)
            .build(Some(sender()), Some("42"), &overrides)
            .await
            .unwrap();

        assert_eq!(options.nonce, U256::from(42));
        assert_eq!(options.chain_id, Some(5));
        assert_eq!(options.value, Some(U256::from(10)));
        // No request reached the node
        assert!(mock.assert_request("eth_getTransactionCount", ()).is_err());

        let hex_nonce = TransactionOptionsBuilder::new(&node)
            .build(Some(sender()), Some("0x2a"), &Overrides::default())
            .await
            .unwrap();
        assert_eq!(hex_nonce.nonce, U256::from(42));
    }

    #[tokio::test]
    async fn test_missing_sender() {
        let (node, _mock) = mocked();
        let err = TransactionOptionsBuilder::new(&node)
            .build(None, None, &Overrides::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DymkaError::MissingSender));
    }

    #[tokio::test]
    async fn test_bad_nonce_text() {
        let (node, _mock) = mocked();
        let err = TransactionOptionsBuilder::new(&node)
            .build(Some(sender()), Some("seven"), &Overrides::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DymkaError::ArgumentParse(_)));
    }

    #[test]
    fn test_to_request() {
        let options = TransactionOptions {
            from: sender(),
            nonce: U256::from(1),
            chain_id: Some(1),
            gas: None,
            gas_price: Some(U256::from(2)),
            value: None,
            to: Some(Address::repeat_byte(0x22)),
        };
        let request = options.to_request();
        assert_eq!(request.from, Some(sender()));
        assert_eq!(request.nonce, Some(U256::from(1)));
        assert_eq!(request.chain_id, Some(U64::from(1)));
        assert_eq!(request.gas, None);
        assert_eq!(request.gas_price, Some(U256::from(2)));
        assert_eq!(request.value, None);
    }
}
