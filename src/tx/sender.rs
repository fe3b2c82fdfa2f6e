//! Transaction signing, submission and confirmation
//!
//! A transaction moves through `Unsigned -> Signed -> Submitted` and then
//! either `Confirmed` (receipt observed) or `TimedOut` (we stopped waiting).
//! Submission and waiting are separate steps so a caller can broadcast and
//! confirm later from the hash alone.

use super::receipt::ReceiptWaiter;
use crate::chain::NodeClient;
use crate::error::{DymkaError, DymkaResult};

use ethers::prelude::*;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use std::time::Duration;
use tracing::{debug, info};

/// A signed transaction ready to broadcast
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub tx: TypedTransaction,
    pub signature: Signature,
    /// RLP encoded payload for `eth_sendRawTransaction`
    pub raw: Bytes,
    pub hash: H256,
}

/// Signs with a local key and drives a transaction to confirmation
pub struct TransactionSubmitter<'a, M> {
    node: &'a NodeClient<M>,
    wallet: LocalWallet,
}

impl<'a, M: Middleware> TransactionSubmitter<'a, M> {
    pub fn new(node: &'a NodeClient<M>, wallet: LocalWallet) -> Self {
        Self { node, wallet }
    }

    /// Address of the signing key
    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    /// Fill chain id, gas price and gas limit the caller left unset
    pub async fn prepare(&self, tx: &mut TypedTransaction) -> DymkaResult<()> {
        if tx.from().is_none() {
            tx.set_from(self.wallet.address());
        }
        if tx.chain_id().is_none() {
            let reported = self.node.get_chain_id().await?;
            let chain_id = u64::try_from(reported).map_err(|_| {
                DymkaError::rpc(
                    "eth_chainId",
                    format!("chain id {} does not fit in 64 bits", reported),
                )
            })?;
            tx.set_chain_id(chain_id);
        }
        self.node.fill_transaction(tx).await?;
        debug!("Prepared transaction {:?}", tx);
        Ok(())
    }

    /// Sign locally; no network access
    pub async fn sign(&self, tx: TypedTransaction) -> DymkaResult<SignedTransaction> {
        let chain_id = tx.chain_id().ok_or_else(|| {
            DymkaError::Signing("transaction has no chain id".to_string())
        })?;
        let wallet = self.wallet.clone().with_chain_id(chain_id.as_u64());

        let signature = wallet
            .sign_transaction(&tx)
            .await
            .map_err(|e| DymkaError::Signing(e.to_string()))?;
        let raw = tx.rlp_signed(&signature);
        let hash = tx.hash(&signature);

        Ok(SignedTransaction {
            tx,
            signature,
            raw,
            hash,
        })
    }

    /// Broadcast a signed transaction and return its hash.
    ///
    /// Node rejections (bad nonce, underpriced, ...) fail here, before any
    /// waiting starts.
    pub async fn submit(&self, signed: &SignedTransaction) -> DymkaResult<H256> {
        debug!(
            "Broadcasting {:?} with nonce {:?} (v = {})",
            signed.hash,
            signed.tx.nonce(),
            signed.signature.v
        );
        let returned = self.node.send_raw_transaction(signed.raw.clone()).await?;
        if returned != signed.hash {
            return Err(DymkaError::Integrity {
                expected: signed.hash,
                returned,
            });
        }

        info!("Transaction hash: {:?}", signed.hash);
        Ok(signed.hash)
    }

    /// Wait for the receipt of an already submitted transaction
    pub async fn await_receipt(
        &self,
        hash: H256,
        timeout: Duration,
    ) -> DymkaResult<TransactionReceipt> {
        ReceiptWaiter::new(self.node).wait(hash, timeout).await
    }

    /// Prepare, sign, submit and wait, the way the CLI runs a transaction
    pub async fn submit_and_wait(
        &self,
        mut tx: TypedTransaction,
        timeout: Duration,
    ) -> DymkaResult<(H256, TransactionReceipt)> {
        self.prepare(&mut tx).await?;
        let signed = self.sign(tx).await?;
        let hash = self.submit(&signed).await?;
        let receipt = self.await_receipt(hash, timeout).await?;
        Ok((hash, receipt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::providers::{MockProvider, Provider};
    use serde_json::Value;
    use tokio::time::Instant;

    const KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    fn mocked() -> (NodeClient<Provider<MockProvider>>, MockProvider) {
        let (provider, mock) = Provider::mocked();
        (NodeClient::new(provider, Duration::from_millis(100)), mock)
    }

    fn wallet() -> LocalWallet {
        KEY.parse().unwrap()
    }

    fn unsigned(nonce: u64) -> TypedTransaction {
        TransactionRequest::new()
            .from(wallet().address())
            .to(Address::repeat_byte(0x22))
            .value(1000)
            .nonce(nonce)
            .gas(21_000)
            .gas_price(1_000_000_000u64)
            .chain_id(1337u64)
            .into()
    }

    #[tokio::test]
    async fn test_sign_recovers_sender() {
        let (node, _mock) = mocked();
        let submitter = TransactionSubmitter::new(&node, wallet());

        for nonce in [0u64, 1, 99] {
            let signed = submitter.sign(unsigned(nonce)).await.unwrap();
            let recovered = signed.signature.recover(signed.tx.sighash()).unwrap();
            assert_eq!(recovered, wallet().address());
            assert_eq!(signed.hash, H256::from(ethers::utils::keccak256(&signed.raw)));
        }
    }

    #[tokio::test]
    async fn test_sign_is_deterministic() {
        let (node, _mock) = mocked();
        let submitter = TransactionSubmitter::new(&node, wallet());
        let first = submitter.sign(unsigned(5)).await.unwrap();
        let second = submitter.sign(unsigned(5)).await.unwrap();
        assert_eq!(first.raw, second.raw);
        assert_eq!(first.hash, second.hash);
    }

    #[tokio::test]
    async fn test_submit_checks_returned_hash() {
        let (node, mock) = mocked();
        let submitter = TransactionSubmitter::new(&node, wallet());
        let signed = submitter.sign(unsigned(0)).await.unwrap();

        mock.push::<H256, _>(signed.hash).unwrap();
        assert_eq!(submitter.submit(&signed).await.unwrap(), signed.hash);

        mock.push::<H256, _>(H256::repeat_byte(0xff)).unwrap();
        let err = submitter.submit(&signed).await.unwrap_err();
        assert!(matches!(err, DymkaError::Integrity { .. }));
    }

    #[tokio::test]
    async fn test_rejection_surfaces_immediately() {
        let (node, _mock) = mocked();
        let submitter = TransactionSubmitter::new(&node, wallet());
        let signed = submitter.sign(unsigned(0)).await.unwrap();

        // The node answers with nothing usable
        let err = submitter.submit(&signed).await.unwrap_err();
        assert!(matches!(err, DymkaError::Rpc { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_and_wait_times_out_with_hash() {
        let (node, mock) = mocked();
        let submitter = TransactionSubmitter::new(&node, wallet());
        let expected = submitter.sign(unsigned(0)).await.unwrap().hash;

        for _ in 0..64 {
            mock.push(Value::Null).unwrap();
        }
        mock.push::<H256, _>(expected).unwrap();

        let started = Instant::now();
        let err = submitter
            .submit_and_wait(unsigned(0), Duration::from_secs(1))
            .await
            .unwrap_err();

        match err {
            DymkaError::SubmissionTimeout { hash, timeout_secs } => {
                assert_eq!(hash, expected);
                assert_eq!(timeout_secs, 1);
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(started.elapsed() < Duration::from_millis(1100));
    }

    #[tokio::test]
    async fn test_submit_and_wait_confirms() {
        let (node, mock) = mocked();
        let submitter = TransactionSubmitter::new(&node, wallet());
        let expected = submitter.sign(unsigned(3)).await.unwrap().hash;

        let receipt = TransactionReceipt {
            transaction_hash: expected,
            status: Some(U64::one()),
            block_number: Some(U64::from(1)),
            ..Default::default()
        };
        mock.push(receipt.clone()).unwrap();
        mock.push::<H256, _>(expected).unwrap();

        let (hash, got) = submitter
            .submit_and_wait(unsigned(3), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(hash, expected);
        assert_eq!(got, receipt);

        mock.assert_request("eth_sendRawTransaction", [submitter.sign(unsigned(3)).await.unwrap().raw])
            .unwrap();
    }

    #[tokio::test]
    async fn test_prepare_fills_missing_fields() {
        let (node, mock) = mocked();
        let submitter = TransactionSubmitter::new(&node, wallet());
        let mut tx: TypedTransaction = TransactionRequest::new()
            .to(Address::repeat_byte(0x22))
            .nonce(0)
            .into();

        // Served in reverse: chain id, gas price, gas estimate
        mock.push(U256::from(21_000)).unwrap();
        mock.push(U256::from(7)).unwrap();
        mock.push(U256::from(1337)).unwrap();

        submitter.prepare(&mut tx).await.unwrap();
        assert_eq!(tx.from(), Some(&wallet().address()));
        assert_eq!(tx.chain_id(), Some(U64::from(1337)));
        assert_eq!(tx.gas_price(), Some(U256::from(7)));
        assert_eq!(tx.gas(), Some(&U256::from(21_000)));
    }

    #[tokio::test]
    async fn test_prepare_rejects_oversized_chain_id() {
        let (node, mock) = mocked();
        let submitter = TransactionSubmitter::new(&node, wallet());
        let mut tx: TypedTransaction = TransactionRequest::new()
            .to(Address::repeat_byte(0x22))
            .nonce(0)
            .into();

        mock.push(U256::MAX).unwrap();
        let err = submitter.prepare(&mut tx).await.unwrap_err();
        assert!(matches!(err, DymkaError::Rpc { ref operation, .. } if operation == "eth_chainId"));
        assert!(tx.chain_id().is_none());
    }
}
