//! Bounded polling for transaction receipts
//!
//! Giving up after the timeout is a local decision: the transaction may
//! still be included later and its receipt can be fetched with the hash.

use crate::chain::NodeClient;
use crate::error::{DymkaError, DymkaResult};

use ethers::prelude::*;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

/// Polls the node until a receipt shows up or the timeout elapses
pub struct ReceiptWaiter<'a, M> {
    node: &'a NodeClient<M>,
    interval: Duration,
}

impl<'a, M: Middleware> ReceiptWaiter<'a, M> {
    pub fn new(node: &'a NodeClient<M>) -> Self {
        Self {
            node,
            interval: node.poll_interval(),
        }
    }

    /// Wait for the receipt of `hash` for at most `limit`.
    ///
    /// Dropping the returned future aborts the wait.
    pub async fn wait(&self, hash: H256, limit: Duration) -> DymkaResult<TransactionReceipt> {
        let started = Instant::now();

        match timeout(limit, self.poll(hash)).await {
            Ok(result) => {
                let receipt = result?;
                info!(
                    "Transaction {:?} included in block {:?} after {:?}",
                    hash,
                    receipt.block_number,
                    started.elapsed()
                );
                if receipt.status == Some(U64::zero()) {
                    warn!("Transaction {:?} reverted", hash);
                }
                Ok(receipt)
            }
            Err(_) => Err(DymkaError::SubmissionTimeout {
                hash,
                timeout_secs: limit.as_secs(),
            }),
        }
    }

    async fn poll(&self, hash: H256) -> DymkaResult<TransactionReceipt> {
        let mut attempts = 0u64;
        loop {
            attempts += 1;
            match self.node.get_transaction_receipt(hash).await? {
                Some(receipt) if receipt.block_number.is_some() => return Ok(receipt),
                // Some nodes answer for pending transactions before inclusion
                Some(_) => debug!("Receipt for {:?} has no block yet (attempt {})", hash, attempts),
                None => debug!("No receipt for {:?} yet (attempt {})", hash, attempts),
            }
            sleep(self.interval).await;
        }
    }
}
