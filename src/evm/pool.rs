//! Round-robin endpoint pool

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tracing::warn;

use super::{BridgeLog, EvmClient, EvmTransaction};
use crate::error::ClientError;

/// Each endpoint gets this many tries per call
const ATTEMPTS_PER_ENDPOINT: usize = 3;

/// Several RPC endpoints of one chain behind a single [`EvmClient`].
///
/// Transient failures move on to the next endpoint; a call fails with
/// [`ClientError::AllEndpointsFailed`] after every endpoint was tried
/// [`ATTEMPTS_PER_ENDPOINT`] times. Other errors are returned as-is.
pub struct EvmPool {
    chain_id: u64,
    clients: Vec<Arc<dyn EvmClient>>,
    next: AtomicUsize,
}

impl EvmPool {
    pub fn new(chain_id: u64, clients: Vec<Arc<dyn EvmClient>>) -> Self {
        Self {
            chain_id,
            clients,
            next: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    async fn call<T, F, Fut>(&self, op: &'static str, f: F) -> Result<T, ClientError>
    where
        F: Fn(Arc<dyn EvmClient>) -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let attempts = self.clients.len() * ATTEMPTS_PER_ENDPOINT;

        for attempt in 1..=attempts {
            let index = self.next.fetch_add(1, Ordering::Relaxed) % self.clients.len();
            match f(self.clients[index].clone()).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() => {
                    warn!(
                        chain_id = self.chain_id,
                        op,
                        endpoint = index,
                        attempt,
                        error = %e,
                        "EVM endpoint failed, rotating"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(ClientError::AllEndpointsFailed(self.clients.len()))
    }
}

#[async_trait]
impl EvmClient for EvmPool {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn block_number(&self) -> Result<u64, ClientError> {
        self.call("block_number", |c| async move { c.block_number().await })
            .await
    }

    async fn filter_logs(&self, from: u64, to: u64) -> Result<Vec<BridgeLog>, ClientError> {
        self.call("filter_logs", |c| async move { c.filter_logs(from, to).await })
            .await
    }

    async fn transaction_by_hash(&self, hash: &str) -> Result<Option<EvmTransaction>, ClientError> {
        self.call("transaction_by_hash", |c| {
            let hash = hash.to_string();
            async move { c.transaction_by_hash(&hash).await }
        })
        .await
    }
}
