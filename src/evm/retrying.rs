//! Per-call timeout and retry for EVM RPC

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{BridgeLog, EvmClient, EvmTransaction};
use crate::error::ClientError;
use crate::retry::{RetryPolicy, retry};

/// Wraps every call in [`retry`]: a call that hangs past the policy timeout
/// is dropped and re-issued, and gives up with
/// [`ClientError::TooManyRetries`].
pub struct RetryingEvmClient {
    inner: Arc<dyn EvmClient>,
    policy: RetryPolicy,
    cancel: CancellationToken,
}

impl RetryingEvmClient {
    pub fn new(inner: Arc<dyn EvmClient>, policy: RetryPolicy, cancel: CancellationToken) -> Self {
        Self {
            inner,
            policy,
            cancel,
        }
    }
}

#[async_trait]
impl EvmClient for RetryingEvmClient {
    fn chain_id(&self) -> u64 {
        self.inner.chain_id()
    }

    async fn block_number(&self) -> Result<u64, ClientError> {
        Ok(retry(self.policy, &self.cancel, || self.inner.block_number()).await?)
    }

    async fn filter_logs(&self, from: u64, to: u64) -> Result<Vec<BridgeLog>, ClientError> {
        Ok(retry(self.policy, &self.cancel, || self.inner.filter_logs(from, to)).await?)
    }

    async fn transaction_by_hash(&self, hash: &str) -> Result<Option<EvmTransaction>, ClientError> {
        Ok(retry(self.policy, &self.cancel, || self.inner.transaction_by_hash(hash)).await?)
    }
}
