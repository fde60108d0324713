//! EVM chain access
//!
//! [`EvmClient`] is the narrow RPC contract the watcher needs. [`EvmPool`]
//! spreads calls over several endpoints and [`RetryingEvmClient`] bounds each
//! call with the per-attempt timeout.

pub mod pool;
pub mod retrying;

use async_trait::async_trait;

use crate::error::ClientError;

pub use pool::EvmPool;
pub use retrying::RetryingEvmClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogKind {
    /// Native asset locked in the router
    Lock,
    /// Wrapped asset burned through the router
    Burn,
}

/// Decoded router log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeLog {
    pub kind: LogKind,
    pub tx_hash: String,
    pub log_index: u64,
    pub block_number: u64,
    pub target_chain_id: u64,
    /// Token address on the source chain
    pub asset: String,
    /// Amount after router fees, in the asset's smallest unit
    pub amount: i64,
    /// Hedera account as raw bytes decoded to a string
    pub receiver: String,
}

impl BridgeLog {
    /// Event id shared by every validator: `{tx_hash}-{log_index}`
    pub fn event_id(&self) -> String {
        format!("{}-{}", self.tx_hash, self.log_index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmTransaction {
    pub hash: String,
    /// `None` while pending
    pub block_number: Option<u64>,
}

/// Read-only EVM RPC
#[async_trait]
pub trait EvmClient: Send + Sync {
    fn chain_id(&self) -> u64;

    async fn block_number(&self) -> Result<u64, ClientError>;

    /// Router logs in `from..=to`
    async fn filter_logs(&self, from: u64, to: u64) -> Result<Vec<BridgeLog>, ClientError>;

    async fn transaction_by_hash(&self, hash: &str) -> Result<Option<EvmTransaction>, ClientError>;
}
