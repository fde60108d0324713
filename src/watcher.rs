//! EVM watcher
//!
//! Follows one EVM chain's router logs from a block cursor and publishes
//! lock and burn events bound for Hedera onto the topic queue.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::event::BridgeEvent;
use crate::evm::{BridgeLog, EvmClient, LogKind};
use crate::queue::{Message, QueueError, QueueSender};
use crate::registry::{AssetRegistry, NetworkRegistry};
use crate::types::AccountId;

#[derive(Debug, Error)]
pub enum WatcherError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

pub struct EvmWatcher {
    client: Arc<dyn EvmClient>,
    hedera_chain_id: u64,
    networks: Arc<NetworkRegistry>,
    assets: Arc<AssetRegistry>,
    sender: QueueSender,
    /// Next block to scan
    cursor: u64,
    max_block_range: u64,
    poll_interval: Duration,
}

impl EvmWatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client: Arc<dyn EvmClient>,
        hedera_chain_id: u64,
        networks: Arc<NetworkRegistry>,
        assets: Arc<AssetRegistry>,
        sender: QueueSender,
        start_block: u64,
        max_block_range: u64,
        poll_interval: Duration,
    ) -> Self {
        Self {
            client,
            hedera_chain_id,
            networks,
            assets,
            sender,
            cursor: start_block,
            max_block_range: max_block_range.max(1),
            poll_interval,
        }
    }

    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Scan the next range up to the chain head.
    ///
    /// Returns the number of published events. The cursor only advances once
    /// every event of the range is on the queue.
    pub async fn poll_once(&mut self) -> Result<usize, WatcherError> {
        let head = self.client.block_number().await?;
        if self.cursor > head {
            return Ok(0);
        }

        let to = head.min(self.cursor.saturating_add(self.max_block_range - 1));
        let logs = self.client.filter_logs(self.cursor, to).await?;

        let mut published = 0;
        for log in &logs {
            if let Some(message) = self.to_message(log).await? {
                self.sender.publish(message).await?;
                published += 1;
            }
        }

        debug!(
            chain_id = self.client.chain_id(),
            from = self.cursor,
            to,
            logs = logs.len(),
            published,
            "Scanned block range"
        );
        self.cursor = to.saturating_add(1);
        Ok(published)
    }

    /// Poll until cancelled. Errors are logged and the range is retried on
    /// the next poll.
    pub async fn run(mut self, cancel: CancellationToken) {
        let chain_id = self.client.chain_id();
        info!(chain_id, cursor = self.cursor, "EVM watcher started");

        loop {
            let caught_up = match self.poll_once().await {
                Ok(_) => self.client_caught_up().await,
                Err(e) => {
                    warn!(chain_id, cursor = self.cursor, error = %e, "Poll failed");
                    true
                }
            };

            if caught_up {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.poll_interval) => {}
                }
            } else if cancel.is_cancelled() {
                break;
            }
        }
        info!(chain_id, cursor = self.cursor, "EVM watcher stopped");
    }

    async fn client_caught_up(&self) -> bool {
        match self.client.block_number().await {
            Ok(head) => self.cursor > head,
            Err(_) => true,
        }
    }

    async fn to_message(&self, log: &BridgeLog) -> Result<Option<Message>, WatcherError> {
        let id = log.event_id();
        let source_chain_id = self.client.chain_id();

        if !self.networks.contains(log.target_chain_id) {
            warn!(id, target_chain_id = log.target_chain_id, "Unknown target chain, skipping");
            return Ok(None);
        }
        if log.target_chain_id != self.hedera_chain_id {
            debug!(id, target_chain_id = log.target_chain_id, "Not bound for Hedera, skipping");
            return Ok(None);
        }
        let Ok(recipient) = log.receiver.parse::<AccountId>() else {
            warn!(id, receiver = %log.receiver, "Receiver is not a Hedera account, skipping");
            return Ok(None);
        };
        if log.amount <= 0 {
            warn!(id, amount = log.amount, "Non-positive amount, skipping");
            return Ok(None);
        }

        let (native_asset, wrapped_asset) = match log.kind {
            LogKind::Lock => match self.assets.wrapped_on_hedera(source_chain_id, &log.asset) {
                Some(wrapped) => (log.asset.clone(), wrapped.to_string()),
                None => {
                    warn!(id, asset = %log.asset, "No wrapped token for locked asset, skipping");
                    return Ok(None);
                }
            },
            LogKind::Burn => match self.assets.native_on_hedera(source_chain_id, &log.asset) {
                Some(native) => (native.to_string(), log.asset.clone()),
                None => {
                    warn!(id, asset = %log.asset, "No native asset for burned token, skipping");
                    return Ok(None);
                }
            },
        };

        match self.client.transaction_by_hash(&log.tx_hash).await? {
            Some(tx) if tx.block_number.is_some() => {}
            _ => {
                warn!(id, tx_hash = %log.tx_hash, "Transaction not mined, skipping");
                return Ok(None);
            }
        }

        let event = BridgeEvent {
            id,
            amount: log.amount,
            recipient,
            native_asset,
            wrapped_asset,
            source_chain_id,
            target_chain_id: log.target_chain_id,
        };
        Ok(Some(match log.kind {
            LogKind::Lock => Message::lock_event(event),
            LogKind::Burn => Message::burn_event(event),
        }))
    }
}
