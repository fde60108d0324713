//! Hedera collaborators
//!
//! Narrow contracts for the consensus node (submission + receipts) and the
//! mirror node (read-only queries + waiting for scheduled execution). The
//! wire clients implementing them live outside this crate.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::types::{AccountAmount, AccountId, Receipt, ScheduleId, TokenId, TransactionId};

/// How often the default mirror-node wait polls for a scheduled transaction
pub const MIRROR_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Longest the default wait follows one scheduled transaction. Hedera
/// expires unexecuted schedules after 30 minutes.
pub const MIRROR_MAX_WAIT: Duration = Duration::from_secs(30 * 60);

/// Result of submitting a transaction to a consensus node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionResponse {
    pub transaction_id: TransactionId,
}

/// Consensus node operations
///
/// `memo` is the bridge event id. Identical bodies from different validators
/// (same memo, same transfers) resolve to the same schedule id.
#[async_trait]
pub trait HederaNode: Send + Sync {
    async fn submit_scheduled_hbar_transfer(
        &self,
        transfers: &[AccountAmount],
        memo: &str,
    ) -> Result<TransactionResponse, ClientError>;

    async fn submit_scheduled_token_transfer(
        &self,
        token: TokenId,
        transfers: &[AccountAmount],
        memo: &str,
    ) -> Result<TransactionResponse, ClientError>;

    async fn submit_scheduled_token_mint(
        &self,
        token: TokenId,
        amount: i64,
        memo: &str,
    ) -> Result<TransactionResponse, ClientError>;

    async fn submit_scheduled_token_burn(
        &self,
        token: TokenId,
        amount: i64,
        memo: &str,
    ) -> Result<TransactionResponse, ClientError>;

    async fn submit_schedule_sign(
        &self,
        schedule_id: &ScheduleId,
    ) -> Result<TransactionResponse, ClientError>;

    async fn get_receipt(&self, transaction_id: &TransactionId) -> Result<Receipt, ClientError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub account: AccountId,
    pub balance: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub token: TokenId,
    pub treasury: AccountId,
    pub decimals: u32,
}

/// Mirror-node view of a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorTransaction {
    pub transaction_id: TransactionId,
    pub scheduled: bool,
    /// Consensus result, `SUCCESS` when applied
    pub result: String,
}

impl MirrorTransaction {
    pub fn is_success(&self) -> bool {
        self.result == "SUCCESS"
    }
}

/// Terminal outcome of a scheduled transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// Executed and applied on-chain
    Mined,
    /// Executed but rejected on-chain
    Failed,
    /// No answer (mirror error). Never treated as failure.
    Unknown,
    /// Watch was cancelled before an answer arrived
    Cancelled,
}

impl ScheduleOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleOutcome::Mined => "MINED",
            ScheduleOutcome::Failed => "FAILED",
            ScheduleOutcome::Unknown => "UNKNOWN",
            ScheduleOutcome::Cancelled => "CANCELLED",
        }
    }
}

/// Mirror node queries
#[async_trait]
pub trait MirrorNode: Send + Sync {
    async fn get_account(&self, account: AccountId) -> Result<AccountInfo, ClientError>;

    async fn get_token(&self, token: TokenId) -> Result<TokenInfo, ClientError>;

    /// All mirror records sharing `transaction_id` (the schedule-create and,
    /// once executed, the scheduled transaction itself)
    async fn get_transaction(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Vec<MirrorTransaction>, ClientError>;

    fn poll_interval(&self) -> Duration {
        MIRROR_POLL_INTERVAL
    }

    fn max_wait(&self) -> Duration {
        MIRROR_MAX_WAIT
    }

    /// Poll until the scheduled transaction shows up with a result.
    ///
    /// Mirror errors are logged and polling continues. After [`max_wait`]
    /// without an executed record the outcome is `Unknown`.
    ///
    /// [`max_wait`]: MirrorNode::max_wait
    async fn wait_for_scheduled_transaction(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<ScheduleOutcome, ClientError> {
        let poll = async {
            loop {
                match self.get_transaction(transaction_id).await {
                    Ok(records) => {
                        if let Some(executed) = records.iter().find(|r| r.scheduled) {
                            debug!(
                                tx_id = %transaction_id,
                                result = %executed.result,
                                "Scheduled transaction executed"
                            );
                            return if executed.is_success() {
                                ScheduleOutcome::Mined
                            } else {
                                ScheduleOutcome::Failed
                            };
                        }
                    }
                    Err(ClientError::NotFound(_)) => {}
                    Err(e) => {
                        warn!(tx_id = %transaction_id, error = %e, "Mirror node query failed");
                    }
                }
                tokio::time::sleep(self.poll_interval()).await;
            }
        };

        match tokio::time::timeout(self.max_wait(), poll).await {
            Ok(outcome) => Ok(outcome),
            Err(_) => {
                warn!(
                    tx_id = %transaction_id,
                    waited_secs = self.max_wait().as_secs(),
                    "Scheduled transaction not executed in time"
                );
                Ok(ScheduleOutcome::Unknown)
            }
        }
    }
}
