//! Scheduled Transaction Executor
//!
//! Drives one scheduled operation through Hedera's create-or-sign protocol:
//!
//! ```text
//! submit ─▶ receipt ─┬─ SUCCESS ──────────────────▶ Created (+ mined watch)
//!                    ├─ IDENTICAL_SCHEDULE_ALREADY ─▶ ScheduleSign ─▶ Signed
//!                    └─ other / error ─────────────▶ Failed
//! ```
//!
//! Because the schedule id is derived from the transaction body, validators
//! racing to create the same schedule converge: the losers add their
//! signature to the winner's schedule instead of creating a duplicate.

use std::sync::Arc;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::state::ScheduledState;
use crate::error::ClientError;
use crate::hedera::{HederaNode, MirrorNode, ScheduleOutcome, TransactionResponse};
use crate::types::{AccountAmount, Asset, Receipt, ReceiptStatus, ScheduleId, TokenId, TransactionId};

/// Operation wrapped in a ScheduleCreate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduledOperation {
    Transfer {
        asset: Asset,
        transfers: Vec<AccountAmount>,
    },
    Mint {
        token: TokenId,
        amount: i64,
    },
    Burn {
        token: TokenId,
        amount: i64,
    },
}

impl ScheduledOperation {
    pub fn kind(&self) -> &'static str {
        match self {
            ScheduledOperation::Transfer {
                asset: Asset::Hbar, ..
            } => "hbar_transfer",
            ScheduledOperation::Transfer { .. } => "token_transfer",
            ScheduledOperation::Mint { .. } => "token_mint",
            ScheduledOperation::Burn { .. } => "token_burn",
        }
    }
}

/// Handle to the asynchronous mined watch of a created schedule
#[derive(Debug)]
pub struct Completion {
    rx: oneshot::Receiver<ScheduleOutcome>,
}

impl Completion {
    /// Wait for the scheduled transaction's terminal outcome
    pub async fn wait(self) -> ScheduleOutcome {
        self.rx.await.unwrap_or(ScheduleOutcome::Cancelled)
    }

    /// Completion that resolves immediately
    pub fn resolved(outcome: ScheduleOutcome) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(outcome);
        Self { rx }
    }
}

/// Synchronous result of [`ScheduledExecutor::execute`]
#[derive(Debug)]
pub enum Submission {
    /// This node created the schedule. `transaction_id` is the id of the
    /// scheduled (inner) transaction.
    Created {
        transaction_id: TransactionId,
        schedule_id: ScheduleId,
        completion: Completion,
    },

    /// Another validator created the schedule; this node signed it.
    Signed {
        schedule_id: ScheduleId,
        status: ReceiptStatus,
    },

    /// Signing an existing schedule failed. The creator owns the outcome, so
    /// callers record nothing.
    SignRejected {
        schedule_id: Option<ScheduleId>,
        reason: String,
    },

    /// Submission or its receipt failed
    Failed {
        transaction_id: Option<TransactionId>,
        reason: String,
    },
}

impl Submission {
    /// Leg state this submission moves the caller's record to
    pub fn state(&self) -> ScheduledState {
        match self {
            Submission::Created { .. } => ScheduledState::Submitted,
            Submission::Failed { .. } => ScheduledState::Failed,
            Submission::Signed { .. } | Submission::SignRejected { .. } => {
                ScheduledState::NotSubmitted
            }
        }
    }
}

/// Executes scheduled operations. Holds no mutable state.
pub struct ScheduledExecutor {
    hedera: Arc<dyn HederaNode>,
    mirror: Arc<dyn MirrorNode>,
    shutdown: CancellationToken,
}

impl ScheduledExecutor {
    /// `shutdown` cancels every mined watch spawned by this executor
    pub fn new(
        hedera: Arc<dyn HederaNode>,
        mirror: Arc<dyn MirrorNode>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            hedera,
            mirror,
            shutdown,
        }
    }

    /// Submit `operation` scheduled under memo `id`.
    ///
    /// Returns once the submission is classified; the mined watch runs on
    /// its own task and reports through [`Completion`].
    pub async fn execute(&self, id: &str, operation: &ScheduledOperation) -> Submission {
        let kind = operation.kind();

        let response = match self.submit(id, operation).await {
            Ok(response) => response,
            Err(e) => {
                error!(id, kind, error = %e, "Failed to submit scheduled transaction");
                return Submission::Failed {
                    transaction_id: None,
                    reason: e.to_string(),
                };
            }
        };

        let tx_id = response.transaction_id;
        let receipt = match self.hedera.get_receipt(&tx_id).await {
            Ok(receipt) => receipt,
            Err(e) => {
                error!(id, kind, tx_id = %tx_id, error = %e, "Failed to get receipt");
                return Submission::Failed {
                    transaction_id: Some(tx_id),
                    reason: e.to_string(),
                };
            }
        };

        match receipt.status {
            ReceiptStatus::Success => self.created(id, kind, tx_id, receipt),
            ReceiptStatus::IdenticalScheduleAlreadyCreated => self.sign(id, kind, receipt).await,
            status => {
                error!(id, kind, tx_id = %tx_id, status = %status, "Schedule create rejected");
                Submission::Failed {
                    transaction_id: Some(tx_id),
                    reason: status.to_string(),
                }
            }
        }
    }

    async fn submit(
        &self,
        id: &str,
        operation: &ScheduledOperation,
    ) -> Result<TransactionResponse, ClientError> {
        match operation {
            ScheduledOperation::Transfer {
                asset: Asset::Hbar,
                transfers,
            } => self.hedera.submit_scheduled_hbar_transfer(transfers, id).await,
            ScheduledOperation::Transfer {
                asset: Asset::Token(token),
                transfers,
            } => {
                self.hedera
                    .submit_scheduled_token_transfer(*token, transfers, id)
                    .await
            }
            ScheduledOperation::Mint { token, amount } => {
                self.hedera.submit_scheduled_token_mint(*token, *amount, id).await
            }
            ScheduledOperation::Burn { token, amount } => {
                self.hedera.submit_scheduled_token_burn(*token, *amount, id).await
            }
        }
    }

    fn created(&self, id: &str, kind: &str, tx_id: TransactionId, receipt: Receipt) -> Submission {
        let (Some(schedule_id), Some(scheduled_tx_id)) =
            (receipt.schedule_id, receipt.scheduled_transaction_id)
        else {
            error!(id, kind, tx_id = %tx_id, "Successful schedule receipt without schedule ids");
            return Submission::Failed {
                transaction_id: Some(tx_id),
                reason: "receipt missing schedule ids".to_string(),
            };
        };

        info!(
            id,
            kind,
            schedule_id = %schedule_id,
            scheduled_tx_id = %scheduled_tx_id,
            "Scheduled transaction created"
        );

        let completion = self.watch(id, scheduled_tx_id.clone());
        Submission::Created {
            transaction_id: scheduled_tx_id,
            schedule_id,
            completion,
        }
    }

    async fn sign(&self, id: &str, kind: &str, receipt: Receipt) -> Submission {
        let Some(schedule_id) = receipt.schedule_id else {
            error!(id, kind, "Identical schedule reported without schedule id");
            return Submission::SignRejected {
                schedule_id: None,
                reason: "receipt missing schedule id".to_string(),
            };
        };

        debug!(id, kind, schedule_id = %schedule_id, "Schedule exists, signing");

        let response = match self.hedera.submit_schedule_sign(&schedule_id).await {
            Ok(response) => response,
            Err(e) => {
                error!(id, schedule_id = %schedule_id, error = %e, "Failed to submit schedule sign");
                return Submission::SignRejected {
                    schedule_id: Some(schedule_id),
                    reason: e.to_string(),
                };
            }
        };

        match self.hedera.get_receipt(&response.transaction_id).await {
            Ok(Receipt {
                status: status @ (ReceiptStatus::Success | ReceiptStatus::ScheduleAlreadyExecuted),
                ..
            }) => {
                info!(id, schedule_id = %schedule_id, status = %status, "Schedule signed");
                Submission::Signed {
                    schedule_id,
                    status,
                }
            }
            Ok(receipt) => {
                error!(
                    id,
                    schedule_id = %schedule_id,
                    status = %receipt.status,
                    "Schedule sign rejected"
                );
                Submission::SignRejected {
                    schedule_id: Some(schedule_id),
                    reason: receipt.status.to_string(),
                }
            }
            Err(e) => {
                error!(id, schedule_id = %schedule_id, error = %e, "Failed to get sign receipt");
                Submission::SignRejected {
                    schedule_id: Some(schedule_id),
                    reason: e.to_string(),
                }
            }
        }
    }

    fn watch(&self, id: &str, scheduled_tx_id: TransactionId) -> Completion {
        let (tx, rx) = oneshot::channel();
        let mirror = self.mirror.clone();
        let cancel = self.shutdown.child_token();
        let id = id.to_string();

        tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = cancel.cancelled() => ScheduleOutcome::Cancelled,
                result = mirror.wait_for_scheduled_transaction(&scheduled_tx_id) => match result {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!(id, tx_id = %scheduled_tx_id, error = %e, "Mined watch gave up");
                        ScheduleOutcome::Unknown
                    }
                },
            };

            debug!(id, tx_id = %scheduled_tx_id, outcome = outcome.as_str(), "Mined watch finished");
            // Receiver may be gone if the caller detached
            let _ = tx.send(outcome);
        });

        Completion { rx }
    }
}
