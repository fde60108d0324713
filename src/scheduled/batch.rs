//! Chunked scheduled transfers
//!
//! Transfer lists longer than the per-transaction limit are split by the
//! fee distributor and submitted as one schedule per chunk.

use futures::future::join_all;
use tracing::{info, warn};

use super::executor::{Completion, ScheduledExecutor, ScheduledOperation, Submission};
use crate::hedera::ScheduleOutcome;
use crate::types::{AccountAmount, Asset, ScheduleId, TransactionId};

/// A chunk this node created
#[derive(Debug)]
pub struct CreatedChunk {
    pub index: usize,
    pub transaction_id: TransactionId,
    pub schedule_id: ScheduleId,
    pub completion: Completion,
}

/// Submission results of every chunk
#[derive(Debug, Default)]
pub struct BatchSubmission {
    pub created: Vec<CreatedChunk>,
    pub signed: usize,
    pub failed: usize,
}

impl BatchSubmission {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Combined outcome of the created chunks; `None` when this node created
    /// none of them.
    ///
    /// Any failed chunk fails the batch. Otherwise any unanswered chunk makes
    /// the batch `Unknown` (or `Cancelled`).
    pub async fn outcome(self) -> Option<ScheduleOutcome> {
        if self.created.is_empty() {
            return None;
        }

        let outcomes = join_all(self.created.into_iter().map(|c| c.completion.wait())).await;

        let combined = if outcomes.contains(&ScheduleOutcome::Failed) {
            ScheduleOutcome::Failed
        } else if outcomes.contains(&ScheduleOutcome::Cancelled) {
            ScheduleOutcome::Cancelled
        } else if outcomes.contains(&ScheduleOutcome::Unknown) {
            ScheduleOutcome::Unknown
        } else {
            ScheduleOutcome::Mined
        };
        Some(combined)
    }
}

impl ScheduledExecutor {
    /// Submit each chunk as its own scheduled transfer, in order
    pub async fn execute_chunks(
        &self,
        id: &str,
        asset: Asset,
        chunks: Vec<Vec<AccountAmount>>,
    ) -> BatchSubmission {
        let total = chunks.len();
        let mut batch = BatchSubmission::default();

        for (index, transfers) in chunks.into_iter().enumerate() {
            let operation = ScheduledOperation::Transfer { asset, transfers };
            match self.execute(id, &operation).await {
                Submission::Created {
                    transaction_id,
                    schedule_id,
                    completion,
                } => batch.created.push(CreatedChunk {
                    index,
                    transaction_id,
                    schedule_id,
                    completion,
                }),
                Submission::Signed { .. } | Submission::SignRejected { .. } => batch.signed += 1,
                Submission::Failed { reason, .. } => {
                    warn!(id, chunk = index, total, reason = %reason, "Chunk submission failed");
                    batch.failed += 1;
                }
            }
        }

        info!(
            id,
            total,
            created = batch.created.len(),
            signed = batch.signed,
            failed = batch.failed,
            "Chunked transfer submitted"
        );
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fee::Distributor;
    use crate::mock::{HederaCall, MockHederaNode, MockMirrorNode};
    use crate::types::{EntityId, ReceiptStatus, transfer_sum};
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    fn chunks(n: u64) -> Vec<Vec<AccountAmount>> {
        let positives: Vec<_> = (0..n)
            .map(|i| AccountAmount::new(EntityId::new(0, 0, 100 + i), 10))
            .collect();
        Distributor::split_account_amounts(
            &positives,
            AccountAmount::new(EntityId::new(0, 0, 1), -(10 * n as i64)),
        )
    }

    #[tokio::test]
    async fn test_all_chunks_submitted() {
        let hedera = Arc::new(MockHederaNode::new());
        let mirror = Arc::new(MockMirrorNode::new());
        let executor = ScheduledExecutor::new(hedera.clone(), mirror, CancellationToken::new());

        let batch = executor.execute_chunks("fee-1", Asset::Hbar, chunks(20)).await;
        assert_eq!(batch.created.len(), 3);
        assert!(!batch.has_failures());

        for call in hedera.calls() {
            let HederaCall::HbarTransfer { transfers, .. } = call else {
                panic!("unexpected call");
            };
            assert_eq!(transfer_sum(&transfers), 0);
        }
        assert_eq!(batch.outcome().await, Some(ScheduleOutcome::Mined));
    }

    #[tokio::test]
    async fn test_mixed_results() {
        let hedera = Arc::new(MockHederaNode::new());
        let mirror = Arc::new(MockMirrorNode::new());
        hedera.push_create_status(ReceiptStatus::Success);
        hedera.push_create_status(ReceiptStatus::IdenticalScheduleAlreadyCreated);
        hedera.push_create_status(ReceiptStatus::Other("TRANSACTION_EXPIRED".into()));
        let executor = ScheduledExecutor::new(hedera, mirror, CancellationToken::new());

        let batch = executor.execute_chunks("fee-2", Asset::Hbar, chunks(27)).await;
        assert_eq!(batch.created.len(), 1);
        assert_eq!(batch.created[0].index, 0);
        assert_eq!(batch.signed, 1);
        assert_eq!(batch.failed, 1);
    }

    #[tokio::test]
    async fn test_no_created_chunks_has_no_outcome() {
        assert_eq!(BatchSubmission::default().outcome().await, None);
    }

    #[tokio::test]
    async fn test_any_failed_chunk_fails_batch() {
        let batch = BatchSubmission {
            created: vec![
                CreatedChunk {
                    index: 0,
                    transaction_id: TransactionId("a".into()),
                    schedule_id: ScheduleId("0.0.1".into()),
                    completion: Completion::resolved(ScheduleOutcome::Mined),
                },
                CreatedChunk {
                    index: 1,
                    transaction_id: TransactionId("b".into()),
                    schedule_id: ScheduleId("0.0.2".into()),
                    completion: Completion::resolved(ScheduleOutcome::Failed),
                },
            ],
            signed: 0,
            failed: 0,
        };
        assert_eq!(batch.outcome().await, Some(ScheduleOutcome::Failed));
    }
}
