//! Fee collection for Hedera -> EVM transfers
//!
//! The bridge fee of a deposit stays in the bridge account until it is paid
//! out to the validators and the treasury through a (chunked) scheduled
//! transfer keyed by the deposit's transaction id.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{error, info, warn};

use super::TransferError;
use super::record::TransferRecord;
use super::repository::TransferRepository;
use super::status::TransferStatus;
use crate::event::Processing;
use crate::fee::{Distributor, FeeCalculator, FeeError};
use crate::hedera::ScheduleOutcome;
use crate::scheduled::ScheduledExecutor;
use crate::types::{AccountAmount, AccountId, Asset, transfer_sum};

pub struct FeeTransferService {
    bridge_account: AccountId,
    repository: Arc<dyn TransferRepository>,
    executor: Arc<ScheduledExecutor>,
    fee_calculator: Arc<FeeCalculator>,
}

impl FeeTransferService {
    pub fn new(
        bridge_account: AccountId,
        repository: Arc<dyn TransferRepository>,
        executor: Arc<ScheduledExecutor>,
        fee_calculator: Arc<FeeCalculator>,
    ) -> Self {
        Self {
            bridge_account,
            repository,
            executor,
            fee_calculator,
        }
    }

    /// Record the transfer and distribute its fee.
    ///
    /// NFT transfers and redelivered records are skipped. An amount that
    /// does not cover the fee ends in `INSUFFICIENT_FEE`.
    pub async fn process(&self, record: &TransferRecord) -> Result<Processing, TransferError> {
        let id = record.transaction_id.as_str();

        let inserted = self
            .repository
            .create(record)
            .await
            .map_err(|source| TransferError::Persist {
                id: id.to_string(),
                source,
            })?;
        if !inserted {
            info!(id, "Transfer already processed, skipping");
            return Ok(Processing::default());
        }
        if record.is_nft() {
            info!(id, serial = ?record.serial_number, "NFT transfer, no fee to distribute");
            return Ok(Processing::default());
        }

        let (asset, credits) = match self.fee_credits(record).await {
            Ok(Some(release)) => release,
            Ok(None) => {
                self.set_status(id, TransferStatus::InsufficientFee).await;
                return Ok(Processing::default());
            }
            Err(e) => {
                self.set_status(id, TransferStatus::Failed).await;
                return Err(e);
            }
        };

        let total = transfer_sum(&credits) as i64;
        let chunks = Distributor::split_account_amounts(
            &credits,
            AccountAmount::new(self.bridge_account, -total),
        );
        let batch = self.executor.execute_chunks(id, asset, chunks).await;

        let mut processing = Processing::default();
        if batch.has_failures() {
            warn!(id, failed = batch.failed, "Fee transfer chunk failed");
            self.set_status(id, TransferStatus::Failed).await;
            return Ok(processing);
        }
        if batch.created.is_empty() {
            return Ok(processing);
        }

        self.set_status(id, TransferStatus::ScheduledSubmitted).await;

        let repository = self.repository.clone();
        let transfer_id = id.to_string();
        processing.push(Some(tokio::spawn(async move {
            let status = match batch.outcome().await {
                Some(ScheduleOutcome::Mined) => TransferStatus::Completed,
                Some(ScheduleOutcome::Failed) => TransferStatus::Failed,
                outcome => {
                    warn!(
                        id = %transfer_id,
                        outcome = ?outcome,
                        "No outcome for fee transfer, left submitted"
                    );
                    return;
                }
            };
            if let Err(e) = repository.update_status(&transfer_id, status).await {
                error!(id = %transfer_id, status = %status, error = %e, "Failed to update transfer");
            }
        })));
        Ok(processing)
    }

    /// `None` when the amount is too small to carry a fee
    async fn fee_credits(
        &self,
        record: &TransferRecord,
    ) -> Result<Option<(Asset, Vec<AccountAmount>)>, TransferError> {
        let id = &record.transaction_id;
        let amount = record
            .amount_units()
            .ok_or_else(|| TransferError::InvalidAmount {
                id: id.clone(),
                amount: record.amount.to_string(),
            })?;
        let asset: Asset = record
            .native_asset
            .parse()
            .map_err(|_| TransferError::InvalidAsset {
                id: id.clone(),
                asset: record.native_asset.clone(),
            })?;

        let fee_error = |source| TransferError::Fee {
            id: id.clone(),
            source,
        };
        let split = match self
            .fee_calculator
            .calculate_fee(&record.native_asset, amount)
        {
            Ok(split) if split.fee > 0 => split,
            Ok(_) | Err(FeeError::InsufficientFee(_)) => return Ok(None),
            Err(e) => return Err(fee_error(e)),
        };

        if let Err(e) = self
            .repository
            .update_fee(id, Decimal::from(split.fee))
            .await
        {
            error!(id = %id, fee = split.fee, error = %e, "Failed to store fee");
        }

        let credits = self
            .fee_calculator
            .distributor()
            .calculate_member_distribution(split.fee)
            .map_err(fee_error)?
            .into_iter()
            .filter(|c| c.amount > 0)
            .collect();
        Ok(Some((asset, credits)))
    }

    async fn set_status(&self, id: &str, status: TransferStatus) {
        if let Err(e) = self.repository.update_status(id, status).await {
            error!(id, status = %status, error = %e, "Failed to update transfer");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hedera::ScheduleOutcome;
    use crate::mock::{HederaCall, MockHederaNode, MockMirrorNode};
    use crate::transfer::InMemoryTransferRepository;
    use crate::transfer::record::fungible;
    use crate::types::{EntityId, HBAR, ReceiptStatus};
    use rustc_hash::FxHashMap;
    use tokio_util::sync::CancellationToken;

    const BRIDGE: EntityId = EntityId::new(0, 0, 476);
    const TREASURY: EntityId = EntityId::new(0, 0, 98);

    struct Fixture {
        service: FeeTransferService,
        hedera: Arc<MockHederaNode>,
        mirror: Arc<MockMirrorNode>,
        repository: Arc<InMemoryTransferRepository>,
    }

    /// Two validators, 60/40 reward split, 1% fee on HBAR
    fn fixture() -> Fixture {
        let hedera = Arc::new(MockHederaNode::new());
        let mirror = Arc::new(MockMirrorNode::new());
        let repository = Arc::new(InMemoryTransferRepository::new());
        let executor = Arc::new(ScheduledExecutor::new(
            hedera.clone(),
            mirror.clone(),
            CancellationToken::new(),
        ));
        let members = vec![EntityId::new(0, 0, 10), EntityId::new(0, 0, 11)];
        let distributor = Distributor::new(members, TREASURY, 60, 40).unwrap();
        let mut percentages = FxHashMap::default();
        percentages.insert(HBAR.to_string(), 1_000);
        let calculator = FeeCalculator::new(percentages, Arc::new(distributor)).unwrap();

        Fixture {
            service: FeeTransferService::new(
                BRIDGE,
                repository.clone(),
                executor,
                Arc::new(calculator),
            ),
            hedera,
            mirror,
            repository,
        }
    }

    #[tokio::test]
    async fn test_fee_distributed_from_bridge() {
        let f = fixture();
        let record = fungible("0.0.5@100.1", HBAR, 100_000);
        f.service.process(&record).await.unwrap().settled().await;

        // fee 1000: pool 600 -> 300 each, treasury 400
        assert_eq!(
            f.hedera.calls(),
            vec![HederaCall::HbarTransfer {
                transfers: vec![
                    AccountAmount::new(EntityId::new(0, 0, 10), 300),
                    AccountAmount::new(EntityId::new(0, 0, 11), 300),
                    AccountAmount::new(TREASURY, 400),
                    AccountAmount::new(BRIDGE, -1_000),
                ],
                memo: "0.0.5@100.1".into(),
            }]
        );

        let stored = f.repository.get("0.0.5@100.1").await.unwrap().unwrap();
        assert_eq!(stored.fee, Some(Decimal::from(1_000)));
        assert_eq!(stored.status, TransferStatus::Completed);
    }

    #[tokio::test]
    async fn test_small_amount_insufficient_fee() {
        let f = fixture();
        f.service
            .process(&fungible("tiny", HBAR, 50))
            .await
            .unwrap()
            .settled()
            .await;

        assert!(f.hedera.calls().is_empty());
        assert_eq!(
            f.repository.get("tiny").await.unwrap().unwrap().status,
            TransferStatus::InsufficientFee
        );
    }

    #[tokio::test]
    async fn test_nft_skipped() {
        let f = fixture();
        let mut record = fungible("nft", "0.0.77", 1);
        record.serial_number = Some(3);

        assert!(f.service.process(&record).await.unwrap().is_settled());
        assert!(f.hedera.calls().is_empty());
        assert_eq!(
            f.repository.get("nft").await.unwrap().unwrap().status,
            TransferStatus::Initial
        );
    }

    #[tokio::test]
    async fn test_rejected_schedule_fails() {
        let f = fixture();
        f.hedera
            .push_create_status(ReceiptStatus::Other("INVALID_ACCOUNT_ID".into()));

        f.service
            .process(&fungible("rej", HBAR, 100_000))
            .await
            .unwrap()
            .settled()
            .await;
        assert_eq!(
            f.repository.get("rej").await.unwrap().unwrap().status,
            TransferStatus::Failed
        );
    }

    #[tokio::test]
    async fn test_unknown_outcome_left_submitted() {
        let f = fixture();
        f.mirror.set_outcome(ScheduleOutcome::Unknown);

        f.service
            .process(&fungible("slow", HBAR, 100_000))
            .await
            .unwrap()
            .settled()
            .await;
        assert_eq!(
            f.repository.get("slow").await.unwrap().unwrap().status,
            TransferStatus::ScheduledSubmitted
        );
    }

    #[tokio::test]
    async fn test_fractional_amount_fails() {
        let f = fixture();
        let mut record = fungible("frac", HBAR, 1);
        record.amount = Decimal::new(15, 1);

        assert!(matches!(
            f.service.process(&record).await,
            Err(TransferError::InvalidAmount { .. })
        ));
        assert_eq!(
            f.repository.get("frac").await.unwrap().unwrap().status,
            TransferStatus::Failed
        );
    }
}
