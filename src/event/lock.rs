//! Lock events
//!
//! An EVM-native asset was locked: mint the wrapped token on Hedera into
//! the bridge account, then transfer it to the recipient. Both legs are
//! scheduled under the event id and tracked independently.

use std::sync::Arc;

use tracing::{info, warn};

use super::EventError;
use super::repository::EventRepository;
use super::tracking::{Processing, mark_failed, record_submission};
use super::types::{BridgeEvent, EventKind, Leg};
use crate::hedera::MirrorNode;
use crate::scheduled::{ScheduledExecutor, ScheduledOperation};
use crate::types::{AccountAmount, AccountId, Asset, TokenId};

pub struct LockEventService {
    bridge_account: AccountId,
    repository: Arc<dyn EventRepository>,
    executor: Arc<ScheduledExecutor>,
    mirror: Arc<dyn MirrorNode>,
}

impl LockEventService {
    pub fn new(
        bridge_account: AccountId,
        repository: Arc<dyn EventRepository>,
        executor: Arc<ScheduledExecutor>,
        mirror: Arc<dyn MirrorNode>,
    ) -> Self {
        Self {
            bridge_account,
            repository,
            executor,
            mirror,
        }
    }

    /// Process a lock event.
    ///
    /// Returns once both legs are submitted (or signed); their mined outcomes
    /// are recorded by the trackers in the returned [`Processing`]. A
    /// redelivered event is skipped.
    ///
    /// # Errors
    /// - [`EventError::InvalidAmount`] if the amount is not positive; nothing
    ///   is persisted
    /// - [`EventError::Persist`] if the event row cannot be created; nothing
    ///   is submitted
    /// - [`EventError::InvalidAsset`] / [`EventError::UnknownToken`] if the
    ///   wrapped asset is not a usable Hedera token; both legs are failed
    pub async fn process_event(&self, event: &BridgeEvent) -> Result<Processing, EventError> {
        let id = event.id.as_str();
        if event.amount <= 0 {
            return Err(EventError::InvalidAmount {
                id: id.to_string(),
                amount: event.amount,
            });
        }

        let inserted = self
            .repository
            .create(EventKind::Lock, event)
            .await
            .map_err(|source| EventError::Persist {
                id: id.to_string(),
                source,
            })?;
        if !inserted {
            info!(id, "Lock event already processed, skipping");
            return Ok(Processing::default());
        }

        let token = match self.wrapped_token(event).await {
            Ok(token) => token,
            Err(e) => {
                mark_failed(self.repository.as_ref(), id, Leg::Mint).await;
                mark_failed(self.repository.as_ref(), id, Leg::Transfer).await;
                return Err(e);
            }
        };

        info!(
            id,
            amount = event.amount,
            token = %token,
            recipient = %event.recipient,
            "Processing lock event"
        );

        let mut processing = Processing::default();

        let mint = self
            .executor
            .execute(
                id,
                &ScheduledOperation::Mint {
                    token,
                    amount: event.amount,
                },
            )
            .await;
        processing.push(record_submission(&self.repository, id, Leg::Mint, mint).await);

        let transfer = self
            .executor
            .execute(
                id,
                &ScheduledOperation::Transfer {
                    asset: Asset::Token(token),
                    transfers: vec![
                        AccountAmount::new(event.recipient, event.amount),
                        AccountAmount::new(self.bridge_account, -event.amount),
                    ],
                },
            )
            .await;
        processing.push(record_submission(&self.repository, id, Leg::Transfer, transfer).await);

        Ok(processing)
    }

    async fn wrapped_token(&self, event: &BridgeEvent) -> Result<TokenId, EventError> {
        let token: TokenId = event
            .wrapped_asset
            .parse()
            .map_err(|_| EventError::InvalidAsset {
                id: event.id.clone(),
                asset: event.wrapped_asset.clone(),
            })?;

        if let Err(source) = self.mirror.get_token(token).await {
            warn!(id = %event.id, token = %token, error = %source, "Wrapped token lookup failed");
            return Err(EventError::UnknownToken {
                id: event.id.clone(),
                asset: event.wrapped_asset.clone(),
                source,
            });
        }
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventStatus, InMemoryEventRepository};
    use crate::hedera::ScheduleOutcome;
    use crate::mock::{HederaCall, MockHederaNode, MockMirrorNode};
    use crate::scheduled::ScheduledState;
    use crate::types::{EntityId, ReceiptStatus};
    use tokio_util::sync::CancellationToken;

    const BRIDGE: EntityId = EntityId::new(0, 0, 476);

    struct Fixture {
        service: LockEventService,
        hedera: Arc<MockHederaNode>,
        mirror: Arc<MockMirrorNode>,
        repository: Arc<InMemoryEventRepository>,
    }

    fn fixture() -> Fixture {
        let hedera = Arc::new(MockHederaNode::new());
        let mirror = Arc::new(MockMirrorNode::new());
        let repository = Arc::new(InMemoryEventRepository::new());
        let executor = Arc::new(ScheduledExecutor::new(
            hedera.clone(),
            mirror.clone(),
            CancellationToken::new(),
        ));
        let service =
            LockEventService::new(BRIDGE, repository.clone(), executor, mirror.clone());
        Fixture {
            service,
            hedera,
            mirror,
            repository,
        }
    }

    fn event(id: &str) -> BridgeEvent {
        BridgeEvent {
            id: id.into(),
            amount: 111,
            recipient: EntityId::new(0, 0, 222222),
            native_asset: "0xb0b".into(),
            wrapped_asset: "0.0.5000".into(),
            source_chain_id: 80001,
            target_chain_id: 296,
        }
    }

    #[tokio::test]
    async fn test_mints_then_transfers() {
        let f = fixture();
        let processing = f.service.process_event(&event("0xa-0")).await.unwrap();
        processing.settled().await;

        let token = EntityId::new(0, 0, 5000);
        let calls = f.hedera.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[0],
            HederaCall::Mint {
                token,
                amount: 111,
                memo: "0xa-0".into()
            }
        );
        assert_eq!(
            calls[1],
            HederaCall::TokenTransfer {
                token,
                transfers: vec![
                    AccountAmount::new(EntityId::new(0, 0, 222222), 111),
                    AccountAmount::new(BRIDGE, -111),
                ],
                memo: "0xa-0".into()
            }
        );

        let record = f.repository.get("0xa-0").await.unwrap().unwrap();
        assert_eq!(record.status, EventStatus::Completed);
        assert!(record.mint.schedule_id.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_event_skipped() {
        let f = fixture();
        f.service.process_event(&event("dup")).await.unwrap().settled().await;
        let processing = f.service.process_event(&event("dup")).await.unwrap();

        assert!(processing.is_settled());
        assert_eq!(f.hedera.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_wrapped_asset_fails_both_legs() {
        let f = fixture();
        let mut e = event("bad");
        e.wrapped_asset = "not-a-token".into();

        let err = f.service.process_event(&e).await.unwrap_err();
        assert!(matches!(err, EventError::InvalidAsset { .. }));
        assert!(f.hedera.calls().is_empty());

        let record = f.repository.get("bad").await.unwrap().unwrap();
        assert_eq!(record.mint.state, ScheduledState::Failed);
        assert_eq!(record.transfer.state, ScheduledState::Failed);
    }

    #[tokio::test]
    async fn test_non_positive_amount_rejected() {
        let f = fixture();
        for amount in [0, -111] {
            let mut e = event("neg");
            e.amount = amount;

            let err = f.service.process_event(&e).await.unwrap_err();
            assert!(matches!(err, EventError::InvalidAmount { amount: a, .. } if a == amount));
        }
        assert!(f.hedera.calls().is_empty());
        assert!(f.repository.get("neg").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_token_fails() {
        let f = fixture();
        f.mirror.set_missing_token(EntityId::new(0, 0, 5000));

        let err = f.service.process_event(&event("gone")).await.unwrap_err();
        assert!(matches!(err, EventError::UnknownToken { .. }));
        assert_eq!(
            f.repository.get("gone").await.unwrap().unwrap().status,
            EventStatus::Failed
        );
    }

    #[tokio::test]
    async fn test_legs_fail_independently() {
        let f = fixture();
        f.hedera.push_create_status(ReceiptStatus::Success);
        f.hedera
            .push_create_status(ReceiptStatus::Other("INSUFFICIENT_TOKEN_BALANCE".into()));

        f.service.process_event(&event("split")).await.unwrap().settled().await;

        let record = f.repository.get("split").await.unwrap().unwrap();
        assert_eq!(record.mint.state, ScheduledState::Mined);
        assert_eq!(record.transfer.state, ScheduledState::Failed);
        assert_eq!(record.status, EventStatus::Failed);
    }

    #[tokio::test]
    async fn test_signed_legs_record_nothing() {
        let f = fixture();
        f.hedera
            .push_create_status(ReceiptStatus::IdenticalScheduleAlreadyCreated);
        f.hedera
            .push_create_status(ReceiptStatus::IdenticalScheduleAlreadyCreated);

        let processing = f.service.process_event(&event("peer")).await.unwrap();
        assert!(processing.is_settled());

        let record = f.repository.get("peer").await.unwrap().unwrap();
        assert_eq!(record.status, EventStatus::Initial);
    }

    #[tokio::test]
    async fn test_unknown_outcome_leaves_submitted() {
        let f = fixture();
        f.mirror.set_outcome(ScheduleOutcome::Unknown);

        f.service.process_event(&event("slow")).await.unwrap().settled().await;

        let record = f.repository.get("slow").await.unwrap().unwrap();
        assert_eq!(record.mint.state, ScheduledState::Submitted);
        assert_eq!(record.status, EventStatus::Submitted);
    }
}
