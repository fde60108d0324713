//! Event repository
//!
//! The SQL-backed implementation lives with the persistence layer; the
//! in-memory one here backs tests and local runs.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::types::{BridgeEvent, EventKind, EventRecord, Leg};
use crate::error::RepositoryError;
use crate::scheduled::ScheduledState;
use crate::types::{ScheduleId, TransactionId};

/// Event persistence. Every method is keyed by event id and safe to call
/// concurrently for the same id from both legs.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Insert the raw event. Returns `false` if the id already exists.
    async fn create(&self, kind: EventKind, event: &BridgeEvent) -> Result<bool, RepositoryError>;

    async fn get(&self, id: &str) -> Result<Option<EventRecord>, RepositoryError>;

    async fn update_status_scheduled_token_mint_submitted(
        &self,
        id: &str,
        schedule_id: &ScheduleId,
        transaction_id: &TransactionId,
    ) -> Result<(), RepositoryError>;

    async fn update_status_scheduled_token_mint_completed(
        &self,
        id: &str,
    ) -> Result<(), RepositoryError>;

    async fn update_status_scheduled_token_transfer_submitted(
        &self,
        id: &str,
        schedule_id: &ScheduleId,
        transaction_id: &TransactionId,
    ) -> Result<(), RepositoryError>;

    async fn update_status_scheduled_token_transfer_completed(
        &self,
        id: &str,
    ) -> Result<(), RepositoryError>;

    async fn update_status_failed(&self, id: &str, leg: Leg) -> Result<(), RepositoryError>;
}

/// DashMap-backed repository. Each update holds the row's shard lock, which
/// makes per-row transitions atomic.
#[derive(Debug, Default)]
pub struct InMemoryEventRepository {
    events: DashMap<String, EventRecord>,
}

impl InMemoryEventRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn transition(
        &self,
        id: &str,
        leg: Leg,
        next: ScheduledState,
        ids: Option<(&ScheduleId, &TransactionId)>,
    ) -> Result<(), RepositoryError> {
        let mut entry = self
            .events
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        let record = entry.value_mut();

        let current = record.leg(leg).state;
        if !current.can_transition_to(next) {
            return Err(RepositoryError::InvalidTransition {
                id: id.to_string(),
                from: current.as_str(),
                to: next.as_str(),
            });
        }

        let leg_record = record.leg_mut(leg);
        leg_record.state = next;
        if let Some((schedule_id, transaction_id)) = ids {
            leg_record.schedule_id = Some(schedule_id.clone());
            leg_record.transaction_id = Some(transaction_id.clone());
        }
        record.updated_at = Utc::now();
        record.refresh_status();
        Ok(())
    }
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn create(&self, kind: EventKind, event: &BridgeEvent) -> Result<bool, RepositoryError> {
        match self.events.entry(event.id.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(EventRecord::new(kind, event.clone()));
                Ok(true)
            }
        }
    }

    async fn get(&self, id: &str) -> Result<Option<EventRecord>, RepositoryError> {
        Ok(self.events.get(id).map(|r| r.value().clone()))
    }

    async fn update_status_scheduled_token_mint_submitted(
        &self,
        id: &str,
        schedule_id: &ScheduleId,
        transaction_id: &TransactionId,
    ) -> Result<(), RepositoryError> {
        self.transition(
            id,
            Leg::Mint,
            ScheduledState::Submitted,
            Some((schedule_id, transaction_id)),
        )
    }

    async fn update_status_scheduled_token_mint_completed(
        &self,
        id: &str,
    ) -> Result<(), RepositoryError> {
        self.transition(id, Leg::Mint, ScheduledState::Mined, None)
    }

    async fn update_status_scheduled_token_transfer_submitted(
        &self,
        id: &str,
        schedule_id: &ScheduleId,
        transaction_id: &TransactionId,
    ) -> Result<(), RepositoryError> {
        self.transition(
            id,
            Leg::Transfer,
            ScheduledState::Submitted,
            Some((schedule_id, transaction_id)),
        )
    }

    async fn update_status_scheduled_token_transfer_completed(
        &self,
        id: &str,
    ) -> Result<(), RepositoryError> {
        self.transition(id, Leg::Transfer, ScheduledState::Mined, None)
    }

    async fn update_status_failed(&self, id: &str, leg: Leg) -> Result<(), RepositoryError> {
        self.transition(id, leg, ScheduledState::Failed, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventStatus;
    use crate::types::EntityId;
    use std::sync::Arc;

    fn event(id: &str) -> BridgeEvent {
        BridgeEvent {
            id: id.into(),
            amount: 111,
            recipient: EntityId::new(0, 0, 222222),
            native_asset: "0.0.222222".into(),
            wrapped_asset: "0.0.0".into(),
            source_chain_id: 1,
            target_chain_id: 296,
        }
    }

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let repo = InMemoryEventRepository::new();
        assert!(repo.create(EventKind::Lock, &event("a")).await.unwrap());
        assert!(!repo.create(EventKind::Lock, &event("a")).await.unwrap());
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_create() {
        let repo = Arc::new(InMemoryEventRepository::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.create(EventKind::Lock, &event("dup")).await })
            })
            .collect();

        let mut inserted = 0;
        for h in handles {
            if h.await.unwrap().unwrap() {
                inserted += 1;
            }
        }
        assert_eq!(inserted, 1);
    }

    #[tokio::test]
    async fn test_leg_lifecycle() {
        let repo = InMemoryEventRepository::new();
        repo.create(EventKind::Lock, &event("e")).await.unwrap();
        let sid = ScheduleId("0.0.900".into());
        let tid = TransactionId("0.0.2@1.1".into());

        repo.update_status_scheduled_token_mint_submitted("e", &sid, &tid)
            .await
            .unwrap();
        repo.update_status_scheduled_token_transfer_submitted("e", &sid, &tid)
            .await
            .unwrap();
        repo.update_status_scheduled_token_mint_completed("e")
            .await
            .unwrap();
        assert_eq!(
            repo.get("e").await.unwrap().unwrap().status,
            EventStatus::Submitted
        );

        repo.update_status_scheduled_token_transfer_completed("e")
            .await
            .unwrap();
        let record = repo.get("e").await.unwrap().unwrap();
        assert_eq!(record.status, EventStatus::Completed);
        assert_eq!(record.mint.schedule_id, Some(sid));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_leg_updates_same_event() {
        let repo = Arc::new(InMemoryEventRepository::new());
        let ids: Vec<String> = (0..64).map(|i| format!("race-{i}")).collect();
        for id in &ids {
            repo.create(EventKind::Lock, &event(id)).await.unwrap();
        }

        let mut handles = Vec::new();
        for id in &ids {
            let (repo_m, id_m) = (repo.clone(), id.clone());
            handles.push(tokio::spawn(async move {
                let sid = ScheduleId(format!("0.0.{}", id_m.len()));
                let tid = TransactionId(format!("{id_m}-mint"));
                repo_m
                    .update_status_scheduled_token_mint_submitted(&id_m, &sid, &tid)
                    .await?;
                tokio::task::yield_now().await;
                repo_m.update_status_scheduled_token_mint_completed(&id_m).await
            }));

            let (repo_t, id_t) = (repo.clone(), id.clone());
            handles.push(tokio::spawn(async move {
                let sid = ScheduleId("0.0.77".into());
                let tid = TransactionId(format!("{id_t}-transfer"));
                repo_t
                    .update_status_scheduled_token_transfer_submitted(&id_t, &sid, &tid)
                    .await?;
                tokio::task::yield_now().await;
                repo_t.update_status_failed(&id_t, Leg::Transfer).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        for id in &ids {
            let record = repo.get(id).await.unwrap().unwrap();
            assert_eq!(record.mint.state, ScheduledState::Mined);
            assert_eq!(
                record.mint.transaction_id,
                Some(TransactionId(format!("{id}-mint")))
            );
            assert_eq!(record.transfer.state, ScheduledState::Failed);
            assert_eq!(
                record.transfer.transaction_id,
                Some(TransactionId(format!("{id}-transfer")))
            );
            assert_eq!(record.transfer.schedule_id, Some(ScheduleId("0.0.77".into())));
            assert_eq!(record.status, EventStatus::Failed);
        }
    }

    #[tokio::test]
    async fn test_terminal_leg_not_reopened() {
        let repo = InMemoryEventRepository::new();
        repo.create(EventKind::Lock, &event("t")).await.unwrap();
        repo.update_status_failed("t", Leg::Mint).await.unwrap();

        let err = repo
            .update_status_scheduled_token_mint_submitted(
                "t",
                &ScheduleId("0.0.1".into()),
                &TransactionId("x".into()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidTransition { .. }));

        // The other leg is unaffected
        repo.update_status_failed("t", Leg::Transfer).await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_id() {
        let repo = InMemoryEventRepository::new();
        assert!(matches!(
            repo.update_status_failed("nope", Leg::Mint).await,
            Err(RepositoryError::NotFound(_))
        ));
        assert!(repo.get("nope").await.unwrap().is_none());
    }
}
