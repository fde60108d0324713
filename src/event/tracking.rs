//! Recording submissions and outcomes against event legs

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::repository::EventRepository;
use super::types::Leg;
use crate::error::RepositoryError;
use crate::hedera::ScheduleOutcome;
use crate::scheduled::{Completion, Submission};
use crate::types::{ScheduleId, TransactionId};

/// Mined watches still running for a processed event
#[derive(Debug, Default)]
pub struct Processing {
    trackers: Vec<JoinHandle<()>>,
}

impl Processing {
    pub(crate) fn push(&mut self, tracker: Option<JoinHandle<()>>) {
        self.trackers.extend(tracker);
    }

    /// Nothing left to record: duplicate event, or every leg was signed or
    /// failed synchronously
    pub fn is_settled(&self) -> bool {
        self.trackers.is_empty()
    }

    /// Wait until every outcome has been recorded
    pub async fn settled(self) {
        for tracker in self.trackers {
            if let Err(e) = tracker.await {
                error!(error = %e, "Outcome tracker panicked");
            }
        }
    }
}

async fn mark_submitted(
    repository: &dyn EventRepository,
    id: &str,
    leg: Leg,
    schedule_id: &ScheduleId,
    transaction_id: &TransactionId,
) -> Result<(), RepositoryError> {
    match leg {
        Leg::Mint => {
            repository
                .update_status_scheduled_token_mint_submitted(id, schedule_id, transaction_id)
                .await
        }
        Leg::Transfer => {
            repository
                .update_status_scheduled_token_transfer_submitted(id, schedule_id, transaction_id)
                .await
        }
    }
}

async fn mark_completed(
    repository: &dyn EventRepository,
    id: &str,
    leg: Leg,
) -> Result<(), RepositoryError> {
    match leg {
        Leg::Mint => repository.update_status_scheduled_token_mint_completed(id).await,
        Leg::Transfer => {
            repository
                .update_status_scheduled_token_transfer_completed(id)
                .await
        }
    }
}

/// Mark `leg` failed. Repository errors are logged, never propagated.
pub(crate) async fn mark_failed(repository: &dyn EventRepository, id: &str, leg: Leg) {
    if let Err(e) = repository.update_status_failed(id, leg).await {
        error!(id, leg = leg.as_str(), error = %e, "Failed to mark leg failed");
    }
}

/// Persist the schedule ids of a leg this node created
pub(crate) async fn record_created(
    repository: &dyn EventRepository,
    id: &str,
    leg: Leg,
    schedule_id: &ScheduleId,
    transaction_id: &TransactionId,
) {
    if let Err(e) = mark_submitted(repository, id, leg, schedule_id, transaction_id).await {
        error!(
            id,
            leg = leg.as_str(),
            schedule_id = %schedule_id,
            error = %e,
            "Failed to mark leg submitted"
        );
    }
}

/// Persist a terminal outcome. `Unknown` and `Cancelled` leave the leg
/// SUBMITTED for a later sweep.
pub(crate) async fn record_outcome(
    repository: &dyn EventRepository,
    id: &str,
    leg: Leg,
    outcome: ScheduleOutcome,
) {
    match outcome {
        ScheduleOutcome::Mined => {
            info!(id, leg = leg.as_str(), "Scheduled leg mined");
            if let Err(e) = mark_completed(repository, id, leg).await {
                error!(id, leg = leg.as_str(), error = %e, "Failed to mark leg completed");
            }
        }
        ScheduleOutcome::Failed => {
            warn!(id, leg = leg.as_str(), "Scheduled leg failed on-chain");
            mark_failed(repository, id, leg).await;
        }
        ScheduleOutcome::Unknown | ScheduleOutcome::Cancelled => {
            warn!(
                id,
                leg = leg.as_str(),
                outcome = outcome.as_str(),
                "No outcome for scheduled leg, left submitted"
            );
        }
    }
}

/// Spawn the task that waits on `completion` and records its outcome
pub(crate) fn track(
    repository: Arc<dyn EventRepository>,
    id: &str,
    leg: Leg,
    completion: Completion,
) -> JoinHandle<()> {
    let id = id.to_string();
    tokio::spawn(async move {
        let outcome = completion.wait().await;
        record_outcome(repository.as_ref(), &id, leg, outcome).await;
    })
}

/// Record a single-schedule submission and start tracking it if this node
/// created the schedule
pub(crate) async fn record_submission(
    repository: &Arc<dyn EventRepository>,
    id: &str,
    leg: Leg,
    submission: Submission,
) -> Option<JoinHandle<()>> {
    match submission {
        Submission::Created {
            transaction_id,
            schedule_id,
            completion,
        } => {
            record_created(repository.as_ref(), id, leg, &schedule_id, &transaction_id).await;
            Some(track(repository.clone(), id, leg, completion))
        }
        Submission::Signed { .. } | Submission::SignRejected { .. } => None,
        Submission::Failed { .. } => {
            mark_failed(repository.as_ref(), id, leg).await;
            None
        }
    }
}
