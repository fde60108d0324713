//! Burn events
//!
//! A wrapped asset was burned on an EVM chain: release the Hedera-native
//! asset from the bridge account. The bridge fee is split off, distributed
//! between the validators and the treasury, and the resulting transfer list
//! is submitted in chunks of at most nine credits.

use std::sync::Arc;

use tracing::{info, warn};

use super::EventError;
use super::repository::EventRepository;
use super::tracking::{Processing, mark_failed, record_created, record_outcome};
use super::types::{BridgeEvent, EventKind, Leg};
use crate::fee::{Distributor, FeeCalculator};
use crate::scheduled::ScheduledExecutor;
use crate::types::{AccountAmount, AccountId, Asset, transfer_sum};

pub struct BurnEventService {
    bridge_account: AccountId,
    repository: Arc<dyn EventRepository>,
    executor: Arc<ScheduledExecutor>,
    fee_calculator: Arc<FeeCalculator>,
}

impl BurnEventService {
    pub fn new(
        bridge_account: AccountId,
        repository: Arc<dyn EventRepository>,
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

    /// Process a burn event.
    ///
    /// # Errors
    /// - [`EventError::InvalidAmount`] if the amount is not positive
    /// - [`EventError::Persist`] if the event row cannot be created
    /// - [`EventError::InvalidAsset`] / [`EventError::Fee`] if the release
    ///   cannot be computed; the transfer leg is failed
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
            .create(EventKind::Burn, event)
            .await
            .map_err(|source| EventError::Persist {
                id: id.to_string(),
                source,
            })?;
        if !inserted {
            info!(id, "Burn event already processed, skipping");
            return Ok(Processing::default());
        }

        let (asset, transfers) = match self.release_transfers(event) {
            Ok(release) => release,
            Err(e) => {
                mark_failed(self.repository.as_ref(), id, Leg::Transfer).await;
                return Err(e);
            }
        };

        let total = transfer_sum(&transfers) as i64;
        let negative = AccountAmount::new(self.bridge_account, -total);
        let chunks = Distributor::split_account_amounts(&transfers, negative);

        info!(
            id,
            amount = event.amount,
            asset = %asset,
            credits = transfers.len(),
            chunks = chunks.len(),
            "Processing burn event"
        );

        let batch = self.executor.execute_chunks(id, asset, chunks).await;

        if let Some(first) = batch.created.first() {
            record_created(
                self.repository.as_ref(),
                id,
                Leg::Transfer,
                &first.schedule_id,
                &first.transaction_id,
            )
            .await;
        }

        let mut processing = Processing::default();
        if batch.has_failures() {
            warn!(id, failed = batch.failed, "Burn transfer chunk failed");
            mark_failed(self.repository.as_ref(), id, Leg::Transfer).await;
            return Ok(processing);
        }

        let repository = self.repository.clone();
        let event_id = id.to_string();
        processing.push(Some(tokio::spawn(async move {
            if let Some(outcome) = batch.outcome().await {
                record_outcome(repository.as_ref(), &event_id, Leg::Transfer, outcome).await;
            }
        })));
        Ok(processing)
    }

    /// Credits of the release: recipient remainder first, then the fee
    /// distribution. Zero credits are dropped and repeated accounts merged.
    fn release_transfers(
        &self,
        event: &BridgeEvent,
    ) -> Result<(Asset, Vec<AccountAmount>), EventError> {
        let asset: Asset = event
            .native_asset
            .parse()
            .map_err(|_| EventError::InvalidAsset {
                id: event.id.clone(),
                asset: event.native_asset.clone(),
            })?;

        let fee_error = |source| EventError::Fee {
            id: event.id.clone(),
            source,
        };
        let split = self
            .fee_calculator
            .calculate_fee(&event.native_asset, event.amount)
            .map_err(fee_error)?;
        let distribution = self
            .fee_calculator
            .distributor()
            .calculate_member_distribution(split.fee)
            .map_err(fee_error)?;

        let mut credits: Vec<AccountAmount> = Vec::with_capacity(distribution.len() + 1);
        for credit in std::iter::once(AccountAmount::new(event.recipient, split.remainder))
            .chain(distribution)
            .filter(|c| c.amount > 0)
        {
            match credits.iter_mut().find(|c| c.account == credit.account) {
                Some(existing) => existing.amount += credit.amount,
                None => credits.push(credit),
            }
        }
        Ok((asset, credits))
    }
}
