//! Queue handlers wiring topics to the services

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, warn};

use crate::error::BridgeError;
use crate::event::{BurnEventService, LockEventService};
use crate::queue::{Handler, Payload};
use crate::transfer::FeeTransferService;

/// Mined outcomes are recorded by detached trackers; handlers return once
/// the scheduled legs are submitted.
pub struct LockEventHandler {
    service: Arc<LockEventService>,
}

impl LockEventHandler {
    pub fn new(service: Arc<LockEventService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Handler for LockEventHandler {
    async fn handle(&self, payload: Payload) {
        let Payload::Event(event) = payload else {
            warn!("Lock handler received a non-event payload");
            return;
        };
        if let Err(e) = self.service.process_event(&event).await {
            let e = BridgeError::from(e);
            error!(event_id = %event.id, code = e.code(), error = %e, "Lock event processing failed");
        }
    }
}

pub struct BurnEventHandler {
    service: Arc<BurnEventService>,
}

impl BurnEventHandler {
    pub fn new(service: Arc<BurnEventService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Handler for BurnEventHandler {
    async fn handle(&self, payload: Payload) {
        let Payload::Event(event) = payload else {
            warn!("Burn handler received a non-event payload");
            return;
        };
        if let Err(e) = self.service.process_event(&event).await {
            let e = BridgeError::from(e);
            error!(event_id = %event.id, code = e.code(), error = %e, "Burn event processing failed");
        }
    }
}

pub struct FeeTransferHandler {
    service: Arc<FeeTransferService>,
}

impl FeeTransferHandler {
    pub fn new(service: Arc<FeeTransferService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Handler for FeeTransferHandler {
    async fn handle(&self, payload: Payload) {
        let Payload::Transfer(record) = payload else {
            warn!("Fee transfer handler received a non-transfer payload");
            return;
        };
        if let Err(e) = self.service.process(&record).await {
            let e = BridgeError::from(e);
            error!(
                transfer_id = %record.transaction_id,
                code = e.code(),
                error = %e,
                "Fee transfer processing failed"
            );
        }
    }
}
