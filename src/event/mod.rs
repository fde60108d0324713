//! Bridge Event Services
//!
//! - [`types`] - decoded events and their persisted records
//! - [`repository`] - event persistence with per-leg transitions
//! - [`lock`] - lock events: scheduled mint, then scheduled transfer
//! - [`burn`] - burn events: fee split and chunked scheduled transfer
//!
//! Each service creates the event row first (the dedupe point), then drives
//! its scheduled legs through [`ScheduledExecutor`](crate::scheduled::ScheduledExecutor)
//! and records every submission and outcome against the leg it belongs to.

pub mod burn;
pub mod lock;
pub mod repository;
mod tracking;
pub mod types;

pub use burn::BurnEventService;
pub use lock::LockEventService;
pub use repository::{EventRepository, InMemoryEventRepository};
pub use tracking::Processing;
pub use types::{BridgeEvent, EventKind, EventRecord, EventStatus, Leg, LegRecord};

use thiserror::Error;

use crate::error::{ClientError, RepositoryError};
use crate::fee::FeeError;

#[derive(Debug, Error)]
pub enum EventError {
    #[error("Failed to persist event {id}: {source}")]
    Persist {
        id: String,
        #[source]
        source: RepositoryError,
    },

    #[error("Event {id} carries non-positive amount {amount}")]
    InvalidAmount { id: String, amount: i64 },

    #[error("Event {id} carries invalid asset {asset}")]
    InvalidAsset { id: String, asset: String },

    #[error("Wrapped token {asset} of event {id} is unknown: {source}")]
    UnknownToken {
        id: String,
        asset: String,
        #[source]
        source: ClientError,
    },

    #[error("Fee calculation failed for event {id}: {source}")]
    Fee {
        id: String,
        #[source]
        source: FeeError,
    },
}
