//! Bridge Validator Core
//!
//! Validator-side core of a Hedera <-> EVM asset bridge: every validator
//! independently observes lock/burn events and converges with its peers on a
//! single Hedera scheduled transaction per action.
//!
//! # Modules
//!
//! - [`types`] - Hedera entity ids, transfers, receipts
//! - [`retry`] - Race-with-timeout retry primitive
//! - [`fee`] - Fee calculation, validator/treasury distribution, chunking
//! - [`scheduled`] - Scheduled transaction executor (create-or-sign)
//! - [`event`] - Lock and burn event services
//! - [`transfer`] - Hedera -> EVM transfer records and fee payout
//! - [`hedera`] / [`evm`] - Collaborator contracts
//! - [`registry`] - Network and asset registries
//! - [`queue`] / [`handlers`] / [`watcher`] - Event intake and routing
//! - [`config`] / [`logging`] - Boot-time configuration and tracing setup

// Core types - must be first!
pub mod types;

pub mod error;
pub mod retry;

// Domain
pub mod event;
pub mod fee;
pub mod scheduled;
pub mod transfer;

// Collaborators
pub mod evm;
pub mod hedera;
#[cfg(any(test, feature = "mock-clients"))]
pub mod mock;

// Intake
pub mod handlers;
pub mod queue;
pub mod registry;
pub mod watcher;

pub mod config;
pub mod logging;

// Convenient re-exports at crate root
pub use config::BridgeConfig;
pub use error::{BridgeError, ClientError, RepositoryError};
pub use event::{BridgeEvent, BurnEventService, EventRepository, LockEventService};
pub use fee::{Distributor, FeeCalculator};
pub use retry::{RetryError, RetryPolicy, retry};
pub use scheduled::{ScheduledExecutor, ScheduledOperation, Submission};
pub use types::{AccountAmount, AccountId, Asset, EntityId, TokenId};
