//! Scheduled Transactions
//!
//! - [`executor`] - create-or-sign submission and the mined watch
//! - [`batch`] - chunked transfers, one schedule per chunk
//! - [`state`] - per-leg lifecycle persisted by the event services

pub mod batch;
pub mod executor;
pub mod state;

pub use batch::{BatchSubmission, CreatedChunk};
pub use executor::{Completion, ScheduledExecutor, ScheduledOperation, Submission};
pub use state::ScheduledState;
