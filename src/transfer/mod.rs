//! Hedera -> EVM Transfers
//!
//! - [`status`] - transfer lifecycle, stored as upper-case strings
//! - [`record`] - the persisted transfer
//! - [`repository`] - persistence
//! - [`fee`] - bridge fee payout to validators and treasury

pub mod fee;
pub mod record;
pub mod repository;
pub mod status;

pub use fee::FeeTransferService;
pub use record::TransferRecord;
pub use repository::{InMemoryTransferRepository, TransferRepository};
pub use status::{TransferStatus, UnknownStatus};

use thiserror::Error;

use crate::error::RepositoryError;
use crate::fee::FeeError;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Failed to persist transfer {id}: {source}")]
    Persist {
        id: String,
        #[source]
        source: RepositoryError,
    },

    #[error("Transfer {id} has invalid amount {amount}")]
    InvalidAmount { id: String, amount: String },

    #[error("Transfer {id} carries invalid asset {asset}")]
    InvalidAsset { id: String, asset: String },

    #[error("Fee calculation failed for transfer {id}: {source}")]
    Fee {
        id: String,
        #[source]
        source: FeeError,
    },
}
