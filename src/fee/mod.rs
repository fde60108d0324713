//! Fee Module
//!
//! - [`distributor`] - validator/treasury reward split and transfer-list chunking
//! - [`calculator`] - per-asset bridge fee computation
//!
//! Fee percentages use 10^5 precision: 1_000 = 1.000%

pub mod calculator;
pub mod distributor;

pub use calculator::{FeeCalculator, FeeSplit};
pub use distributor::{Distributor, MAX_POSITIVE_TRANSFERS_PER_TX};

use thiserror::Error;

/// Fee percentage precision (10^5 = 100%)
pub const FEE_MAX_PERCENTAGE: u32 = 100_000;

/// Validator and treasury reward percentages must add up to this
pub const TOTAL_REWARD_PERCENTAGE: u32 = 100;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FeeError {
    #[error("Validator set is empty")]
    NoMembers,

    #[error("Reward percentages must sum to 100 (validator {validator} + treasury {treasury})")]
    InvalidPercentages { validator: u32, treasury: u32 },

    #[error("Amount must not be negative: {0}")]
    NegativeAmount(i64),

    #[error("Amount {amount} is not divisible between {members} members")]
    AmountNotDivisible { amount: i64, members: usize },

    #[error("No fee percentage configured for asset {0}")]
    UnknownAsset(String),

    #[error("Fee percentage {0} exceeds {FEE_MAX_PERCENTAGE}")]
    InvalidFeePercentage(u32),

    #[error("Amount {0} does not cover the bridge fee")]
    InsufficientFee(i64),
}
