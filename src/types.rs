//! Hedera Core Types
//!
//! Entity ids, transfer line-items and receipt classification shared by
//! every layer of the validator.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sentinel asset id for the Hedera native currency
pub const HBAR: &str = "HBAR";

/// Returns true when `asset` denotes native HBAR rather than an HTS token
#[inline]
pub fn is_hbar(asset: &str) -> bool {
    asset == HBAR
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid entity id: {0}")]
pub struct InvalidEntityId(pub String);

/// Hedera entity id in `shard.realm.num` form
///
/// Accounts, tokens and schedules all share this shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId {
    pub shard: u64,
    pub realm: u64,
    pub num: u64,
}

pub type AccountId = EntityId;
pub type TokenId = EntityId;

impl EntityId {
    pub const fn new(shard: u64, realm: u64, num: u64) -> Self {
        Self { shard, realm, num }
    }
}

impl FromStr for EntityId {
    type Err = InvalidEntityId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('.');
        let mut next = || {
            parts
                .next()
                .and_then(|p| p.parse::<u64>().ok())
                .ok_or_else(|| InvalidEntityId(s.to_string()))
        };
        let id = Self::new(next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(InvalidEntityId(s.to_string()));
        }
        Ok(id)
    }
}

impl TryFrom<String> for EntityId {
    type Error = InvalidEntityId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.to_string()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.shard, self.realm, self.num)
    }
}

/// Hedera transaction id, e.g. `0.0.1234@1620000000.000000001`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionId(pub String);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Id of a scheduled entity created by a ScheduleCreate transaction
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScheduleId(pub String);

impl fmt::Display for ScheduleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hedera-side asset: native HBAR or an HTS token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Asset {
    Hbar,
    Token(TokenId),
}

impl FromStr for Asset {
    type Err = InvalidEntityId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if is_hbar(s) {
            Ok(Asset::Hbar)
        } else {
            Ok(Asset::Token(s.parse()?))
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Hbar => f.write_str(HBAR),
            Asset::Token(token) => write!(f, "{token}"),
        }
    }
}

/// One line of a Hedera transfer list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountAmount {
    pub account: AccountId,
    pub amount: i64,
}

impl AccountAmount {
    pub const fn new(account: AccountId, amount: i64) -> Self {
        Self { account, amount }
    }
}

/// Sum of a transfer list. A submittable list sums to zero.
pub fn transfer_sum(transfers: &[AccountAmount]) -> i128 {
    transfers.iter().map(|t| t.amount as i128).sum()
}

/// Receipt status as reported by a consensus node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptStatus {
    Success,
    /// Another validator already created the identical schedule
    IdenticalScheduleAlreadyCreated,
    ScheduleAlreadyExecuted,
    Other(String),
}

impl ReceiptStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ReceiptStatus::Success => "SUCCESS",
            ReceiptStatus::IdenticalScheduleAlreadyCreated => "IDENTICAL_SCHEDULE_ALREADY_CREATED",
            ReceiptStatus::ScheduleAlreadyExecuted => "SCHEDULE_ALREADY_EXECUTED",
            ReceiptStatus::Other(s) => s,
        }
    }
}

impl From<&str> for ReceiptStatus {
    fn from(s: &str) -> Self {
        match s {
            "SUCCESS" => ReceiptStatus::Success,
            "IDENTICAL_SCHEDULE_ALREADY_CREATED" => ReceiptStatus::IdenticalScheduleAlreadyCreated,
            "SCHEDULE_ALREADY_EXECUTED" => ReceiptStatus::ScheduleAlreadyExecuted,
            other => ReceiptStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ReceiptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transaction receipt
///
/// `schedule_id` and `scheduled_transaction_id` are populated for
/// ScheduleCreate receipts, including the `IdenticalScheduleAlreadyCreated`
/// case where they point at the existing schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub status: ReceiptStatus,
    pub schedule_id: Option<ScheduleId>,
    pub scheduled_transaction_id: Option<TransactionId>,
}

impl Receipt {
    pub fn with_status(status: ReceiptStatus) -> Self {
        Self {
            status,
            schedule_id: None,
            scheduled_transaction_id: None,
        }
    }
}
