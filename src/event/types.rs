//! Bridge event records

use std::fmt;

use chrono::{DateTime, Utc};

use crate::scheduled::ScheduledState;
use crate::types::{AccountId, ScheduleId, TransactionId};

/// Lock or burn observed on a source chain, already decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeEvent {
    /// Source tx hash + log index, or Hedera tx id
    pub id: String,
    pub amount: i64,
    pub recipient: AccountId,
    pub native_asset: String,
    pub wrapped_asset: String,
    pub source_chain_id: u64,
    pub target_chain_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// EVM-native asset locked; wrapped token minted + transferred on Hedera
    Lock,
    /// Wrapped asset burned on EVM; Hedera-native asset released
    Burn,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Lock => "LOCK",
            EventKind::Burn => "BURN",
        }
    }
}

/// Scheduled leg of an event, selected by tx-type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Leg {
    Mint,
    Transfer,
}

impl Leg {
    pub fn as_str(&self) -> &'static str {
        match self {
            Leg::Mint => "mint",
            Leg::Transfer => "transfer",
        }
    }
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventStatus {
    Initial,
    Submitted,
    Completed,
    Failed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Initial => "INITIAL",
            EventStatus::Submitted => "SUBMITTED",
            EventStatus::Completed => "COMPLETED",
            EventStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, EventStatus::Completed | EventStatus::Failed)
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegRecord {
    pub state: ScheduledState,
    pub schedule_id: Option<ScheduleId>,
    pub transaction_id: Option<TransactionId>,
}

impl Default for LegRecord {
    fn default() -> Self {
        Self {
            state: ScheduledState::NotSubmitted,
            schedule_id: None,
            transaction_id: None,
        }
    }
}

/// Persisted event with independent mint and transfer tracks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub event: BridgeEvent,
    pub kind: EventKind,
    pub status: EventStatus,
    pub mint: LegRecord,
    pub transfer: LegRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventRecord {
    pub fn new(kind: EventKind, event: BridgeEvent) -> Self {
        let now = Utc::now();
        Self {
            event,
            kind,
            status: EventStatus::Initial,
            mint: LegRecord::default(),
            transfer: LegRecord::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn leg(&self, leg: Leg) -> &LegRecord {
        match leg {
            Leg::Mint => &self.mint,
            Leg::Transfer => &self.transfer,
        }
    }

    pub fn leg_mut(&mut self, leg: Leg) -> &mut LegRecord {
        match leg {
            Leg::Mint => &mut self.mint,
            Leg::Transfer => &mut self.transfer,
        }
    }

    /// Legs that must be mined for the event to complete
    pub fn required_legs(&self) -> &'static [Leg] {
        match self.kind {
            EventKind::Lock => &[Leg::Mint, Leg::Transfer],
            EventKind::Burn => &[Leg::Transfer],
        }
    }

    /// Derive the overall status from the leg states.
    ///
    /// A failed leg fails the event even when the other leg was mined; the
    /// leg records keep the divergence visible.
    pub fn refresh_status(&mut self) {
        let legs: Vec<ScheduledState> = self
            .required_legs()
            .iter()
            .map(|l| self.leg(*l).state)
            .collect();

        self.status = if legs.contains(&ScheduledState::Failed) {
            EventStatus::Failed
        } else if legs.iter().all(|s| *s == ScheduledState::Mined) {
            EventStatus::Completed
        } else if legs.iter().any(|s| *s != ScheduledState::NotSubmitted) {
            EventStatus::Submitted
        } else {
            EventStatus::Initial
        };
    }
}
