//! Scheduled Transaction States
//!
//! State IDs are stable for storage as SMALLINT.

use std::fmt;

/// Lifecycle of one scheduled leg
///
/// ```text
/// NOT_SUBMITTED → SUBMITTED → MINED
///       ↓             ↓
///     FAILED  ←───────┘
/// ```
///
/// Terminal states: MINED (20), FAILED (-10)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum ScheduledState {
    /// Nothing submitted by this node yet
    NotSubmitted = 0,

    /// Schedule created; waiting for the scheduled transaction to execute
    Submitted = 10,

    /// Terminal: scheduled transaction executed successfully
    Mined = 20,

    /// Terminal: submission rejected or scheduled execution failed
    Failed = -10,
}

impl ScheduledState {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScheduledState::Mined | ScheduledState::Failed)
    }

    /// Whether `self -> next` is a legal move. Terminal states never reopen.
    pub fn can_transition_to(&self, next: ScheduledState) -> bool {
        matches!(
            (self, next),
            (ScheduledState::NotSubmitted, ScheduledState::Submitted)
                | (ScheduledState::NotSubmitted, ScheduledState::Failed)
                | (ScheduledState::Submitted, ScheduledState::Mined)
                | (ScheduledState::Submitted, ScheduledState::Failed)
        )
    }

    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(ScheduledState::NotSubmitted),
            10 => Some(ScheduledState::Submitted),
            20 => Some(ScheduledState::Mined),
            -10 => Some(ScheduledState::Failed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduledState::NotSubmitted => "NOT_SUBMITTED",
            ScheduledState::Submitted => "SUBMITTED",
            ScheduledState::Mined => "MINED",
            ScheduledState::Failed => "FAILED",
        }
    }
}

impl fmt::Display for ScheduledState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<i16> for ScheduledState {
    type Error = ();

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        ScheduledState::from_id(value).ok_or(())
    }
}
