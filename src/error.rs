//! Error Types
//!
//! Shared error types for collaborator calls and persistence, plus the
//! umbrella [`BridgeError`] used at the handler and binary edges.

use thiserror::Error;

use crate::config::ConfigError;
use crate::event::EventError;
use crate::fee::FeeError;
use crate::transfer::TransferError;

/// Failure of an outbound call to a mirror node, consensus node or EVM RPC
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Call timed out")]
    Timeout,

    #[error("Too many retries ({0} attempts timed out)")]
    TooManyRetries(u32),

    #[error("Call cancelled")]
    Cancelled,

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("All {0} endpoints failed")]
    AllEndpointsFailed(usize),
}

impl ClientError {
    /// Transient errors are absorbed by retries and never surfaced to users
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ClientError::Connection(_) | ClientError::Timeout | ClientError::TooManyRetries(_)
        )
    }
}

/// Repository failure
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Invalid status transition for {id}: {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: &'static str,
        to: &'static str,
    },
}

/// Umbrella error
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Fee error: {0}")]
    Fee(#[from] FeeError),

    #[error("Event error: {0}")]
    Event(#[from] EventError),

    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),
}

impl BridgeError {
    /// Stable error code for logs and operator tooling
    pub fn code(&self) -> &'static str {
        match self {
            BridgeError::Config(_) => "CONFIG_ERROR",
            BridgeError::Client(e) if e.is_transient() => "UPSTREAM_UNAVAILABLE",
            BridgeError::Client(_) => "UPSTREAM_ERROR",
            BridgeError::Repository(_) => "REPOSITORY_ERROR",
            BridgeError::Fee(FeeError::AmountNotDivisible { .. }) => "AMOUNT_NOT_DIVISIBLE",
            BridgeError::Fee(_) => "FEE_ERROR",
            BridgeError::Event(_) => "EVENT_ERROR",
            BridgeError::Transfer(_) => "TRANSFER_ERROR",
        }
    }
}
