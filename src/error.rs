//! Error types for the state transfer engine.

use crate::types::{Address, Epoch};
use thiserror::Error;

/// Result type alias for state transfer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the state transfer engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A transfer segment was built with negative or inverted bounds, or with
    /// a status that cannot describe its range.
    #[error("invalid transfer segment [{start}, {end}]: {reason}")]
    InvalidSegment {
        start: Address,
        end: Address,
        reason: String,
    },

    /// Configuration errors.
    #[error("config error: {0}")]
    InvalidConfig(String),

    /// A layout document violates its structural invariants.
    #[error("invalid layout: {0}")]
    InvalidLayout(String),

    /// A layout proposal was rejected because a newer epoch is already committed.
    #[error("stale epoch: proposed {proposed}, current {current}")]
    StaleEpoch { proposed: Epoch, current: Epoch },

    /// Copying a batch of addresses from a remote replica failed.
    #[error("transfer failed: {0}")]
    Transfer(String),

    /// The operation was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// A reconciliation cycle is already running.
    #[error("reconciliation cycle already in progress")]
    CycleInProgress,

    /// An internal invariant was violated.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the condition is expected to clear on a later attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Transfer(_)
                | Error::StaleEpoch { .. }
                | Error::Cancelled
                | Error::CycleInProgress
        )
    }
}
