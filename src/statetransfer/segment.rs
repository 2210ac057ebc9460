//! Transfer segments: address ranges under restoration and their status.
//!
//! Segments are immutable values. Progress is recorded by building a
//! replacement segment with a new status, never by mutating one in place.

use crate::error::{Error, Result};
use crate::types::{range_len, Address};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Restoration state of a transfer segment.
///
/// The declaration order is the merge lattice:
/// `NotTransferred < Transferred < Failed < Restored`.
///
/// ```text
///                 all batches ok                 layout committed
/// NotTransferred ───────────────► Transferred ──────────────────► Restored
///       │                              ▲
///       │ batch failed                 │ retry ok
///       ▼                              │
///     Failed ──────────────────────────┘
///       ▲  │
///       └──┘ retry failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SegmentState {
    /// No transfer has completed yet.
    NotTransferred,
    /// Data copied; the layout does not yet list this node as a holder.
    Transferred,
    /// The last transfer attempt failed.
    Failed,
    /// Data copied and the layout reflects the new holder.
    Restored,
}

impl fmt::Display for SegmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentState::NotTransferred => write!(f, "not_transferred"),
            SegmentState::Transferred => write!(f, "transferred"),
            SegmentState::Failed => write!(f, "failed"),
            SegmentState::Restored => write!(f, "restored"),
        }
    }
}

impl SegmentState {
    /// Whether the next cycle should attempt a transfer for this state.
    pub fn needs_transfer(&self) -> bool {
        matches!(self, SegmentState::NotTransferred | SegmentState::Failed)
    }

    /// Whether every address has been copied.
    pub fn is_fully_copied(&self) -> bool {
        matches!(self, SegmentState::Transferred | SegmentState::Restored)
    }
}

/// Why a segment's last transfer attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransferSegmentFailure {
    /// Human readable cause, usually the collaborator's error.
    pub cause: String,
}

impl TransferSegmentFailure {
    /// Create a failure record.
    pub fn new(cause: impl Into<String>) -> Self {
        Self {
            cause: cause.into(),
        }
    }
}

impl From<&Error> for TransferSegmentFailure {
    fn from(err: &Error) -> Self {
        Self::new(err.to_string())
    }
}

impl fmt::Display for TransferSegmentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cause)
    }
}

/// State, progress, and failure cause of a transfer segment.
///
/// A failure cause is present exactly when the state is `Failed`; the
/// constructors make any other combination unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransferSegmentStatus {
    segment_state: SegmentState,
    total_transferred: u64,
    cause_of_failure: Option<TransferSegmentFailure>,
}

impl TransferSegmentStatus {
    /// Nothing confirmed yet, apart from `total_transferred` addresses.
    pub fn not_transferred(total_transferred: u64) -> Self {
        Self {
            segment_state: SegmentState::NotTransferred,
            total_transferred,
            cause_of_failure: None,
        }
    }

    /// Every one of the `total_transferred` addresses was copied.
    pub fn transferred(total_transferred: u64) -> Self {
        Self {
            segment_state: SegmentState::Transferred,
            total_transferred,
            cause_of_failure: None,
        }
    }

    /// A transfer attempt failed after copying `total_transferred` addresses.
    pub fn failed(total_transferred: u64, cause: TransferSegmentFailure) -> Self {
        Self {
            segment_state: SegmentState::Failed,
            total_transferred,
            cause_of_failure: Some(cause),
        }
    }

    /// The range is fully redundant on this node.
    pub fn restored(total_transferred: u64) -> Self {
        Self {
            segment_state: SegmentState::Restored,
            total_transferred,
            cause_of_failure: None,
        }
    }

    /// Current state.
    pub fn segment_state(&self) -> SegmentState {
        self.segment_state
    }

    /// Addresses copied so far.
    pub fn total_transferred(&self) -> u64 {
        self.total_transferred
    }

    /// Failure cause, present only in the `Failed` state.
    pub fn cause_of_failure(&self) -> Option<&TransferSegmentFailure> {
        self.cause_of_failure.as_ref()
    }

    /// The same status with progress capped at `max` addresses.
    pub(crate) fn clamp_total(&self, max: u64) -> Self {
        Self {
            total_transferred: self.total_transferred.min(max),
            ..self.clone()
        }
    }
}

/// An inclusive address range under restoration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransferSegment {
    start_address: Address,
    end_address: Address,
    status: TransferSegmentStatus,
}

impl TransferSegment {
    /// Create a segment, rejecting bounds or progress that cannot exist.
    ///
    /// Both bounds must be non-negative with `start <= end`. A fully copied
    /// segment must report every address as transferred, and no segment may
    /// report more addresses than it spans.
    pub fn new(start_address: Address, end_address: Address, status: TransferSegmentStatus) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidSegment {
            start: start_address,
            end: end_address,
            reason,
        };

        if start_address < 0 {
            return Err(invalid("start address is negative".to_string()));
        }
        if end_address < 0 {
            return Err(invalid("end address is negative".to_string()));
        }
        if start_address > end_address {
            return Err(invalid("start address is after end address".to_string()));
        }

        let len = range_len(start_address, end_address);
        if status.segment_state.is_fully_copied() && status.total_transferred != len {
            return Err(invalid(format!(
                "{} segment reports {} of {} addresses transferred",
                status.segment_state, status.total_transferred, len
            )));
        }
        if status.total_transferred > len {
            return Err(invalid(format!(
                "{} addresses transferred exceeds segment length {}",
                status.total_transferred, len
            )));
        }

        Ok(Self {
            start_address,
            end_address,
            status,
        })
    }

    /// Start building a segment field by field.
    pub fn builder() -> TransferSegmentBuilder {
        TransferSegmentBuilder::default()
    }

    /// A segment with nothing copied yet.
    pub fn not_transferred(start_address: Address, end_address: Address) -> Result<Self> {
        Self::new(start_address, end_address, TransferSegmentStatus::not_transferred(0))
    }

    /// A segment already fully redundant on this node.
    pub fn restored(start_address: Address, end_address: Address) -> Result<Self> {
        Self::new(
            start_address,
            end_address,
            TransferSegmentStatus::restored(range_len(start_address, end_address)),
        )
    }

    /// First address of the range.
    pub fn start_address(&self) -> Address {
        self.start_address
    }

    /// Last address of the range (inclusive).
    pub fn end_address(&self) -> Address {
        self.end_address
    }

    /// Current status.
    pub fn status(&self) -> &TransferSegmentStatus {
        &self.status
    }

    /// Shorthand for `status().segment_state()`.
    pub fn state(&self) -> SegmentState {
        self.status.segment_state
    }

    /// Number of addresses in the range.
    pub fn len(&self) -> u64 {
        range_len(self.start_address, self.end_address)
    }

    /// Always false; a valid segment spans at least one address.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether the ranges share at least one address.
    pub fn overlaps(&self, other: &TransferSegment) -> bool {
        self.start_address <= other.end_address && other.start_address <= self.end_address
    }

    /// A replacement segment over the same range.
    pub fn with_status(&self, status: TransferSegmentStatus) -> Result<Self> {
        Self::new(self.start_address, self.end_address, status)
    }

    /// Replacement after a transfer attempt that copied `transferred` addresses.
    ///
    /// Without a failure, a complete copy moves the segment to `Transferred`;
    /// a short copy is itself a failure. Progress never moves backwards.
    pub fn after_transfer(
        &self,
        transferred: u64,
        failure: Option<TransferSegmentFailure>,
    ) -> Result<Self> {
        if !self.state().needs_transfer() {
            return Err(Error::Internal(format!(
                "segment [{}, {}] in state {} is not eligible for transfer",
                self.start_address,
                self.end_address,
                self.state()
            )));
        }

        let len = self.len();
        let total = transferred.max(self.status.total_transferred).min(len);

        let status = match failure {
            None if total == len => TransferSegmentStatus::transferred(len),
            None => TransferSegmentStatus::failed(
                total,
                TransferSegmentFailure::new(format!(
                    "transferred {} of {} addresses",
                    total, len
                )),
            ),
            Some(cause) => TransferSegmentStatus::failed(total, cause),
        };
        self.with_status(status)
    }

    /// Replacement after an attempt was abandoned, crediting what was copied.
    ///
    /// The state is left as it was; only progress moves forward.
    pub fn after_cancellation(&self, transferred: u64) -> Result<Self> {
        let total = transferred.max(self.status.total_transferred).min(self.len());
        let status = TransferSegmentStatus {
            total_transferred: total,
            ..self.status.clone()
        };
        self.with_status(status)
    }

    /// Replacement once the layout lists this node for the whole range.
    pub fn mark_restored(&self) -> Result<Self> {
        match self.state() {
            SegmentState::Transferred | SegmentState::Restored => {
                self.with_status(TransferSegmentStatus::restored(self.len()))
            }
            state => Err(Error::Internal(format!(
                "segment [{}, {}] cannot be restored from state {}",
                self.start_address, self.end_address, state
            ))),
        }
    }
}

impl fmt::Display for TransferSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}] {} ({}/{})",
            self.start_address,
            self.end_address,
            self.state(),
            self.status.total_transferred,
            self.len()
        )?;
        if let Some(failure) = &self.status.cause_of_failure {
            write!(f, ": {}", failure)?;
        }
        Ok(())
    }
}

/// Field-by-field construction of a [`TransferSegment`].
#[derive(Debug, Clone, Default)]
pub struct TransferSegmentBuilder {
    start_address: Option<Address>,
    end_address: Option<Address>,
    status: Option<TransferSegmentStatus>,
}

impl TransferSegmentBuilder {
    /// Set the first address.
    pub fn start_address(mut self, address: Address) -> Self {
        self.start_address = Some(address);
        self
    }

    /// Set the last address (inclusive).
    pub fn end_address(mut self, address: Address) -> Self {
        self.end_address = Some(address);
        self
    }

    /// Set the status.
    pub fn status(mut self, status: TransferSegmentStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Validate and build the segment.
    pub fn build(self) -> Result<TransferSegment> {
        let start = self.start_address.unwrap_or(crate::types::NON_ADDRESS);
        let end = self.end_address.unwrap_or(crate::types::NON_ADDRESS);
        let status = self.status.ok_or_else(|| Error::InvalidSegment {
            start,
            end,
            reason: "status is missing".to_string(),
        })?;
        TransferSegment::new(start, end, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NON_ADDRESS;

    #[test]
    fn test_state_lattice_order() {
        assert!(SegmentState::NotTransferred < SegmentState::Transferred);
        assert!(SegmentState::Transferred < SegmentState::Failed);
        assert!(SegmentState::Failed < SegmentState::Restored);
    }

    #[test]
    fn test_state_predicates() {
        assert!(SegmentState::NotTransferred.needs_transfer());
        assert!(SegmentState::Failed.needs_transfer());
        assert!(!SegmentState::Transferred.needs_transfer());
        assert!(!SegmentState::Restored.needs_transfer());
    }

    #[test]
    fn test_segment_verification() {
        let status = TransferSegmentStatus::not_transferred(0);

        // start can't be negative
        let err = TransferSegment::builder()
            .start_address(NON_ADDRESS)
            .end_address(0)
            .status(status.clone())
            .build();
        assert!(matches!(err, Err(Error::InvalidSegment { .. })));

        // end can't be negative
        assert!(TransferSegment::builder()
            .start_address(0)
            .end_address(NON_ADDRESS)
            .status(status.clone())
            .build()
            .is_err());

        // start can't be after end
        assert!(TransferSegment::builder()
            .start_address(3)
            .end_address(2)
            .status(status)
            .build()
            .is_err());

        // status must be present
        assert!(TransferSegment::builder()
            .start_address(0)
            .end_address(1)
            .build()
            .is_err());
    }

    #[test]
    fn test_fully_copied_requires_full_total() {
        assert!(TransferSegment::new(0, 9, TransferSegmentStatus::restored(5)).is_err());
        assert!(TransferSegment::new(0, 9, TransferSegmentStatus::transferred(10)).is_ok());
        assert!(TransferSegment::new(0, 9, TransferSegmentStatus::not_transferred(11)).is_err());
    }

    #[test]
    fn test_after_transfer_success() {
        let segment = TransferSegment::not_transferred(0, 9).unwrap();
        let next = segment.after_transfer(10, None).unwrap();
        assert_eq!(next.state(), SegmentState::Transferred);
        assert_eq!(next.status().total_transferred(), 10);
        assert!(next.status().cause_of_failure().is_none());
    }

    #[test]
    fn test_after_transfer_failure_keeps_partial_progress() {
        let segment = TransferSegment::not_transferred(0, 9).unwrap();
        let failed = segment
            .after_transfer(4, Some(TransferSegmentFailure::new("connection reset")))
            .unwrap();
        assert_eq!(failed.state(), SegmentState::Failed);
        assert_eq!(failed.status().total_transferred(), 4);
        assert_eq!(
            failed.status().cause_of_failure().unwrap().cause,
            "connection reset"
        );

        // a retry that copies less never lowers recorded progress
        let again = failed
            .after_transfer(2, Some(TransferSegmentFailure::new("timeout")))
            .unwrap();
        assert_eq!(again.status().total_transferred(), 4);

        let ok = again.after_transfer(10, None).unwrap();
        assert_eq!(ok.state(), SegmentState::Transferred);
    }

    #[test]
    fn test_short_copy_is_failure() {
        let segment = TransferSegment::not_transferred(0, 9).unwrap();
        let next = segment.after_transfer(7, None).unwrap();
        assert_eq!(next.state(), SegmentState::Failed);
        assert_eq!(next.status().total_transferred(), 7);
    }

    #[test]
    fn test_transferred_is_not_retransferred() {
        let segment = TransferSegment::new(0, 9, TransferSegmentStatus::transferred(10)).unwrap();
        assert!(matches!(segment.after_transfer(10, None), Err(Error::Internal(_))));
    }

    #[test]
    fn test_mark_restored() {
        let transferred =
            TransferSegment::new(0, 9, TransferSegmentStatus::transferred(10)).unwrap();
        let restored = transferred.mark_restored().unwrap();
        assert_eq!(restored.state(), SegmentState::Restored);

        let pending = TransferSegment::not_transferred(0, 9).unwrap();
        assert!(pending.mark_restored().is_err());
    }

    #[test]
    fn test_after_cancellation_credits_progress() {
        let segment = TransferSegment::not_transferred(0, 9).unwrap();
        let next = segment.after_cancellation(3).unwrap();
        assert_eq!(next.state(), SegmentState::NotTransferred);
        assert_eq!(next.status().total_transferred(), 3);
    }

    #[test]
    fn test_display() {
        let failed = TransferSegment::new(
            5,
            9,
            TransferSegmentStatus::failed(2, TransferSegmentFailure::new("disk full")),
        )
        .unwrap();
        assert_eq!(failed.to_string(), "[5, 9] failed (2/5): disk full");
    }
}
