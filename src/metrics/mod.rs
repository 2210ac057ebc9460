//! Metrics for state transfer observability.
//!
//! Failed segments in particular must be visible to operators: they are not
//! cleared automatically, only superseded by a later transfer outcome.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  StateTransferMetrics                     │
//! │  ┌───────────────────────┐  ┌──────────────────────────┐ │
//! │  │  Counters             │  │  Gauges                  │ │
//! │  │ - cycles              │  │ - segments_failed        │ │
//! │  │ - batches ok/failed   │  │ - segments_in_flight     │ │
//! │  │ - addresses copied    │  └──────────────────────────┘ │
//! │  │ - proposals           │                               │
//! │  └───────────────────────┘                               │
//! └──────────────────────────────────────────────────────────┘
//! ```

mod primitives;

pub use primitives::{Counter, Gauge};

/// Metrics for reconciliation cycles.
#[derive(Debug)]
pub struct StateTransferMetrics {
    /// Reconciliation cycles completed.
    pub cycles: Counter,
    /// Batches that copied every address.
    pub batches_succeeded: Counter,
    /// Batches that failed.
    pub batches_failed: Counter,
    /// Addresses copied from remote replicas.
    pub addresses_transferred: Counter,
    /// Addresses skipped because the local log already held them.
    pub addresses_skipped: Counter,
    /// Layout proposals accepted by the consensus layer.
    pub proposals_committed: Counter,
    /// Layout proposals rejected for a stale epoch.
    pub proposals_rejected: Counter,
    /// Segments that reached the restored state.
    pub segments_restored: Counter,
    /// Segments currently recorded as failed.
    pub segments_failed: Gauge,
    /// Segments with batches currently executing.
    pub segments_in_flight: Gauge,
}

impl StateTransferMetrics {
    /// Create new state transfer metrics.
    pub fn new() -> Self {
        Self {
            cycles: Counter::new(),
            batches_succeeded: Counter::new(),
            batches_failed: Counter::new(),
            addresses_transferred: Counter::new(),
            addresses_skipped: Counter::new(),
            proposals_committed: Counter::new(),
            proposals_rejected: Counter::new(),
            segments_restored: Counter::new(),
            segments_failed: Gauge::new(),
            segments_in_flight: Gauge::new(),
        }
    }

    /// Record the outcome of one batch.
    pub fn record_batch(&self, succeeded: bool, addresses: u64) {
        if succeeded {
            self.batches_succeeded.inc();
        } else {
            self.batches_failed.inc();
        }
        self.addresses_transferred.inc_by(addresses);
    }

    /// Record a layout proposal attempt.
    pub fn record_proposal(&self, committed: bool) {
        if committed {
            self.proposals_committed.inc();
        } else {
            self.proposals_rejected.inc();
        }
    }

    /// Get a snapshot of the current values.
    pub fn snapshot(&self) -> StateTransferMetricsSnapshot {
        StateTransferMetricsSnapshot {
            cycles: self.cycles.get(),
            batches_succeeded: self.batches_succeeded.get(),
            batches_failed: self.batches_failed.get(),
            addresses_transferred: self.addresses_transferred.get(),
            addresses_skipped: self.addresses_skipped.get(),
            proposals_committed: self.proposals_committed.get(),
            proposals_rejected: self.proposals_rejected.get(),
            segments_restored: self.segments_restored.get(),
            segments_failed: self.segments_failed.get().max(0) as u64,
            segments_in_flight: self.segments_in_flight.get().max(0) as u64,
        }
    }
}

impl Default for StateTransferMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`StateTransferMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateTransferMetricsSnapshot {
    pub cycles: u64,
    pub batches_succeeded: u64,
    pub batches_failed: u64,
    pub addresses_transferred: u64,
    pub addresses_skipped: u64,
    pub proposals_committed: u64,
    pub proposals_rejected: u64,
    pub segments_restored: u64,
    pub segments_failed: u64,
    pub segments_in_flight: u64,
}

impl StateTransferMetricsSnapshot {
    /// Fraction of executed batches that failed.
    pub fn batch_failure_rate(&self) -> f64 {
        let total = self.batches_succeeded + self.batches_failed;
        if total == 0 {
            0.0
        } else {
            self.batches_failed as f64 / total as f64
        }
    }
}
