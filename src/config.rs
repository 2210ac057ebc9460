//! Configuration types for the state transfer engine.

use crate::error::{Error, Result};

/// Configuration for the state transfer orchestrator.
#[derive(Debug, Clone)]
pub struct StateTransferConfig {
    /// Number of addresses per transfer batch.
    ///
    /// Larger batches amortize per-request overhead; smaller ones lose less
    /// work when a single batch fails and hold less data in memory.
    pub batch_size: usize,

    /// Maximum number of batches executing concurrently within one cycle.
    pub max_concurrent_batches: usize,

    /// How many times the layout proposal is rebuilt and retried after a
    /// stale-epoch rejection within one cycle.
    pub max_propose_attempts: usize,

    /// Whether adjacent layout segments with identical topology are collapsed
    /// before a layout is proposed.
    pub merge_segments: bool,

    /// Buffer size of the layout event channel.
    pub event_channel_capacity: usize,
}

impl Default for StateTransferConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_concurrent_batches: 4,
            max_propose_attempts: 3,
            merge_segments: true,
            event_channel_capacity: 16,
        }
    }
}

impl StateTransferConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the bound on concurrently executing batches.
    pub fn with_max_concurrent_batches(mut self, max: usize) -> Self {
        self.max_concurrent_batches = max;
        self
    }

    /// Set the number of proposal attempts per cycle.
    pub fn with_max_propose_attempts(mut self, attempts: usize) -> Self {
        self.max_propose_attempts = attempts;
        self
    }

    /// Enable or disable layout segment merging.
    pub fn with_merge_segments(mut self, enabled: bool) -> Self {
        self.merge_segments = enabled;
        self
    }

    /// Set the layout event channel capacity.
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }

    /// Check that every bound is usable.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be > 0".to_string()));
        }
        if self.max_concurrent_batches == 0 {
            return Err(Error::InvalidConfig(
                "max_concurrent_batches must be > 0".to_string(),
            ));
        }
        if self.max_propose_attempts == 0 {
            return Err(Error::InvalidConfig(
                "max_propose_attempts must be > 0".to_string(),
            ));
        }
        if self.event_channel_capacity == 0 {
            return Err(Error::InvalidConfig(
                "event_channel_capacity must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
