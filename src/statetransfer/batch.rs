//! Transfer batches and their results.
//!
//! A segment's range is walked in batches of at most `batch_size`
//! addresses. Each batch is built when a worker takes it and is handed to
//! the transfer collaborator on its own, so a failure costs at most one
//! batch worth of work.

use crate::types::{Address, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::segment::TransferSegmentFailure;

/// A set of addresses submitted to the transfer collaborator in one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    /// Addresses to copy, ascending.
    pub addresses: Vec<Address>,

    /// Nodes known to hold these addresses, in preference order.
    pub source_nodes: Option<Vec<NodeId>>,
}

impl Batch {
    /// Create a batch without a source hint.
    pub fn new(addresses: Vec<Address>) -> Self {
        Self {
            addresses,
            source_nodes: None,
        }
    }

    /// The addresses of `[start, end]` not in `present`.
    pub fn from_range(start: Address, end: Address, present: &BTreeSet<Address>) -> Self {
        Self::new((start..=end).filter(|address| !present.contains(address)).collect())
    }

    /// Attach the nodes the data can be read from.
    pub fn with_source_nodes(mut self, nodes: Vec<NodeId>) -> Self {
        self.source_nodes = if nodes.is_empty() { None } else { Some(nodes) };
        self
    }

    /// Number of addresses in the batch.
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// Check if the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Lowest address in the batch.
    pub fn first_address(&self) -> Option<Address> {
        self.addresses.first().copied()
    }

    /// Highest address in the batch.
    pub fn last_address(&self) -> Option<Address> {
        self.addresses.last().copied()
    }
}

/// Hands out the address ranges of `[start, end]` one batch at a time.
///
/// Only the cursor position is stored, so scheduling a segment costs the
/// same whatever its length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchCursor {
    next: Option<Address>,
    end: Address,
    batch_size: usize,
}

impl BatchCursor {
    /// Create a cursor over the inclusive range `[start, end]`.
    pub fn new(start: Address, end: Address, batch_size: usize) -> Self {
        Self {
            next: Some(start),
            end,
            batch_size: batch_size.max(1),
        }
    }

    /// Whether every range has been handed out.
    pub fn is_exhausted(&self) -> bool {
        self.next.map_or(true, |next| next > self.end)
    }

    /// The next range of at most `batch_size` addresses.
    pub fn next_range(&mut self) -> Option<(Address, Address)> {
        let start = self.next.filter(|&next| next <= self.end)?;
        let end = start
            .saturating_add(self.batch_size as Address - 1)
            .min(self.end);
        self.next = end.checked_add(1);
        Some((start, end))
    }
}

impl Iterator for BatchCursor {
    type Item = (Address, Address);

    fn next(&mut self) -> Option<Self::Item> {
        self.next_range()
    }
}

/// Whether a batch copied everything it was asked to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchStatus {
    /// Every address was written locally.
    #[default]
    Succeeded,
    /// The transfer errored or wrote only part of the batch.
    Failed,
}

/// Outcome of executing one batch.
///
/// `batch` holds the addresses that were actually written: the whole batch
/// on success, possibly nothing on failure. The default value is an empty
/// successful result, the neutral element of [`BatchResult::combine`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    batch: Batch,
    status: BatchStatus,
    failure: Option<TransferSegmentFailure>,
}

impl BatchResult {
    /// All addresses of `batch` were written.
    pub fn succeeded(batch: Batch) -> Self {
        Self {
            batch,
            status: BatchStatus::Succeeded,
            failure: None,
        }
    }

    /// The attempt failed after writing `written` (possibly empty).
    pub fn failed(written: Batch, failure: TransferSegmentFailure) -> Self {
        Self {
            batch: written,
            status: BatchStatus::Failed,
            failure: Some(failure),
        }
    }

    /// The written addresses.
    pub fn batch(&self) -> &Batch {
        &self.batch
    }

    /// Success or failure.
    pub fn status(&self) -> BatchStatus {
        self.status
    }

    /// Cause of the first failure, if any.
    pub fn failure(&self) -> Option<&TransferSegmentFailure> {
        self.failure.as_ref()
    }

    /// Whether the result is a success.
    pub fn is_success(&self) -> bool {
        self.status == BatchStatus::Succeeded
    }

    /// Number of addresses written.
    pub fn transferred(&self) -> u64 {
        self.batch.len() as u64
    }

    /// Fold two results: written addresses accumulate, any failure wins and
    /// the earliest recorded cause is kept.
    pub fn combine(self, other: BatchResult) -> BatchResult {
        let mut addresses = self.batch.addresses;
        addresses.extend(other.batch.addresses);
        addresses.sort_unstable();

        let (status, failure) = match (self.status, other.status) {
            (BatchStatus::Succeeded, BatchStatus::Succeeded) => (BatchStatus::Succeeded, None),
            _ => (BatchStatus::Failed, self.failure.or(other.failure)),
        };

        BatchResult {
            batch: Batch {
                addresses,
                source_nodes: self.batch.source_nodes.or(other.batch.source_nodes),
            },
            status,
            failure,
        }
    }

    /// Combine every result of a segment; an empty workload is a success.
    pub fn aggregate<I>(results: I) -> BatchResult
    where
        I: IntoIterator<Item = BatchResult>,
    {
        results
            .into_iter()
            .fold(BatchResult::default(), BatchResult::combine)
    }
}
