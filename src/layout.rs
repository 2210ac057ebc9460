//! Cluster layout documents.
//!
//! A layout is owned by the cluster-wide consensus mechanism. This crate only
//! reads snapshots of it and builds new documents to propose; a `Layout` value
//! is never mutated in place.
//!
//! ```text
//!   epoch 7
//!   ┌──────────────── segment [0, 100) ────────────────┐┌──── segment [100, 250) ────┐
//!   │ stripe 0: A, B                                    ││ stripe 0: A, B, C          │
//!   │ stripe 1: C                                       ││ stripe 1: C, D             │
//!   └───────────────────────────────────────────────────┘└────────────────────────────┘
//! ```
//!
//! Segment bounds are half-open: `start` is the first address, `end` is one
//! past the last.

use crate::error::{Error, Result};
use crate::types::{Address, Epoch, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A shard of a segment's address range and the nodes replicating it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutStripe {
    /// Nodes holding this stripe, in replication-chain order.
    pub log_servers: Vec<NodeId>,
}

impl LayoutStripe {
    /// Create a stripe replicated on the given servers.
    pub fn new<I, S>(log_servers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<NodeId>,
    {
        Self {
            log_servers: log_servers.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `node` replicates this stripe.
    pub fn contains(&self, node: &str) -> bool {
        self.log_servers.iter().any(|server| server == node)
    }

    /// The replica set, ignoring chain order.
    pub fn server_set(&self) -> HashSet<&str> {
        self.log_servers.iter().map(String::as_str).collect()
    }
}

/// A contiguous address range with a fixed replication topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutSegment {
    /// First address of the segment.
    pub start: Address,
    /// One past the last address of the segment.
    pub end: Address,
    /// Stripes partitioning the segment.
    pub stripes: Vec<LayoutStripe>,
}

impl LayoutSegment {
    /// Create a segment covering `[start, end)`.
    pub fn new(start: Address, end: Address, stripes: Vec<LayoutStripe>) -> Self {
        Self { start, end, stripes }
    }

    /// Last address covered by the segment.
    pub fn last_address(&self) -> Address {
        self.end - 1
    }

    /// Whether any address of the inclusive range `[start, end]` falls in this segment.
    pub fn overlaps(&self, start: Address, end: Address) -> bool {
        start <= self.last_address() && self.start <= end
    }

    /// Whether `node` appears in at least one stripe.
    pub fn contains_server(&self, node: &str) -> bool {
        self.stripes.iter().any(|stripe| stripe.contains(node))
    }

    /// Whether `node` appears in every stripe, i.e. holds a full copy of the segment.
    pub fn replicated_on(&self, node: &str) -> bool {
        !self.stripes.is_empty() && self.stripes.iter().all(|stripe| stripe.contains(node))
    }

    /// Whether both segments replicate each stripe index on the same node set.
    pub fn same_topology(&self, other: &LayoutSegment) -> bool {
        self.stripes.len() == other.stripes.len()
            && self
                .stripes
                .iter()
                .zip(&other.stripes)
                .all(|(a, b)| a.server_set() == b.server_set())
    }
}

/// A versioned, ordered sequence of layout segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LayoutDocument")]
pub struct Layout {
    epoch: Epoch,
    segments: Vec<LayoutSegment>,
}

/// Unchecked wire shape of a layout; validated on the way in.
#[derive(Deserialize)]
struct LayoutDocument {
    epoch: Epoch,
    segments: Vec<LayoutSegment>,
}

impl TryFrom<LayoutDocument> for Layout {
    type Error = Error;

    fn try_from(doc: LayoutDocument) -> Result<Self> {
        Layout::new(doc.epoch, doc.segments)
    }
}

impl Layout {
    /// Create a layout, checking that the segments tile the address space.
    ///
    /// Segments must be non-empty, start at a non-negative address, follow each
    /// other without gaps, and carry at least one stripe.
    pub fn new(epoch: Epoch, segments: Vec<LayoutSegment>) -> Result<Self> {
        if segments.is_empty() {
            return Err(Error::InvalidLayout("layout has no segments".to_string()));
        }

        for (index, segment) in segments.iter().enumerate() {
            if segment.start < 0 || segment.start >= segment.end {
                return Err(Error::InvalidLayout(format!(
                    "segment {} has invalid range [{}, {})",
                    index, segment.start, segment.end
                )));
            }
            if segment.stripes.is_empty() {
                return Err(Error::InvalidLayout(format!("segment {} has no stripes", index)));
            }
        }

        for pair in segments.windows(2) {
            if pair[0].end != pair[1].start {
                return Err(Error::InvalidLayout(format!(
                    "segment ending at {} is followed by segment starting at {}",
                    pair[0].end, pair[1].start
                )));
            }
        }

        Ok(Self { epoch, segments })
    }

    /// The layout version.
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// All segments in address order.
    pub fn segments(&self) -> &[LayoutSegment] {
        &self.segments
    }

    /// The segment holding the oldest addresses.
    pub fn first_segment(&self) -> &LayoutSegment {
        &self.segments[0]
    }

    /// The active segment, which receives new writes.
    pub fn last_segment(&self) -> &LayoutSegment {
        &self.segments[self.segments.len() - 1]
    }

    /// Last address covered by the layout.
    pub fn last_address(&self) -> Address {
        self.last_segment().last_address()
    }

    /// Segments overlapping the inclusive range `[start, end]`.
    pub fn segments_overlapping(
        &self,
        start: Address,
        end: Address,
    ) -> impl Iterator<Item = &LayoutSegment> {
        self.segments
            .iter()
            .filter(move |segment| segment.overlaps(start, end))
    }

    /// Every node named anywhere in the layout, in first-appearance order.
    pub fn all_log_servers(&self) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        self.segments
            .iter()
            .flat_map(|segment| &segment.stripes)
            .flat_map(|stripe| &stripe.log_servers)
            .filter(|server| seen.insert(server.as_str()))
            .cloned()
            .collect()
    }

    /// A copy of this layout stamped with the next epoch, ready to propose.
    pub fn with_next_epoch(&self) -> Self {
        Self {
            epoch: self.epoch + 1,
            segments: self.segments.clone(),
        }
    }

    /// Collapse the first two segments into one spanning both ranges.
    ///
    /// The merged segment takes the stripes of the second segment, which is
    /// the more recent topology.
    pub fn merge_first_segments(&self) -> Result<Self> {
        if self.segments.len() < 2 {
            return Err(Error::InvalidLayout(
                "need at least two segments to merge".to_string(),
            ));
        }

        let mut segments = Vec::with_capacity(self.segments.len() - 1);
        segments.push(LayoutSegment::new(
            self.segments[0].start,
            self.segments[1].end,
            self.segments[1].stripes.clone(),
        ));
        segments.extend(self.segments[2..].iter().cloned());

        Ok(Self {
            epoch: self.epoch,
            segments,
        })
    }

    /// Same epoch and ranges with different stripe contents.
    pub(crate) fn map_segments<F>(&self, f: F) -> Self
    where
        F: FnMut(&LayoutSegment) -> LayoutSegment,
    {
        Self {
            epoch: self.epoch,
            segments: self.segments.iter().map(f).collect(),
        }
    }
}
