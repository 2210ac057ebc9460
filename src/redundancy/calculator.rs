//! Redundancy requirement calculation and layout rewriting.

use crate::error::Result;
use crate::layout::{Layout, LayoutSegment, LayoutStripe};
use crate::statetransfer::{SegmentState, TransferSegment};
use crate::types::{Address, NodeId};

use super::merge::merge_segment_lists;

/// Computes which address ranges the local node must copy, and how the
/// layout changes once it holds them.
///
/// The only state is the local node's identity, so a calculator can be
/// shared freely between tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedundancyCalculator {
    node: NodeId,
}

impl RedundancyCalculator {
    /// Create a calculator for `node`.
    pub fn new(node: impl Into<NodeId>) -> Self {
        Self { node: node.into() }
    }

    /// The local node.
    pub fn node(&self) -> &str {
        &self.node
    }

    /// Ranges of `layout` past `trim_mark`, each marked restored if the local
    /// node already replicates it and not transferred otherwise.
    ///
    /// Addresses at or below the trim mark are durable elsewhere and are left
    /// out; layout segments entirely behind it produce nothing. The result is
    /// ascending and contiguous over the remaining address space.
    pub fn compute_requirement(
        &self,
        layout: &Layout,
        trim_mark: Address,
    ) -> Result<Vec<TransferSegment>> {
        let first_needed = trim_mark.saturating_add(1).max(0);

        layout
            .segments()
            .iter()
            .filter_map(|segment| {
                let start = segment.start.max(first_needed);
                let end = segment.last_address();
                if start > end {
                    return None;
                }
                Some(if segment.replicated_on(&self.node) {
                    TransferSegment::restored(start, end)
                } else {
                    TransferSegment::not_transferred(start, end)
                })
            })
            .collect()
    }

    /// Whether `node` appears in at least one stripe of `segment`.
    pub fn segment_contains_server(segment: &LayoutSegment, node: &str) -> bool {
        segment.contains_server(node)
    }

    /// Whether `node` already holds a full copy of `segment`.
    pub fn segment_is_redundant(segment: &LayoutSegment, node: &str) -> bool {
        segment.replicated_on(node)
    }

    /// Whether `node` is part of the active segment but missing from some
    /// older one, i.e. it joined or came back and has history to backfill.
    pub fn can_restore_redundancy(layout: &Layout, node: &str) -> bool {
        match layout.segments().split_last() {
            Some((last, earlier)) if !earlier.is_empty() => {
                last.replicated_on(node)
                    && earlier
                        .iter()
                        .any(|segment| !Self::segment_contains_server(segment, node))
            }
            _ => false,
        }
    }

    /// Whether the first two segments replicate every stripe on the same node
    /// set, so the boundary between them carries no information.
    pub fn can_merge_segments(layout: &Layout) -> bool {
        match layout.segments() {
            [first, second, ..] => first.same_topology(second),
            _ => false,
        }
    }

    /// Collapse leading segments for as long as they are mergeable.
    pub fn merge_mergeable_segments(layout: &Layout) -> Result<Layout> {
        let mut merged = layout.clone();
        while Self::can_merge_segments(&merged) {
            merged = merged.merge_first_segments()?;
        }
        Ok(merged)
    }

    /// Add the local node to every stripe of every layout segment that
    /// overlaps `segment`.
    pub fn restore_redundancy_for_segment(
        &self,
        segment: &TransferSegment,
        layout: &Layout,
    ) -> Layout {
        let (start, end) = (segment.start_address(), segment.end_address());
        layout.map_segments(|layout_segment| {
            if !layout_segment.overlaps(start, end) {
                return layout_segment.clone();
            }
            LayoutSegment::new(
                layout_segment.start,
                layout_segment.end,
                layout_segment
                    .stripes
                    .iter()
                    .map(|stripe| self.with_local_node(stripe))
                    .collect(),
            )
        })
    }

    /// Rewrite `layout` so the local node holds every fully copied segment.
    ///
    /// Segments that are not fully copied are ignored.
    pub fn update_layout_after_redundancy_restoration(
        &self,
        transfer_segments: &[TransferSegment],
        layout: &Layout,
    ) -> Layout {
        transfer_segments
            .iter()
            .filter(|segment| {
                let copied = segment.state().is_fully_copied();
                if !copied {
                    tracing::debug!(
                        node = %self.node,
                        segment = %segment,
                        "Skipping segment that is not fully copied"
                    );
                }
                copied
            })
            .fold(layout.clone(), |acc, segment| {
                self.restore_redundancy_for_segment(segment, &acc)
            })
    }

    /// `Transferred` segments whose layout segments may list the local node.
    ///
    /// Listing the node in a layout segment claims every address in it past
    /// `trim_mark`, so a copied range qualifies only when each layout segment
    /// it touches is covered end to end by fully copied ranges in `segments`.
    /// The rest stay waiting until their neighbours are copied.
    pub fn restorable_segments(
        &self,
        segments: &[TransferSegment],
        layout: &Layout,
        trim_mark: Address,
    ) -> Vec<TransferSegment> {
        let mut copied: Vec<(Address, Address)> = segments
            .iter()
            .filter(|segment| segment.state().is_fully_copied())
            .map(|segment| (segment.start_address(), segment.end_address()))
            .collect();
        copied.sort_unstable();
        let first_needed = trim_mark.saturating_add(1).max(0);

        segments
            .iter()
            .filter(|segment| segment.state() == SegmentState::Transferred)
            .filter(|segment| {
                let ready = layout
                    .segments_overlapping(segment.start_address(), segment.end_address())
                    .all(|layout_segment| {
                        ranges_cover(
                            &copied,
                            layout_segment.start.max(first_needed),
                            layout_segment.last_address(),
                        )
                    });
                if !ready {
                    tracing::debug!(
                        node = %self.node,
                        segment = %segment,
                        "Layout segment still has uncopied addresses"
                    );
                }
                ready
            })
            .cloned()
            .collect()
    }

    /// Reconcile the previous cycle's segments with a fresh requirement.
    ///
    /// See [`merge_segment_lists`] for the rules.
    pub fn merge_lists(
        &self,
        old_list: &[TransferSegment],
        new_list: &[TransferSegment],
    ) -> Result<Vec<TransferSegment>> {
        merge_segment_lists(old_list, new_list)
    }

    fn with_local_node(&self, stripe: &LayoutStripe) -> LayoutStripe {
        if stripe.contains(&self.node) {
            return stripe.clone();
        }
        let mut servers = stripe.log_servers.clone();
        servers.push(self.node.clone());
        LayoutStripe { log_servers: servers }
    }
}

/// Whether sorted inclusive `ranges` cover every address in `[start, end]`.
fn ranges_cover(ranges: &[(Address, Address)], start: Address, end: Address) -> bool {
    if start > end {
        return true;
    }
    let mut cursor = start;
    for &(range_start, range_end) in ranges {
        if range_end < cursor {
            continue;
        }
        if range_start > cursor {
            return false;
        }
        if range_end >= end {
            return true;
        }
        cursor = range_end + 1;
    }
    false
}
