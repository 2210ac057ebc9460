//! Redundancy requirement calculation.
//!
//! Pure functions over layouts and transfer segments. Given a layout, a trim
//! mark, and the local node, they answer three questions:
//!
//! 1. Which address ranges must this node copy? ([`RedundancyCalculator::compute_requirement`])
//! 2. How does that answer combine with what earlier cycles already did?
//!    ([`RedundancyCalculator::merge_lists`])
//! 3. What does the layout look like once the node holds those ranges?
//!    ([`RedundancyCalculator::update_layout_after_redundancy_restoration`])
//!
//! # Example
//!
//! ```rust
//! use log_state_transfer::layout::{Layout, LayoutSegment, LayoutStripe};
//! use log_state_transfer::redundancy::RedundancyCalculator;
//! use log_state_transfer::statetransfer::SegmentState;
//!
//! let layout = Layout::new(
//!     1,
//!     vec![
//!         LayoutSegment::new(0, 2, vec![LayoutStripe::new(["A", "B"])]),
//!         LayoutSegment::new(2, 4, vec![LayoutStripe::new(["A", "B"])]),
//!     ],
//! )
//! .unwrap();
//!
//! let calculator = RedundancyCalculator::new("localhost");
//! let segments = calculator.compute_requirement(&layout, -1).unwrap();
//!
//! assert_eq!(segments.len(), 2);
//! assert!(segments.iter().all(|s| s.state() == SegmentState::NotTransferred));
//! ```

mod calculator;
mod merge;

pub use calculator::RedundancyCalculator;
pub use merge::{join_status, merge_segment_lists};
