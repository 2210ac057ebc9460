//! State transfer: moving log data onto an under-replicated node.
//!
//! This module tracks address ranges under restoration and drives their
//! transfer from remote replicas into the local log.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   StateTransferOrchestrator                     │
//! │                                                                 │
//! │  ┌───────────────────────────────────────────────────────────┐ │
//! │  │                  RedundancyCalculator                      │ │
//! │  │  - Requirement from layout and trim mark                   │ │
//! │  │  - Merge with the previous cycle's segments                │ │
//! │  └───────────────────────────────────────────────────────────┘ │
//! │                             │                                   │
//! │                             ▼                                   │
//! │  ┌───────────────────────────────────────────────────────────┐ │
//! │  │                 Batch workers (bounded)                    │ │
//! │  │  - Batch ──► TransferCollaborator ──► BatchResult          │ │
//! │  └───────────────────────────────────────────────────────────┘ │
//! │                             │                                   │
//! │                             ▼                                   │
//! │  ┌───────────────────────────────────────────────────────────┐ │
//! │  │                      LayoutSource                          │ │
//! │  │  - Propose the layout listing this node                    │ │
//! │  └───────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Segment lifecycle
//!
//! ```text
//! NotTransferred ──► Transferred ──► Restored
//!       │                 ▲
//!       ▼                 │
//!     Failed ─────────────┘
//! ```
//!
//! `NotTransferred` and `Failed` segments are attempted every cycle.
//! `Transferred` segments wait for a committed layout rewrite; `Restored`
//! is final.

mod batch;
mod collaborators;
mod orchestrator;
mod segment;

pub use batch::{Batch, BatchCursor, BatchResult, BatchStatus};
pub use collaborators::{InMemoryLayoutStore, LayoutSource, TransferCollaborator, TrimMarkSource};
pub use orchestrator::{CycleReport, LayoutEvent, StateTransferOrchestrator};
pub use segment::{
    SegmentState, TransferSegment, TransferSegmentBuilder, TransferSegmentFailure,
    TransferSegmentStatus,
};
