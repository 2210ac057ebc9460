//! Redundancy restoration for a replicated, segmented append-only log.
//!
//! When cluster membership or the replication layout changes, a node can end
//! up missing ranges of the log it is expected to hold. This crate works out
//! which address ranges the local node must copy, copies them in bounded
//! batches, tracks progress and failures across reconciliation cycles, and
//! proposes a layout listing the node once a range is fully copied.
//!
//! # Features
//!
//! - Pure requirement calculation from a layout and trim mark
//! - A status lattice that keeps restored ranges and recorded failures
//!   across cycles
//! - Batched transfers with a bounded worker pool and cooperative cancellation
//! - Epoch-checked layout proposals with stale-epoch retries
//!
//! # Example
//!
//! ```rust,no_run
//! use log_state_transfer::config::StateTransferConfig;
//! use log_state_transfer::layout::{Layout, LayoutSegment, LayoutStripe};
//! use log_state_transfer::redundancy::RedundancyCalculator;
//! use log_state_transfer::statetransfer::{
//!     Batch, InMemoryLayoutStore, StateTransferOrchestrator, TransferCollaborator,
//! };
//! use log_state_transfer::types::Address;
//! use std::collections::BTreeSet;
//! use std::sync::Arc;
//!
//! #[derive(Debug)]
//! struct RemoteCopy;
//!
//! #[async_trait::async_trait]
//! impl TransferCollaborator for RemoteCopy {
//!     async fn transfer(&self, batch: &Batch) -> log_state_transfer::Result<Vec<Address>> {
//!         // Read from a replica in `batch.source_nodes`, write locally.
//!         Ok(batch.addresses.clone())
//!     }
//!
//!     async fn present_addresses(
//!         &self,
//!         _start: Address,
//!         _end: Address,
//!     ) -> log_state_transfer::Result<BTreeSet<Address>> {
//!         // Ask the local log which addresses it already holds.
//!         Ok(BTreeSet::new())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let layout = Layout::new(
//!         1,
//!         vec![LayoutSegment::new(0, 100, vec![LayoutStripe::new(["a", "b"])])],
//!     )?;
//!     let store = Arc::new(InMemoryLayoutStore::new(layout));
//!
//!     let orchestrator = StateTransferOrchestrator::new(
//!         RedundancyCalculator::new("c"),
//!         StateTransferConfig::default().with_batch_size(25),
//!         store.clone(),
//!         store.clone(),
//!         Arc::new(RemoteCopy),
//!     )?;
//!
//!     let report = orchestrator.run_cycle().await?;
//!     println!("committed epoch: {:?}", report.committed_epoch);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │   Layout source / trim mark source          │
//! └─────────────────────────────────────────────┘
//!                     │ layout, trim mark
//!                     ▼
//! ┌─────────────────────────────────────────────┐
//! │          StateTransferOrchestrator          │
//! │  • run_cycle() -> CycleReport               │
//! │  • run(events)                              │
//! │  • handle_layout_change(layout)             │
//! └─────────────────────────────────────────────┘
//!          │                        │
//!          ▼                        ▼
//! ┌──────────────────┐    ┌──────────────────────┐
//! │ RedundancyCalc.  │    │ TransferCollaborator │
//! │ (pure functions) │    │ (remote read, local  │
//! │                  │    │  write)              │
//! └──────────────────┘    └──────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod layout;
pub mod metrics;
pub mod redundancy;
pub mod statetransfer;
pub mod types;

#[cfg(test)]
mod testing;

pub use config::StateTransferConfig;
pub use error::{Error, Result};
pub use layout::{Layout, LayoutSegment, LayoutStripe};
pub use metrics::{StateTransferMetrics, StateTransferMetricsSnapshot};
pub use redundancy::RedundancyCalculator;
pub use statetransfer::{
    Batch, BatchResult, BatchStatus, CycleReport, InMemoryLayoutStore, LayoutEvent, LayoutSource,
    SegmentState, StateTransferOrchestrator, TransferCollaborator, TransferSegment,
    TransferSegmentFailure, TransferSegmentStatus, TrimMarkSource,
};
pub use types::{Address, Epoch, NodeId, NON_ADDRESS};
