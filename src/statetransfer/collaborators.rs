//! Seams to the systems this engine drives but does not own.
//!
//! The consensus layer owns the layout, the sequencer/log owns the trim mark,
//! and an RPC client does the actual reading and writing of log data. Each is
//! reached through one of these traits.

use crate::error::{Error, Result};
use crate::layout::Layout;
use crate::types::{Address, Epoch, NON_ADDRESS};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicI64, Ordering};

use super::batch::Batch;

/// Access to the cluster layout.
#[async_trait]
pub trait LayoutSource: Send + Sync + std::fmt::Debug {
    /// Fetch the most recently committed layout.
    async fn current_layout(&self) -> Result<Layout>;

    /// Propose `layout` as the next layout.
    ///
    /// Implementations reject a proposal that does not follow the committed
    /// epoch with [`Error::StaleEpoch`].
    async fn propose_layout(&self, layout: Layout) -> Result<()>;
}

/// Access to the cluster-wide trim mark.
#[async_trait]
pub trait TrimMarkSource: Send + Sync + std::fmt::Debug {
    /// Highest address that no longer needs to be kept, or [`NON_ADDRESS`].
    async fn trim_mark(&self) -> Result<Address>;
}

/// Copies log data from remote replicas into the local log.
#[async_trait]
pub trait TransferCollaborator: Send + Sync + std::fmt::Debug {
    /// Read the batch's addresses from a remote replica and write them locally.
    ///
    /// Returns the addresses that were written.
    async fn transfer(&self, batch: &Batch) -> Result<Vec<Address>>;

    /// Addresses in `[start, end]` the local log already holds.
    ///
    /// Queried once per batch range before the batch is built; addresses
    /// reported here are credited without being copied again.
    async fn present_addresses(&self, start: Address, end: Address) -> Result<BTreeSet<Address>>;
}

/// Layout and trim mark kept in memory, with epoch-checked proposals.
///
/// Suitable for embedding in tests and single-process deployments.
#[derive(Debug)]
pub struct InMemoryLayoutStore {
    layout: RwLock<Layout>,
    history: RwLock<Vec<Layout>>,
    trim_mark: AtomicI64,
}

impl InMemoryLayoutStore {
    /// Create a store holding `layout` and no trim mark.
    pub fn new(layout: Layout) -> Self {
        Self {
            layout: RwLock::new(layout),
            history: RwLock::new(Vec::new()),
            trim_mark: AtomicI64::new(NON_ADDRESS),
        }
    }

    /// Snapshot of the committed layout.
    pub fn layout(&self) -> Layout {
        self.layout.read().clone()
    }

    /// Epoch of the committed layout.
    pub fn epoch(&self) -> Epoch {
        self.layout.read().epoch()
    }

    /// Layouts accepted through [`LayoutSource::propose_layout`], oldest first.
    pub fn committed_proposals(&self) -> Vec<Layout> {
        self.history.read().clone()
    }

    /// Replace the layout without an epoch check, as another component
    /// committing a reconfiguration would.
    pub fn install(&self, layout: Layout) {
        tracing::debug!(epoch = layout.epoch(), "Layout installed");
        *self.layout.write() = layout;
    }

    /// Move the trim mark.
    pub fn set_trim_mark(&self, trim_mark: Address) {
        self.trim_mark.store(trim_mark, Ordering::SeqCst);
    }
}

#[async_trait]
impl LayoutSource for InMemoryLayoutStore {
    async fn current_layout(&self) -> Result<Layout> {
        Ok(self.layout())
    }

    async fn propose_layout(&self, layout: Layout) -> Result<()> {
        let mut current = self.layout.write();
        if layout.epoch() != current.epoch() + 1 {
            return Err(Error::StaleEpoch {
                proposed: layout.epoch(),
                current: current.epoch(),
            });
        }

        tracing::info!(epoch = layout.epoch(), segments = layout.segments().len(), "Layout committed");
        self.history.write().push(layout.clone());
        *current = layout;
        Ok(())
    }
}

#[async_trait]
impl TrimMarkSource for InMemoryLayoutStore {
    async fn trim_mark(&self) -> Result<Address> {
        Ok(self.trim_mark.load(Ordering::SeqCst))
    }
}
