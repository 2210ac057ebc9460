use crate::config::StateTransferConfig;
use crate::error::{Error, Result};
use crate::layout::{Layout, LayoutSegment, LayoutStripe};
use crate::redundancy::RedundancyCalculator;
use crate::statetransfer::{
    Batch, InMemoryLayoutStore, LayoutSource, StateTransferOrchestrator, TransferCollaborator,
};
use crate::types::{Address, Epoch};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Build a layout from `(start, end, stripes)` triples.
pub(crate) fn layout(epoch: Epoch, segments: &[(Address, Address, &[&[&str]])]) -> Layout {
    let segments = segments
        .iter()
        .map(|(start, end, stripes)| {
            LayoutSegment::new(
                *start,
                *end,
                stripes
                    .iter()
                    .map(|servers| LayoutStripe::new(servers.iter().copied()))
                    .collect(),
            )
        })
        .collect();
    Layout::new(epoch, segments).unwrap()
}

/// Transfer collaborator writing into an in-memory address set.
///
/// Batches containing an address marked as failing are rejected whole.
#[derive(Debug, Default)]
pub(crate) struct ScriptedTransfer {
    local: Mutex<BTreeSet<Address>>,
    failing: Mutex<BTreeSet<Address>>,
    requests: Mutex<Vec<Batch>>,
    present_error: Mutex<Option<String>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    widest_present_query: AtomicUsize,
}

impl ScriptedTransfer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Addresses the local log holds before any transfer.
    pub(crate) fn preload(&self, addresses: impl IntoIterator<Item = Address>) {
        self.local.lock().extend(addresses);
    }

    pub(crate) fn fail_addresses(&self, addresses: impl IntoIterator<Item = Address>) {
        self.failing.lock().extend(addresses);
    }

    pub(crate) fn heal(&self) {
        self.failing.lock().clear();
        *self.present_error.lock() = None;
    }

    pub(crate) fn fail_present_addresses(&self, cause: &str) {
        *self.present_error.lock() = Some(cause.to_string());
    }

    pub(crate) fn local_addresses(&self) -> BTreeSet<Address> {
        self.local.lock().clone()
    }

    pub(crate) fn requests(&self) -> Vec<Batch> {
        self.requests.lock().clone()
    }

    pub(crate) fn requested_addresses(&self) -> Vec<Address> {
        self.requests
            .lock()
            .iter()
            .flat_map(|batch| batch.addresses.iter().copied())
            .collect()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Most addresses asked about by a single `present_addresses` call.
    pub(crate) fn widest_present_query(&self) -> usize {
        self.widest_present_query.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransferCollaborator for ScriptedTransfer {
    async fn transfer(&self, batch: &Batch) -> Result<Vec<Address>> {
        self.requests.lock().push(batch.clone());
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let failing = self.failing.lock();
        if let Some(address) = batch.addresses.iter().find(|a| failing.contains(a)) {
            return Err(Error::Transfer(format!("address {} unavailable", address)));
        }
        drop(failing);

        self.local.lock().extend(batch.addresses.iter().copied());
        Ok(batch.addresses.clone())
    }

    async fn present_addresses(&self, start: Address, end: Address) -> Result<BTreeSet<Address>> {
        let span = (end - start + 1).max(0) as usize;
        self.widest_present_query.fetch_max(span, Ordering::SeqCst);
        if let Some(cause) = self.present_error.lock().clone() {
            return Err(Error::Transfer(cause));
        }
        Ok(self.local.lock().range(start..=end).copied().collect())
    }
}

/// Layout source where another writer commits first, `conflicts` times.
#[derive(Debug)]
pub(crate) struct ContendedLayoutSource {
    store: Arc<InMemoryLayoutStore>,
    conflicts: AtomicUsize,
}

impl ContendedLayoutSource {
    pub(crate) fn new(store: Arc<InMemoryLayoutStore>, conflicts: usize) -> Self {
        Self {
            store,
            conflicts: AtomicUsize::new(conflicts),
        }
    }
}

#[async_trait]
impl LayoutSource for ContendedLayoutSource {
    async fn current_layout(&self) -> Result<Layout> {
        self.store.current_layout().await
    }

    async fn propose_layout(&self, layout: Layout) -> Result<()> {
        let raced = self
            .conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if raced {
            self.store.install(self.store.layout().with_next_epoch());
        }
        self.store.propose_layout(layout).await
    }
}

/// Orchestrator for `node` reading layout and trim mark from `store`.
pub(crate) fn orchestrator(
    node: &str,
    config: StateTransferConfig,
    store: &Arc<InMemoryLayoutStore>,
    transfer: &Arc<ScriptedTransfer>,
) -> StateTransferOrchestrator {
    StateTransferOrchestrator::new(
        RedundancyCalculator::new(node),
        config,
        store.clone(),
        store.clone(),
        transfer.clone(),
    )
    .unwrap()
}

/// Wait for a condition with timeout
pub(crate) async fn wait_for<F>(condition: F, timeout: Duration, check_interval: Duration) -> bool
where
    F: Fn() -> bool,
{
    let start = Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        sleep(check_interval).await;
    }
    false
}
