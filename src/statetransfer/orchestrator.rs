//! Reconciliation cycles: compute, merge, transfer, rewrite the layout.
//!
//! One cycle runs at a time. Within a cycle, batches from every candidate
//! segment are executed by a fixed set of workers pulling from a shared
//! queue, so at most `max_concurrent_batches` transfers are outstanding.
//!
//! ```text
//!  layout, trim mark ──► compute_requirement ──► merge_lists(previous, fresh)
//!                                                       │
//!                         ┌─────────────────────────────┘
//!                         ▼
//!              NotTransferred / Failed segments
//!                         │ one batch cursor per segment
//!                         ▼
//!              ┌──────────────────────┐
//!              │ worker 0 .. worker N │──► TransferCollaborator
//!              └──────────────────────┘
//!                         │ BatchResults, tallied per segment
//!                         ▼
//!              Transferred segments ──► layout rewrite ──► propose
//!                                                             │ committed
//!                                                             ▼
//!                                                          Restored
//! ```

use crate::config::StateTransferConfig;
use crate::error::{Error, Result};
use crate::layout::Layout;
use crate::metrics::StateTransferMetrics;
use crate::redundancy::RedundancyCalculator;
use crate::types::{Address, Epoch, NodeId, NON_ADDRESS};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::batch::{Batch, BatchCursor, BatchResult};
use super::collaborators::{LayoutSource, TransferCollaborator, TrimMarkSource};
use super::segment::{SegmentState, TransferSegment, TransferSegmentFailure};

/// Notification that a new layout was committed.
#[derive(Debug, Clone)]
pub struct LayoutEvent {
    /// The newly committed layout.
    pub layout: Layout,
}

impl LayoutEvent {
    /// Create an event for `layout`.
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }
}

/// Summary of one reconciliation cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Epoch of the layout the cycle started from.
    pub epoch: Epoch,
    /// Trim mark the requirement was computed against.
    pub trim_mark: Address,
    /// Segments that needed a transfer attempt.
    pub candidates: usize,
    /// Candidates that finished with every address copied.
    pub transferred: usize,
    /// Candidates whose attempt failed.
    pub failed: usize,
    /// Candidates abandoned because a newer layout no longer required them.
    pub cancelled: usize,
    /// Segments moved to `Restored` by this cycle's layout rewrite.
    pub restored: usize,
    /// Epoch of the layout committed by this cycle, if any.
    pub committed_epoch: Option<Epoch>,
}

/// A candidate segment whose batches are executing.
#[derive(Debug)]
struct InFlightSegment {
    start: Address,
    end: Address,
    token: CancellationToken,
}

/// A candidate segment's remaining batch ranges.
///
/// Workers take one range at a time and requeue the job at the back, so
/// segments are served round-robin and only in-flight batches are built.
#[derive(Debug)]
struct SegmentJob {
    segment: usize,
    cursor: BatchCursor,
    sources: Vec<NodeId>,
    token: CancellationToken,
}

/// Work handed to a worker by [`next_work`].
#[derive(Debug)]
enum Work {
    Range {
        segment: usize,
        start: Address,
        end: Address,
        sources: Vec<NodeId>,
    },
    /// The segment was cancelled; its remaining ranges are dropped.
    Abandoned { segment: usize },
}

/// What one batch range produced.
#[derive(Debug)]
enum RangeOutcome {
    /// `present` addresses were already local; the rest went through `result`.
    Copied { present: u64, result: BatchResult },
    /// Every address in the range was already local.
    AllPresent { present: u64 },
    Cancelled,
}

/// What happened to one candidate segment's workload.
#[derive(Debug, Default)]
struct SegmentWork {
    /// Addresses the local log already held.
    present: u64,
    /// Addresses written by batches.
    written: u64,
    /// First batch failure seen.
    failure: Option<TransferSegmentFailure>,
    cancelled: bool,
}

impl SegmentWork {
    fn record(&mut self, outcome: RangeOutcome) {
        match outcome {
            RangeOutcome::Copied { present, result } => {
                self.present += present;
                self.written += result.transferred();
                if self.failure.is_none() {
                    self.failure = result.failure().cloned();
                }
            }
            RangeOutcome::AllPresent { present } => self.present += present,
            RangeOutcome::Cancelled => self.cancelled = true,
        }
    }

    fn absorb(&mut self, other: SegmentWork) {
        self.present += other.present;
        self.written += other.written;
        self.failure = self.failure.take().or(other.failure);
        self.cancelled |= other.cancelled;
    }
}

/// Outcome of the layout rewrite step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RewriteOutcome {
    /// No segment was waiting for a layout rewrite.
    NothingToDo,
    /// Copied segments share layout segments with addresses not yet copied.
    Incomplete,
    /// The committed layout already lists the node for every waiting segment.
    AlreadyReflected,
    /// A new layout was committed at this epoch.
    Committed(Epoch),
    /// The proposal could not be committed this cycle.
    Deferred,
}

/// Drives redundancy restoration for the local node.
#[derive(Debug)]
pub struct StateTransferOrchestrator {
    calculator: RedundancyCalculator,
    config: StateTransferConfig,
    layout_source: Arc<dyn LayoutSource>,
    trim_mark_source: Arc<dyn TrimMarkSource>,
    transfer: Arc<dyn TransferCollaborator>,
    /// Segment list produced by the last cycle; replaced wholesale.
    segments: RwLock<Arc<Vec<TransferSegment>>>,
    /// Candidates of the running cycle.
    in_flight: RwLock<Vec<InFlightSegment>>,
    /// Trim mark seen by the last cycle.
    last_trim_mark: AtomicI64,
    /// Serializes cycles.
    cycle_lock: tokio::sync::Mutex<()>,
    metrics: Arc<StateTransferMetrics>,
    cancellation: CancellationToken,
}

impl StateTransferOrchestrator {
    /// Create an orchestrator with no previously tracked segments.
    pub fn new(
        calculator: RedundancyCalculator,
        config: StateTransferConfig,
        layout_source: Arc<dyn LayoutSource>,
        trim_mark_source: Arc<dyn TrimMarkSource>,
        transfer: Arc<dyn TransferCollaborator>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            calculator,
            config,
            layout_source,
            trim_mark_source,
            transfer,
            segments: RwLock::new(Arc::new(Vec::new())),
            in_flight: RwLock::new(Vec::new()),
            last_trim_mark: AtomicI64::new(NON_ADDRESS),
            cycle_lock: tokio::sync::Mutex::new(()),
            metrics: Arc::new(StateTransferMetrics::new()),
            cancellation: CancellationToken::new(),
        })
    }

    /// The local node.
    pub fn node(&self) -> &str {
        self.calculator.node()
    }

    /// Get configuration.
    pub fn config(&self) -> &StateTransferConfig {
        &self.config
    }

    /// Get the metrics.
    pub fn metrics(&self) -> &Arc<StateTransferMetrics> {
        &self.metrics
    }

    /// Segments as of the last completed cycle.
    pub fn segments(&self) -> Arc<Vec<TransferSegment>> {
        Arc::clone(&self.segments.read())
    }

    /// Segments whose last transfer attempt failed, with their causes.
    pub fn failed_segments(&self) -> Vec<TransferSegment> {
        self.segments
            .read()
            .iter()
            .filter(|segment| segment.state() == SegmentState::Failed)
            .cloned()
            .collect()
    }

    /// Get cancellation token for graceful shutdown.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Signal shutdown: in-flight cycles stop scheduling batches and `run` exits.
    pub fn shutdown(&self) {
        self.cancellation.cancel();
    }

    /// Channel pair for feeding [`LayoutEvent`]s into [`run`](Self::run).
    pub fn event_channel(&self) -> (mpsc::Sender<LayoutEvent>, mpsc::Receiver<LayoutEvent>) {
        mpsc::channel(self.config.event_channel_capacity)
    }

    /// Run one reconciliation cycle.
    ///
    /// Transfer failures are recorded on their segments and a rejected layout
    /// proposal leaves segments `Transferred`; neither fails the cycle. Errors
    /// are returned only when the layout or trim mark cannot be read, another
    /// cycle is running, or the orchestrator is shut down.
    #[tracing::instrument(skip(self), fields(node = %self.calculator.node(), cycle_id = %Uuid::new_v4()))]
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let _cycle = self
            .cycle_lock
            .try_lock()
            .map_err(|_| Error::CycleInProgress)?;
        if self.cancellation.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let started = Instant::now();
        let layout = self.layout_source.current_layout().await?;
        let trim_mark = self.trim_mark_source.trim_mark().await?;
        self.last_trim_mark.store(trim_mark, Ordering::SeqCst);

        let required = self.calculator.compute_requirement(&layout, trim_mark)?;
        let previous = self.segments();
        let mut current: Vec<TransferSegment> = self
            .calculator
            .merge_lists(&previous, &required)?
            .into_iter()
            .filter(|segment| segment.end_address() > trim_mark)
            .collect();

        let candidates: Vec<usize> = current
            .iter()
            .enumerate()
            .filter(|(_, segment)| segment.state().needs_transfer())
            .map(|(index, _)| index)
            .collect();

        let mut report = CycleReport {
            epoch: layout.epoch(),
            trim_mark,
            candidates: candidates.len(),
            ..Default::default()
        };

        tracing::info!(
            epoch = layout.epoch(),
            trim_mark,
            tracked = current.len(),
            candidates = candidates.len(),
            "Reconciliation cycle started"
        );

        if !candidates.is_empty() {
            let targets: Vec<TransferSegment> =
                candidates.iter().map(|&index| current[index].clone()).collect();
            let updated = self.transfer_segments(&layout, &targets).await?;

            for (&index, (segment, cancelled)) in candidates.iter().zip(updated) {
                if cancelled {
                    report.cancelled += 1;
                } else {
                    match segment.state() {
                        SegmentState::Transferred => report.transferred += 1,
                        SegmentState::Failed => report.failed += 1,
                        _ => {}
                    }
                }
                current[index] = segment;
            }
        }

        if self.cancellation.is_cancelled() {
            self.publish(current);
            return Err(Error::Cancelled);
        }

        let awaiting_rewrite = count_in_state(&current, SegmentState::Transferred);
        match self.rewrite_layout(&mut current, layout, trim_mark).await {
            Ok(RewriteOutcome::Committed(epoch)) => report.committed_epoch = Some(epoch),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Layout rewrite failed; segments stay transferred");
            }
        }
        report.restored =
            awaiting_rewrite - count_in_state(&current, SegmentState::Transferred);

        self.publish(current);
        self.metrics.cycles.inc();

        tracing::info!(
            epoch = report.epoch,
            candidates = report.candidates,
            transferred = report.transferred,
            failed = report.failed,
            cancelled = report.cancelled,
            committed_epoch = ?report.committed_epoch,
            duration_ms = started.elapsed().as_millis() as u64,
            "Reconciliation cycle completed"
        );

        Ok(report)
    }

    /// React to a newly committed layout while a cycle may be running.
    ///
    /// In-flight segments the new layout no longer requires stop scheduling
    /// batches; batches already executing drain and are credited. Returns the
    /// number of segments cancelled.
    pub fn handle_layout_change(&self, layout: &Layout) -> Result<usize> {
        let trim_mark = self.last_trim_mark.load(Ordering::SeqCst);
        let still_needed: Vec<TransferSegment> = self
            .calculator
            .compute_requirement(layout, trim_mark)?
            .into_iter()
            .filter(|segment| segment.state().needs_transfer())
            .collect();

        let mut cancelled = 0;
        for in_flight in self.in_flight.read().iter() {
            let required = still_needed.iter().any(|segment| {
                segment.start_address() <= in_flight.end && in_flight.start <= segment.end_address()
            });
            if !required && !in_flight.token.is_cancelled() {
                in_flight.token.cancel();
                cancelled += 1;
                tracing::info!(
                    start = in_flight.start,
                    end = in_flight.end,
                    epoch = layout.epoch(),
                    "Cancelling transfer no longer required by new layout"
                );
            }
        }
        Ok(cancelled)
    }

    /// Run a cycle per layout event until the channel closes or shutdown.
    ///
    /// Events arriving while a cycle runs cancel work the new layout no longer
    /// needs and schedule one more cycle once the current one finishes.
    pub async fn run(self: Arc<Self>, mut events: mpsc::Receiver<LayoutEvent>) -> Result<()> {
        let mut closed = false;

        while !closed {
            let event = tokio::select! {
                _ = self.cancellation.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };
            tracing::info!(epoch = event.layout.epoch(), "Layout change received");

            let mut pending = true;
            while pending && !self.cancellation.is_cancelled() {
                pending = false;
                let cycle = self.run_cycle();
                tokio::pin!(cycle);

                let result = loop {
                    tokio::select! {
                        result = &mut cycle => break result,
                        event = events.recv(), if !closed => match event {
                            Some(event) => {
                                if let Err(e) = self.handle_layout_change(&event.layout) {
                                    tracing::warn!(error = %e, "Failed to evaluate layout change");
                                }
                                pending = true;
                            }
                            None => closed = true,
                        },
                    }
                };

                match result {
                    Ok(_) => {}
                    Err(Error::Cancelled) => return Ok(()),
                    Err(e) => {
                        tracing::warn!(error = %e, retryable = e.is_retryable(), "Reconciliation cycle failed");
                    }
                }
            }
        }

        tracing::info!(node = %self.calculator.node(), "State transfer loop stopped");
        Ok(())
    }

    /// Attempt every target segment, returning the replacement for each and
    /// whether it was cancelled.
    async fn transfer_segments(
        &self,
        layout: &Layout,
        targets: &[TransferSegment],
    ) -> Result<Vec<(TransferSegment, bool)>> {
        let mut jobs = VecDeque::with_capacity(targets.len());
        let mut in_flight = Vec::with_capacity(targets.len());

        for (index, segment) in targets.iter().enumerate() {
            let (start, end) = (segment.start_address(), segment.end_address());
            let token = self.cancellation.child_token();
            jobs.push_back(SegmentJob {
                segment: index,
                cursor: BatchCursor::new(start, end, self.config.batch_size),
                sources: self.source_nodes(layout, start, end),
                token: token.clone(),
            });
            in_flight.push(InFlightSegment { start, end, token });
        }

        tracing::debug!(
            segments = targets.len(),
            batch_size = self.config.batch_size,
            "Transfer scheduled"
        );

        *self.in_flight.write() = in_flight;
        self.metrics.segments_in_flight.set(targets.len() as i64);

        let results = self.execute_batches(jobs).await;

        self.in_flight.write().clear();
        self.metrics.segments_in_flight.set(0);

        let mut work = results?;
        targets
            .iter()
            .enumerate()
            .map(|(index, segment)| {
                let work = work.remove(&index).unwrap_or_default();
                let transferred = work.present + work.written;

                if work.cancelled {
                    return Ok((segment.after_cancellation(transferred)?, true));
                }

                let updated = segment.after_transfer(transferred, work.failure)?;
                if updated.state() == SegmentState::Failed {
                    tracing::warn!(segment = %updated, "Segment transfer failed");
                } else {
                    tracing::debug!(segment = %updated, "Segment transferred");
                }
                Ok((updated, false))
            })
            .collect()
    }

    /// Drain `jobs` with a fixed number of workers, keyed by segment index.
    async fn execute_batches(
        &self,
        jobs: VecDeque<SegmentJob>,
    ) -> Result<HashMap<usize, SegmentWork>> {
        if jobs.is_empty() {
            return Ok(HashMap::new());
        }

        let workers = self.config.max_concurrent_batches;
        let queue = Arc::new(Mutex::new(jobs));
        let mut pool = JoinSet::new();

        for worker in 0..workers {
            let queue = Arc::clone(&queue);
            let transfer = Arc::clone(&self.transfer);
            let metrics = Arc::clone(&self.metrics);
            pool.spawn(batch_worker(worker, queue, transfer, metrics));
        }

        let mut results: HashMap<usize, SegmentWork> = HashMap::new();
        while let Some(joined) = pool.join_next().await {
            match joined {
                Ok(done) => {
                    for (segment, work) in done {
                        results.entry(segment).or_default().absorb(work);
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Batch worker panicked");
                    return Err(Error::Internal(format!("batch worker failed: {}", e)));
                }
            }
        }
        Ok(results)
    }

    /// Nodes other than this one holding any stripe of `[start, end]`.
    fn source_nodes(&self, layout: &Layout, start: Address, end: Address) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = Vec::new();
        for server in layout
            .segments_overlapping(start, end)
            .flat_map(|segment| &segment.stripes)
            .flat_map(|stripe| &stripe.log_servers)
        {
            if server != self.calculator.node() && !nodes.contains(server) {
                nodes.push(server.clone());
            }
        }
        nodes
    }

    /// Add the local node to the layout for every restorable `Transferred`
    /// segment and propose the result, refreshing and retrying on stale
    /// epochs.
    ///
    /// A segment is restorable once every layout segment it touches is fully
    /// copied past `trim_mark`. Segments are marked `Restored` only once the
    /// layout reflects them.
    async fn rewrite_layout(
        &self,
        segments: &mut [TransferSegment],
        layout: Layout,
        trim_mark: Address,
    ) -> Result<RewriteOutcome> {
        if count_in_state(segments, SegmentState::Transferred) == 0 {
            return Ok(RewriteOutcome::NothingToDo);
        }

        let mut base = layout;
        let mut pending = 0;
        for attempt in 1..=self.config.max_propose_attempts {
            let ready = self.calculator.restorable_segments(segments, &base, trim_mark);
            if ready.is_empty() {
                tracing::debug!(
                    epoch = base.epoch(),
                    "Transferred segments wait for the rest of their layout segments"
                );
                return Ok(RewriteOutcome::Incomplete);
            }
            pending = ready.len();

            let mut candidate = self
                .calculator
                .update_layout_after_redundancy_restoration(&ready, &base);
            if self.config.merge_segments {
                candidate = RedundancyCalculator::merge_mergeable_segments(&candidate)?;
            }

            if candidate == base {
                self.mark_restored(segments, &ready)?;
                tracing::info!(epoch = base.epoch(), "Layout already reflects transferred segments");
                return Ok(RewriteOutcome::AlreadyReflected);
            }

            let proposal = candidate.with_next_epoch();
            let epoch = proposal.epoch();
            match self.layout_source.propose_layout(proposal).await {
                Ok(()) => {
                    self.metrics.record_proposal(true);
                    let restored = self.mark_restored(segments, &ready)?;
                    tracing::info!(epoch, restored, attempt, "Layout with restored redundancy committed");
                    return Ok(RewriteOutcome::Committed(epoch));
                }
                Err(Error::StaleEpoch { proposed, current }) => {
                    self.metrics.record_proposal(false);
                    tracing::warn!(proposed, current, attempt, "Layout proposal rejected, refreshing layout");
                    base = self.layout_source.current_layout().await?;
                }
                Err(e) => return Err(e),
            }
        }

        tracing::warn!(
            attempts = self.config.max_propose_attempts,
            pending,
            "Layout proposal not committed this cycle"
        );
        Ok(RewriteOutcome::Deferred)
    }

    /// Mark the tracked segments matching `ready` as `Restored`.
    fn mark_restored(
        &self,
        segments: &mut [TransferSegment],
        ready: &[TransferSegment],
    ) -> Result<usize> {
        let mut restored = 0;
        for segment in segments.iter_mut().filter(|segment| {
            segment.state() == SegmentState::Transferred
                && ready.iter().any(|r| {
                    r.start_address() == segment.start_address()
                        && r.end_address() == segment.end_address()
                })
        }) {
            *segment = segment.mark_restored()?;
            restored += 1;
        }
        self.metrics.segments_restored.inc_by(restored as u64);
        Ok(restored)
    }

    /// Swap in the new generation of the segment list.
    fn publish(&self, segments: Vec<TransferSegment>) {
        let failed = segments
            .iter()
            .filter(|segment| segment.state() == SegmentState::Failed)
            .count();
        self.metrics.segments_failed.set(failed as i64);
        *self.segments.write() = Arc::new(segments);
    }
}

fn count_in_state(segments: &[TransferSegment], state: SegmentState) -> usize {
    segments.iter().filter(|segment| segment.state() == state).count()
}

/// Take the next batch range off the front job, requeueing the job while it
/// has ranges left.
fn next_work(queue: &mut VecDeque<SegmentJob>) -> Option<Work> {
    loop {
        let mut job = queue.pop_front()?;
        if job.token.is_cancelled() {
            return Some(Work::Abandoned {
                segment: job.segment,
            });
        }
        let Some((start, end)) = job.cursor.next_range() else {
            continue;
        };
        let work = Work::Range {
            segment: job.segment,
            start,
            end,
            sources: job.sources.clone(),
        };
        if !job.cursor.is_exhausted() {
            queue.push_back(job);
        }
        return Some(work);
    }
}

async fn batch_worker(
    worker: usize,
    queue: Arc<Mutex<VecDeque<SegmentJob>>>,
    transfer: Arc<dyn TransferCollaborator>,
    metrics: Arc<StateTransferMetrics>,
) -> HashMap<usize, SegmentWork> {
    let mut done: HashMap<usize, SegmentWork> = HashMap::new();

    loop {
        let work = next_work(&mut queue.lock());
        let (segment, outcome) = match work {
            None => break,
            Some(Work::Abandoned { segment }) => (segment, RangeOutcome::Cancelled),
            Some(Work::Range {
                segment,
                start,
                end,
                sources,
            }) => {
                let outcome = execute_range(transfer.as_ref(), start, end, sources).await;
                match &outcome {
                    RangeOutcome::Copied { present, result } => {
                        metrics.addresses_skipped.inc_by(*present);
                        metrics.record_batch(result.is_success(), result.transferred());
                        tracing::debug!(
                            worker,
                            segment,
                            start,
                            end,
                            written = result.transferred(),
                            success = result.is_success(),
                            "Batch finished"
                        );
                    }
                    RangeOutcome::AllPresent { present } => {
                        metrics.addresses_skipped.inc_by(*present);
                    }
                    RangeOutcome::Cancelled => {}
                }
                (segment, outcome)
            }
        };
        done.entry(segment).or_default().record(outcome);
    }

    done
}

/// Copy the addresses of `[start, end]` the local log does not hold yet.
async fn execute_range(
    transfer: &dyn TransferCollaborator,
    start: Address,
    end: Address,
    sources: Vec<NodeId>,
) -> RangeOutcome {
    let present = match transfer.present_addresses(start, end).await {
        Ok(present) => present,
        Err(e) => {
            tracing::warn!(start, end, error = %e, "Could not read local addresses");
            return RangeOutcome::Copied {
                present: 0,
                result: BatchResult::failed(
                    Batch::default().with_source_nodes(sources),
                    TransferSegmentFailure::from(&e),
                ),
            };
        }
    };

    let batch = Batch::from_range(start, end, &present).with_source_nodes(sources);
    let present = present.range(start..=end).count() as u64;
    if batch.is_empty() {
        return RangeOutcome::AllPresent { present };
    }
    RangeOutcome::Copied {
        present,
        result: execute_batch(transfer, batch).await,
    }
}

async fn execute_batch(transfer: &dyn TransferCollaborator, batch: Batch) -> BatchResult {
    match transfer.transfer(&batch).await {
        Ok(written) => {
            let requested: BTreeSet<Address> = batch.addresses.iter().copied().collect();
            let written: BTreeSet<Address> = written
                .into_iter()
                .filter(|address| requested.contains(address))
                .collect();

            if written.len() == requested.len() {
                BatchResult::succeeded(batch)
            } else {
                let failure = TransferSegmentFailure::new(format!(
                    "wrote {} of {} addresses in batch starting at {}",
                    written.len(),
                    requested.len(),
                    batch.first_address().unwrap_or(NON_ADDRESS)
                ));
                BatchResult::failed(
                    Batch {
                        addresses: written.into_iter().collect(),
                        source_nodes: batch.source_nodes,
                    },
                    failure,
                )
            }
        }
        Err(e) => {
            tracing::warn!(
                first = batch.first_address(),
                last = batch.last_address(),
                error = %e,
                "Batch transfer failed"
            );
            BatchResult::failed(
                Batch {
                    addresses: Vec::new(),
                    source_nodes: batch.source_nodes,
                },
                TransferSegmentFailure::from(&e),
            )
        }
    }
}
