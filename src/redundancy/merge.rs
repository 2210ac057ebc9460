//! Cross-cycle reconciliation of transfer segment lists.
//!
//! Each cycle recomputes the requirement from the current layout and trim
//! mark. That fresh list decides *which* ranges are tracked; the previous
//! cycle's list contributes *how far* each range already got.

use crate::error::Result;
use crate::statetransfer::{SegmentState, TransferSegment, TransferSegmentStatus};
use crate::types::{range_len, Address};

/// Pick the status that survives when an old and a fresh status describe the
/// same addresses.
///
/// The higher state in `NotTransferred < Transferred < Failed < Restored`
/// wins, so a restored range is never downgraded and a recorded failure is
/// not forgotten in favour of an unattempted range. Between equal states the
/// one with more progress wins, the fresh one on a tie.
pub fn join_status<'a>(
    old: &'a TransferSegmentStatus,
    fresh: &'a TransferSegmentStatus,
) -> &'a TransferSegmentStatus {
    match old.segment_state().cmp(&fresh.segment_state()) {
        std::cmp::Ordering::Greater => old,
        std::cmp::Ordering::Less => fresh,
        std::cmp::Ordering::Equal if old.total_transferred() > fresh.total_transferred() => old,
        std::cmp::Ordering::Equal => fresh,
    }
}

/// Merge the previous cycle's segments into a freshly computed list.
///
/// - Every fresh segment is kept with its boundaries. Where old segments
///   overlap it, the overlapping sub-range takes [`join_status`] of the two;
///   the fresh segment is split only where the joined states differ.
/// - An old segment overlapping no fresh segment passes through, promoted to
///   `Restored` if it was `Transferred`: the copy already happened and nothing
///   requires it any more.
/// - The part of an old segment outside every fresh segment is dropped.
///
/// The result is sorted by start address.
pub fn merge_segment_lists(
    old_list: &[TransferSegment],
    new_list: &[TransferSegment],
) -> Result<Vec<TransferSegment>> {
    let mut merged = Vec::with_capacity(new_list.len() + old_list.len());

    for fresh in new_list {
        let mut overlapping: Vec<&TransferSegment> =
            old_list.iter().filter(|old| old.overlaps(fresh)).collect();
        overlapping.sort_by_key(|old| old.start_address());
        merged.extend(merge_region(fresh, &overlapping)?);
    }

    for old in old_list
        .iter()
        .filter(|old| !new_list.iter().any(|fresh| fresh.overlaps(old)))
    {
        merged.push(carry_forward(old)?);
    }

    merged.sort_by_key(TransferSegment::start_address);
    Ok(merged)
}

/// An old segment with no counterpart in the fresh list.
fn carry_forward(old: &TransferSegment) -> Result<TransferSegment> {
    match old.state() {
        SegmentState::Transferred => old.mark_restored(),
        _ => Ok(old.clone()),
    }
}

/// A sub-range of a fresh segment and the status it ends up with.
struct Piece {
    start: Address,
    end: Address,
    status: TransferSegmentStatus,
}

fn merge_region(fresh: &TransferSegment, overlapping: &[&TransferSegment]) -> Result<Vec<TransferSegment>> {
    let mut pieces: Vec<Piece> = Vec::new();
    let mut cursor = fresh.start_address();

    for old in overlapping {
        let start = old.start_address().max(fresh.start_address());
        let end = old.end_address().min(fresh.end_address());
        if start > cursor {
            push_piece(&mut pieces, cursor, start - 1, fresh.status());
        }
        push_piece(&mut pieces, start, end, join_status(old.status(), fresh.status()));
        cursor = end + 1;
    }
    if cursor <= fresh.end_address() {
        push_piece(&mut pieces, cursor, fresh.end_address(), fresh.status());
    }

    pieces
        .into_iter()
        .map(|piece| TransferSegment::new(piece.start, piece.end, piece.status))
        .collect()
}

/// Append a piece, coalescing it into the previous one when the states match.
fn push_piece(pieces: &mut Vec<Piece>, start: Address, end: Address, status: &TransferSegmentStatus) {
    if let Some(last) = pieces.last_mut() {
        if last.end + 1 == start && last.status.segment_state() == status.segment_state() {
            let total = last.status.total_transferred() + status.total_transferred();
            last.end = end;
            last.status = fit_status(&last.status, total, range_len(last.start, end));
            return;
        }
    }
    pieces.push(Piece {
        start,
        end,
        status: fit_status(status, status.total_transferred(), range_len(start, end)),
    });
}

/// Restate `status` for a range of `len` addresses with `total` progress.
///
/// Fully copied states always cover the whole range; partial progress is
/// capped at the range length.
fn fit_status(status: &TransferSegmentStatus, total: u64, len: u64) -> TransferSegmentStatus {
    match status.segment_state() {
        SegmentState::Transferred => TransferSegmentStatus::transferred(len),
        SegmentState::Restored => TransferSegmentStatus::restored(len),
        SegmentState::NotTransferred => TransferSegmentStatus::not_transferred(total.min(len)),
        SegmentState::Failed => status.clamp_total(total.min(len)),
    }
}
