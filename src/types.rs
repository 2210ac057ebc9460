//! Core types used throughout the state transfer engine.

/// Node identifier in the cluster (a log server endpoint such as `"host:9000"`).
pub type NodeId = String;

/// A position in the global log address space.
///
/// Valid addresses are non-negative. Negative values only appear as sentinels,
/// most notably a trim mark of [`NON_ADDRESS`] meaning "nothing trimmed yet".
pub type Address = i64;

/// Layout version. Proposals derived from a stale epoch are rejected.
pub type Epoch = u64;

/// Sentinel address: no address. Used as the trim mark of a log that has never been trimmed.
pub const NON_ADDRESS: Address = -1;

/// Number of addresses in the inclusive range `[start, end]`, or zero when the range is empty.
pub fn range_len(start: Address, end: Address) -> u64 {
    if end < start {
        0
    } else {
        (end - start + 1) as u64
    }
}
