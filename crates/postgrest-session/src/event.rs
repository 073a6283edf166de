//! Observable store events.

/// Something the store did in the background or recovered from.
///
/// Delivered through [`crate::PostgrestSessionStore::subscribe`]. Slow
/// subscribers may miss events; nothing in the store waits on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// A prune pass deleted every row with `expire <= cutoff`.
    PruneCompleted { cutoff: i64 },

    /// A prune pass failed. The schedule continues.
    PruneFailed { cutoff: i64, error: String },

    /// A malformed row was found by `get` and destroyed.
    RecordDiscarded { sid: String, reason: String },

    /// The store was closed.
    Closed,
}
