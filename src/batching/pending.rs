// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Pending buffer for batched writes.
//!
//! The [`PendingBuffer`] collects items in insertion order and reports when
//! the configured count threshold is reached. The buffer itself is not
//! synchronised; the engine keeps it behind a single mutex and holds the lock
//! only across append/threshold-check and detach, never across sink I/O.
//!
//! # Example
//!
//! ```
//! use batch_engine::{PendingBuffer, FlushReason};
//!
//! let mut buffer: PendingBuffer<u32> = PendingBuffer::new(3);
//! assert!(!buffer.push(1));
//! assert!(!buffer.push(2));
//! assert!(buffer.push(3)); // threshold reached
//!
//! let batch = buffer.detach(FlushReason::Threshold).unwrap();
//! assert_eq!(batch.items, vec![1, 2, 3]);
//! assert!(buffer.is_empty());
//! ```

use tracing::debug;

/// Why a batch was detached for flushing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    /// Item count threshold reached by an `add`
    Threshold,
    /// Periodic tick from the interval scheduler
    Interval,
    /// Caller-requested flush
    Manual,
    /// Final drain during shutdown
    Shutdown,
}

impl FlushReason {
    /// Metrics label for this trigger.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            FlushReason::Threshold => "threshold",
            FlushReason::Interval => "interval",
            FlushReason::Manual => "manual",
            FlushReason::Shutdown => "shutdown",
        }
    }
}

/// An immutable snapshot of buffered items, detached for delivery.
///
/// Ownership of the items transfers entirely to the flush call; the live
/// buffer is already empty by the time the sink sees this batch, so the two
/// never alias.
#[derive(Debug)]
pub struct Batch<T> {
    pub items: Vec<T>,
    pub reason: FlushReason,
}

impl<T> Batch<T> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Ordered sequence of items pending flush, with a count threshold.
///
/// `push` alone does not bound growth; it relies on the caller detaching
/// promptly whenever it reports the threshold as reached.
#[derive(Debug)]
pub struct PendingBuffer<T> {
    items: Vec<T>,
    threshold: usize,
}

impl<T> PendingBuffer<T> {
    #[must_use]
    pub fn new(threshold: usize) -> Self {
        Self {
            items: Vec::new(),
            threshold,
        }
    }

    /// Append an item, returning whether the post-append length reached the
    /// threshold. The append and the check are a single step so only the call
    /// that crosses the threshold ever observes the crossing.
    pub fn push(&mut self, item: T) -> bool {
        self.items.push(item);
        self.items.len() >= self.threshold
    }

    /// Snapshot the current items and reset the buffer to empty.
    ///
    /// Returns `None` for an empty buffer: an empty detach is a defined
    /// no-op, never an empty-batch flush.
    pub fn detach(&mut self, reason: FlushReason) -> Option<Batch<T>> {
        if self.items.is_empty() {
            return None;
        }
        let items = std::mem::take(&mut self.items);
        debug!(count = items.len(), reason = ?reason, "batch detached for flush");
        Some(Batch { items, reason })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
