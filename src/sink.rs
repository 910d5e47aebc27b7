//! The bulk-write sink consumed by the engine.
//!
//! A sink receives one ordered batch of items per call. The engine may call
//! it concurrently with disjoint batches (a threshold flush racing an
//! interval flush), and a failed call is retried with the **entire** batch,
//! so implementations must either be idempotent or apply each batch
//! all-or-nothing (a single transaction) to avoid double-counting on retry.

use async_trait::async_trait;
use thiserror::Error;

/// A failed sink write. Errors are `Clone` so the engine can park the most
/// recent one in its poll-able last-error slot.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SinkError {
    #[error("sink backend error: {0}")]
    Backend(String),
    #[error("sink write timed out: {0}")]
    Timeout(String),
}

/// A bulk-write operation over batches of `T`.
///
/// Must be safe for concurrent calls with disjoint batches; expected to be
/// atomic per call (see module docs).
#[async_trait]
pub trait BatchSink<T>: Send + Sync {
    /// Write one batch. Items are in the order they were added to the engine.
    async fn write_batch(&self, items: &[T]) -> Result<(), SinkError>;
}

/// Plain closures are sinks, mirroring a `fn(&[T]) -> Result` flush function.
///
/// ```
/// use batch_engine::{BatchSink, SinkError};
///
/// let sink = |items: &[u32]| {
///     println!("{} items", items.len());
///     Ok::<(), SinkError>(())
/// };
/// ```
#[async_trait]
impl<T, F> BatchSink<T> for F
where
    T: Send + Sync,
    F: Fn(&[T]) -> Result<(), SinkError> + Send + Sync,
{
    async fn write_batch(&self, items: &[T]) -> Result<(), SinkError> {
        (self)(items)
    }
}
