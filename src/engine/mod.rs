// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Batch engine coordinator.
//!
//! The [`BatchEngine`] ties the components together:
//! - a pending buffer with a count threshold, behind one mutex
//! - an interval scheduler running as a single background task
//! - the bulk sink adapter wrapping every delivery in retry/backoff
//!
//! # Thread Safety
//!
//! The engine is a cheaply cloneable handle over shared state; any number of
//! producers may call [`add`](BatchEngine::add) concurrently. The buffer lock
//! is held only across append/threshold-check and detach - never across sink
//! I/O - so producers contend for microseconds, not for the duration of
//! someone else's flush.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use batch_engine::{BatchEngine, EngineConfig, SinkError};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let sink = Arc::new(|items: &[u64]| {
//!     println!("bulk insert of {} rows", items.len());
//!     Ok::<(), SinkError>(())
//! });
//!
//! let config = EngineConfig { flush_count: 500, flush_interval_ms: 800, ..Default::default() };
//! let engine = BatchEngine::new(config, Some(sink));
//!
//! engine.add(1).await.unwrap();
//! engine.close().await.unwrap();
//! # }
//! ```

mod delivery;
mod flush;
mod lifecycle;
mod types;

pub use types::{DeliveryReport, EngineError};

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::batching::pending::{FlushReason, PendingBuffer};
use crate::config::EngineConfig;
use crate::resilience::retry::RetryPolicy;
use crate::sink::BatchSink;

/// State guarded by the engine's single lock: the buffer and the most recent
/// interval-flush error.
pub(super) struct Shared<T> {
    pub(super) buffer: PendingBuffer<T>,
    pub(super) last_error: Option<EngineError>,
}

pub(super) struct Inner<T> {
    pub(super) config: EngineConfig,
    pub(super) retry: RetryPolicy,
    pub(super) sink: Option<Arc<dyn BatchSink<T>>>,
    pub(super) shared: Mutex<Shared<T>>,
    /// Raised by `close()`; stops the interval scheduler.
    pub(super) stop: CancellationToken,
    /// Raised externally via `abort_token()`; aborts retry backoff waits.
    pub(super) abort: CancellationToken,
    /// Taken exactly once, by `close()`.
    pub(super) scheduler: Mutex<Option<JoinHandle<()>>>,
}

/// Handle to a running batch engine.
///
/// Cloning yields another handle to the same engine instance.
pub struct BatchEngine<T> {
    pub(super) inner: Arc<Inner<T>>,
}

impl<T> Clone for BatchEngine<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> BatchEngine<T>
where
    T: Send + Sync + 'static,
{
    /// Create an engine and start its interval scheduler.
    ///
    /// Nothing is validated eagerly; a missing sink only surfaces as
    /// [`EngineError::NoSink`] on the first flush of a non-empty buffer.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime (the scheduler task is
    /// spawned here).
    pub fn new(config: EngineConfig, sink: Option<Arc<dyn BatchSink<T>>>) -> Self {
        let inner = Arc::new(Inner {
            retry: config.retry_policy(),
            sink,
            shared: Mutex::new(Shared {
                buffer: PendingBuffer::new(config.flush_count),
                last_error: None,
            }),
            stop: CancellationToken::new(),
            abort: CancellationToken::new(),
            scheduler: Mutex::new(None),
            config,
        });

        let handle = lifecycle::spawn_scheduler(Arc::clone(&inner));
        *inner.scheduler.lock() = Some(handle);

        Self { inner }
    }

    /// Queue an item for batching.
    ///
    /// The call whose append crosses the count threshold synchronously
    /// performs the resulting flush - including all retries - before
    /// returning, and receives its outcome. Every other concurrent `add`
    /// only contends for the brief buffer lock. This is the engine's
    /// admission control: the producer that fills the batch pays for
    /// shipping it.
    pub async fn add(&self, item: T) -> Result<(), EngineError> {
        let batch = {
            let mut shared = self.inner.shared.lock();
            let crossed = shared.buffer.push(item);
            let batch = if crossed {
                shared.buffer.detach(FlushReason::Threshold)
            } else {
                None
            };
            crate::metrics::set_pending_items(shared.buffer.len());
            batch
        };

        if let Some(batch) = batch {
            self.inner.deliver(batch).await?;
        }
        Ok(())
    }

    /// The most recent error from an interval-triggered flush.
    ///
    /// This is a single overwrite-on-write slot, not a log: each background
    /// flush failure replaces the previous value, and it is never cleared by
    /// a later success. Consumers wanting alerting must poll it.
    #[must_use]
    pub fn last_error(&self) -> Option<EngineError> {
        self.inner.shared.lock().last_error.clone()
    }

    /// Number of items currently buffered.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.inner.shared.lock().buffer.len()
    }

    /// Token that aborts in-flight retry backoff waits when cancelled.
    ///
    /// `close()` does not raise this; it exists for hard teardown paths
    /// where waiting out a multi-second backoff is unacceptable. Aborted
    /// deliveries surface [`EngineError::Cancelled`] and drop their batch.
    #[must_use]
    pub fn abort_token(&self) -> CancellationToken {
        self.inner.abort.clone()
    }
}
