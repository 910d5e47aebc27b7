//! Engine-level error and report types.

use std::time::Duration;

use thiserror::Error;

use crate::sink::SinkError;

/// Outcome of a failed flush or lifecycle operation.
///
/// Errors are `Clone` because interval-flush failures are parked in the
/// engine's last-error slot and handed out to pollers by value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// The engine was built without a sink. Surfaced on any flush of a
    /// non-empty buffer; never retried.
    #[error("no sink configured")]
    NoSink,

    /// Every sink attempt failed; carries the attempt count and the last
    /// attempt's error. The batch's items are dropped.
    #[error("sink write failed after {attempts} attempts: {source}")]
    SinkFailed { attempts: usize, source: SinkError },

    /// The abort token fired while waiting to retry; remaining attempts were
    /// abandoned and the batch's items dropped.
    #[error("flush cancelled while waiting to retry")]
    Cancelled,

    /// `close()` was called more than once.
    #[error("engine already closed")]
    Closed,
}

/// What a successful delivery cost, for observability.
#[derive(Debug, Clone, Copy)]
pub struct DeliveryReport {
    /// Items in the delivered batch
    pub items: usize,
    /// Sink write attempts made (1 = first try succeeded)
    pub attempts: usize,
    /// Wall time from detach hand-off to sink success, retries included
    pub elapsed: Duration,
}
