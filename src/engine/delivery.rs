//! Bulk sink adapter: one batch in, bounded retries, one outcome out.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::batching::pending::Batch;
use crate::resilience::retry::{retry_with_backoff, RetryError, RetryPolicy};
use crate::sink::BatchSink;

use super::types::{DeliveryReport, EngineError};

/// Hand a detached batch to the sink, retrying per `policy`.
///
/// Retries always re-send the entire batch. On exhaustion the *last*
/// attempt's error is returned; intermediate failures are only counted. A
/// cancellation during a backoff wait wins over the sink's error. Either way
/// the batch's items are gone - they were already detached from the buffer.
pub(super) async fn deliver<T>(
    sink: &dyn BatchSink<T>,
    batch: Batch<T>,
    policy: &RetryPolicy,
    abort: &CancellationToken,
) -> Result<DeliveryReport, EngineError>
where
    T: Send + Sync,
{
    let start = Instant::now();
    let trigger = batch.reason.label();
    let items = batch.items;
    let attempts = AtomicUsize::new(0);

    debug!(items = items.len(), trigger, "delivering batch to sink");

    let result = retry_with_backoff("sink write_batch", policy, abort, || {
        attempts.fetch_add(1, Ordering::Relaxed);
        let items = &items;
        async move {
            let res = sink.write_batch(items).await;
            if res.is_err() {
                crate::metrics::record_sink_error();
            }
            res
        }
    })
    .await;

    let elapsed = start.elapsed();
    match result {
        Ok(()) => {
            let report = DeliveryReport {
                items: items.len(),
                attempts: attempts.load(Ordering::Relaxed),
                elapsed,
            };
            crate::metrics::record_flush(trigger, "success");
            crate::metrics::record_batch_size(report.items);
            crate::metrics::record_flush_duration(elapsed);
            crate::metrics::record_items_delivered(report.items);
            info!(
                items = report.items,
                attempts = report.attempts,
                elapsed_ms = elapsed.as_millis() as u64,
                trigger,
                "batch delivered"
            );
            Ok(report)
        }
        Err(RetryError::Exhausted { attempts, source }) => {
            crate::metrics::record_flush(trigger, "error");
            crate::metrics::record_items_dropped(items.len());
            warn!(
                items = items.len(),
                attempts,
                error = %source,
                trigger,
                "batch dropped after exhausting sink retries"
            );
            Err(EngineError::SinkFailed { attempts, source })
        }
        Err(RetryError::Cancelled) => {
            crate::metrics::record_flush(trigger, "cancelled");
            crate::metrics::record_items_dropped(items.len());
            warn!(
                items = items.len(),
                trigger,
                "batch dropped, delivery cancelled while waiting to retry"
            );
            Err(EngineError::Cancelled)
        }
    }
}
