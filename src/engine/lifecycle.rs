//! Engine lifecycle: the interval scheduler task and shutdown.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::batching::pending::FlushReason;

use super::types::EngineError;
use super::{BatchEngine, Inner};

impl<T> BatchEngine<T>
where
    T: Send + Sync + 'static,
{
    /// Stop the interval scheduler and drain the buffer.
    ///
    /// Raises the scheduler's stop signal, waits for the scheduler task to
    /// terminate, then performs exactly one final drain flush and returns its
    /// outcome. If the buffer is already empty the sink is not invoked.
    ///
    /// Must be called at most once; a second call returns
    /// [`EngineError::Closed`].
    ///
    /// Known race: a flush triggered by a producer's `add` that is still in
    /// progress on that producer's task is not awaited here - it runs to
    /// completion independently, and may hand its batch to the sink after
    /// `close` has returned.
    pub async fn close(&self) -> Result<(), EngineError> {
        let handle = self
            .inner
            .scheduler
            .lock()
            .take()
            .ok_or(EngineError::Closed)?;

        info!("closing batch engine");
        self.inner.stop.cancel();
        if let Err(err) = handle.await {
            warn!(error = %err, "interval scheduler task did not join cleanly");
        }

        match self.inner.flush_with_reason(FlushReason::Shutdown).await? {
            Some(report) => info!(items = report.items, "final drain flush complete"),
            None => debug!("buffer empty at close, no drain flush needed"),
        }
        Ok(())
    }
}

/// Spawn the one background task that periodically triggers a flush.
///
/// Errors from interval-triggered flushes are not returned to anyone; they
/// overwrite the engine's single last-error slot, readable via
/// [`BatchEngine::last_error`]. The task exits when the stop token fires,
/// letting an in-flight tick's flush run to completion first.
pub(super) fn spawn_scheduler<T>(inner: Arc<Inner<T>>) -> JoinHandle<()>
where
    T: Send + Sync + 'static,
{
    tokio::spawn(async move {
        let period = inner.config.flush_interval();
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        debug!(period_ms = period.as_millis() as u64, "interval scheduler started");

        loop {
            tokio::select! {
                _ = inner.stop.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(err) = inner.flush_with_reason(FlushReason::Interval).await {
                        warn!(error = %err, "interval flush failed");
                        inner.shared.lock().last_error = Some(err);
                    }
                }
            }
        }

        debug!("interval scheduler stopped");
    })
}
