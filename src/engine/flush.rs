//! Flush coordination: detach under the lock, deliver outside it.

use crate::batching::pending::{Batch, FlushReason};

use super::types::{DeliveryReport, EngineError};
use super::{BatchEngine, Inner};

impl<T> BatchEngine<T>
where
    T: Send + Sync + 'static,
{
    /// Force a flush of everything currently buffered.
    ///
    /// Detaching an empty buffer is a no-op that never touches the sink and
    /// returns `Ok(())` even when no sink is configured.
    pub async fn flush(&self) -> Result<(), EngineError> {
        self.inner.flush_with_reason(FlushReason::Manual).await?;
        Ok(())
    }
}

impl<T> Inner<T>
where
    T: Send + Sync + 'static,
{
    /// Detach the pending buffer and, if it held anything, deliver the batch.
    ///
    /// The buffer lock covers only the detach; the sink call happens after it
    /// is released. Two flushes triggered close together can therefore each
    /// detach a disjoint, non-empty batch and invoke the sink concurrently -
    /// a deliberate trade against holding the lock across slow I/O.
    pub(super) async fn flush_with_reason(
        &self,
        reason: FlushReason,
    ) -> Result<Option<DeliveryReport>, EngineError> {
        let batch = {
            let mut shared = self.shared.lock();
            let batch = shared.buffer.detach(reason);
            crate::metrics::set_pending_items(shared.buffer.len());
            batch
        };

        match batch {
            Some(batch) => self.deliver(batch).await.map(Some),
            None => Ok(None),
        }
    }

    /// Hand one detached batch to the sink through the retry adapter.
    ///
    /// Once a batch reaches this point its items are gone from the buffer
    /// regardless of outcome: at-most-once, fail-open.
    pub(super) async fn deliver(&self, batch: Batch<T>) -> Result<DeliveryReport, EngineError> {
        let Some(sink) = self.sink.as_deref() else {
            crate::metrics::record_flush(batch.reason.label(), "error");
            crate::metrics::record_items_dropped(batch.len());
            return Err(EngineError::NoSink);
        };

        super::delivery::deliver(sink, batch, &self.retry, &self.abort).await
    }
}
