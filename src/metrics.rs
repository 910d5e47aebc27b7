// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for batch-engine.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The embedding application is responsible for choosing the exporter
//! (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `batch_engine_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `trigger`: threshold, interval, manual, shutdown
//! - `status`: success, error, cancelled

use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Record a completed flush by trigger and outcome.
pub fn record_flush(trigger: &str, status: &str) {
    counter!(
        "batch_engine_flushes_total",
        "trigger" => trigger.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record the size of a delivered batch.
pub fn record_batch_size(count: usize) {
    histogram!("batch_engine_batch_size").record(count as f64);
}

/// Record wall time for one delivery (all attempts included).
pub fn record_flush_duration(duration: Duration) {
    histogram!("batch_engine_flush_seconds").record(duration.as_secs_f64());
}

/// Record one failed sink write attempt.
pub fn record_sink_error() {
    counter!("batch_engine_sink_errors_total").increment(1);
}

/// Record items successfully handed to the sink.
pub fn record_items_delivered(count: usize) {
    counter!("batch_engine_items_delivered_total").increment(count as u64);
}

/// Record items dropped after retry exhaustion or cancellation.
pub fn record_items_dropped(count: usize) {
    counter!("batch_engine_items_dropped_total").increment(count as u64);
}

/// Set current buffered item count.
pub fn set_pending_items(count: usize) {
    gauge!("batch_engine_pending_items").set(count as f64);
}
