//! Integration tests for the batch engine.
//!
//! These exercise the full engine through its public surface: threshold and
//! interval flushing, retry/backoff against a flaky sink, cancellation, and
//! the close/drain lifecycle. Everything runs in-process against closure
//! sinks - no external backend required.
//!
//! # Running Tests
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//! - `threshold_*` - count-triggered flushing
//! - `interval_*`  - time-triggered flushing
//! - `retry_*`     - sink failure, backoff, exhaustion, cancellation
//! - `lifecycle_*` - close, drain, post-close quiescence
//! - `concurrency_*` - multi-producer behavior

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use batch_engine::{BatchEngine, EngineConfig, EngineError, SinkError};

// =============================================================================
// Sink Helpers
// =============================================================================

type Calls = Arc<Mutex<Vec<Vec<u32>>>>;

/// Install a test-writer subscriber so `RUST_LOG`-style debugging works when
/// a test fails. Safe to call from every test; only the first call wins.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// A sink that records every batch it receives, in call order.
fn recording_sink() -> (Arc<dyn batch_engine::BatchSink<u32>>, Calls) {
    let calls: Calls = Arc::new(Mutex::new(Vec::new()));
    let calls_clone = Arc::clone(&calls);
    let sink = Arc::new(move |items: &[u32]| {
        calls_clone.lock().push(items.to_vec());
        Ok::<(), SinkError>(())
    });
    (sink, calls)
}

/// A sink that fails its first `failures` calls, then succeeds and records.
fn flaky_sink(
    failures: usize,
) -> (Arc<dyn batch_engine::BatchSink<u32>>, Calls, Arc<AtomicUsize>) {
    let calls: Calls = Arc::new(Mutex::new(Vec::new()));
    let attempts = Arc::new(AtomicUsize::new(0));
    let calls_clone = Arc::clone(&calls);
    let attempts_clone = Arc::clone(&attempts);
    let sink = Arc::new(move |items: &[u32]| {
        let n = attempts_clone.fetch_add(1, Ordering::SeqCst);
        if n < failures {
            return Err(SinkError::Backend(format!("transient failure {}", n + 1)));
        }
        calls_clone.lock().push(items.to_vec());
        Ok(())
    });
    (sink, calls, attempts)
}

fn config(flush_count: usize, flush_interval_ms: u64) -> EngineConfig {
    EngineConfig {
        flush_count,
        flush_interval_ms,
        retry_max_attempts: 5,
        retry_initial_delay_ms: 5,
        retry_max_delay_ms: 50,
        retry_factor: 2.0,
    }
}

/// Interval long enough that the scheduler never fires during a test.
const NEVER_MS: u64 = 60_000;

// =============================================================================
// Threshold Flushing
// =============================================================================

#[tokio::test]
async fn threshold_reached_delivers_one_full_batch() {
    init_tracing();
    let (sink, calls) = recording_sink();
    let engine = BatchEngine::new(config(3, NEVER_MS), Some(sink));

    engine.add(1).await.unwrap();
    engine.add(2).await.unwrap();
    assert!(calls.lock().is_empty(), "flushed before threshold");

    engine.add(3).await.unwrap();
    assert_eq!(*calls.lock(), vec![vec![1, 2, 3]]);
    assert_eq!(engine.pending_len(), 0);

    engine.close().await.unwrap();
    assert_eq!(calls.lock().len(), 1, "close re-delivered an empty buffer");
}

#[tokio::test]
async fn threshold_restarts_cleanly_after_each_flush() {
    let (sink, calls) = recording_sink();
    let engine = BatchEngine::new(config(4, NEVER_MS), Some(sink));

    for i in 0..9 {
        engine.add(i).await.unwrap();
    }
    assert_eq!(*calls.lock(), vec![vec![0, 1, 2, 3], vec![4, 5, 6, 7]]);
    assert_eq!(engine.pending_len(), 1);

    engine.close().await.unwrap();
    assert_eq!(calls.lock().last(), Some(&vec![8]));
}

// =============================================================================
// Interval Flushing
// =============================================================================

#[tokio::test]
async fn interval_flushes_a_partial_batch() {
    init_tracing();
    let (sink, calls) = recording_sink();
    // Threshold far away; only the clock can trigger the flush.
    let engine = BatchEngine::new(config(10, 50), Some(sink));

    engine.add(42).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(*calls.lock(), vec![vec![42]]);
    assert_eq!(engine.pending_len(), 0);
    engine.close().await.unwrap();
}

#[tokio::test]
async fn interval_skips_empty_buffer_without_touching_sink() {
    let (sink, calls) = recording_sink();
    let engine = BatchEngine::new(config(10, 20), Some(sink));

    // Several ticks pass with nothing buffered.
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(calls.lock().is_empty());
    assert!(engine.last_error().is_none());
    engine.close().await.unwrap();
}

// =============================================================================
// Retry and Backoff
// =============================================================================

#[tokio::test]
async fn retry_recovers_from_transient_sink_failures() {
    init_tracing();
    let (sink, calls, attempts) = flaky_sink(2);
    let engine = BatchEngine::new(config(2, NEVER_MS), Some(sink));

    let start = Instant::now();
    engine.add(1).await.unwrap();
    engine.add(2).await.unwrap();
    let elapsed = start.elapsed();

    // Two failures then success: three sink calls, one recorded batch.
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(*calls.lock(), vec![vec![1, 2]]);

    // The caller waited out both backoff sleeps (5ms, then 10ms).
    assert!(
        elapsed >= Duration::from_millis(15),
        "returned after {:?}, before backoff could have elapsed",
        elapsed
    );
    engine.close().await.unwrap();
}

#[tokio::test]
async fn retry_exhaustion_drops_the_batch_and_reports_the_last_error() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_clone = Arc::clone(&attempts);
    let sink = Arc::new(move |_items: &[u32]| {
        let n = attempts_clone.fetch_add(1, Ordering::SeqCst) + 1;
        Err::<(), _>(SinkError::Backend(format!("refused call {}", n)))
    });
    let engine = BatchEngine::new(config(2, NEVER_MS), Some(sink));

    engine.add(1).await.unwrap();
    let err = engine.add(2).await.unwrap_err();
    assert_eq!(
        err,
        EngineError::SinkFailed {
            attempts: 5,
            source: SinkError::Backend("refused call 5".to_string()),
        }
    );

    // Exactly the configured attempts, never a sixth.
    assert_eq!(attempts.load(Ordering::SeqCst), 5);

    // Items were dropped, not requeued: the next flush has nothing to send.
    assert_eq!(engine.pending_len(), 0);
}

#[tokio::test]
async fn retry_wait_is_abandoned_when_the_abort_token_fires() {
    init_tracing();
    let sink = Arc::new(|_items: &[u32]| {
        Err::<(), _>(SinkError::Timeout("no response".to_string()))
    });
    let cfg = EngineConfig {
        flush_count: 100,
        flush_interval_ms: NEVER_MS,
        retry_max_attempts: 5,
        retry_initial_delay_ms: 5_000, // would block for seconds without the abort
        retry_max_delay_ms: 10_000,
        retry_factor: 2.0,
    };
    let engine = BatchEngine::new(cfg, Some(sink));
    engine.add(1).await.unwrap();

    let abort = engine.abort_token();
    let flusher = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.flush().await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    abort.cancel();

    let start = Instant::now();
    let result = flusher.await.unwrap();
    assert_eq!(result.unwrap_err(), EngineError::Cancelled);
    assert!(
        start.elapsed() < Duration::from_secs(1),
        "abort did not interrupt the backoff wait"
    );
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn lifecycle_close_drains_once_then_goes_quiet() {
    init_tracing();
    let (sink, calls) = recording_sink();
    let engine = BatchEngine::new(config(100, 30), Some(sink));

    engine.add(1).await.unwrap();
    engine.add(2).await.unwrap();
    engine.close().await.unwrap();

    let after_close = calls.lock().clone();
    assert!(
        after_close.contains(&vec![1, 2]) || after_close.concat() == vec![1, 2],
        "items lost at close: {:?}",
        after_close
    );
    let flushes = after_close.len();

    // No interval ticks fire after close.
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(calls.lock().len(), flushes, "sink invoked after close");
}

#[tokio::test]
async fn lifecycle_double_close_is_rejected() {
    let (sink, _calls) = recording_sink();
    let engine = BatchEngine::new(config(10, NEVER_MS), Some(sink));

    engine.close().await.unwrap();
    assert_eq!(engine.close().await.unwrap_err(), EngineError::Closed);
}

#[tokio::test]
async fn lifecycle_close_with_empty_buffer_never_calls_sink() {
    let (sink, calls) = recording_sink();
    let engine = BatchEngine::new(config(10, NEVER_MS), Some(sink));

    engine.close().await.unwrap();
    assert!(calls.lock().is_empty());
}

#[tokio::test]
async fn lifecycle_drain_flush_still_retries() {
    // close() must not short-circuit the drain's retry loop.
    let (sink, calls, attempts) = flaky_sink(2);
    let engine = BatchEngine::new(config(100, NEVER_MS), Some(sink));

    engine.add(7).await.unwrap();
    engine.close().await.unwrap();

    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(*calls.lock(), vec![vec![7]]);
}

#[tokio::test]
async fn lifecycle_last_error_is_overwritten_by_newer_failures() {
    // Every flush fails with a message naming the batch's first item, so we
    // can watch the single error slot get overwritten.
    let sink = Arc::new(|items: &[u32]| {
        Err::<(), _>(SinkError::Backend(format!("reject {}", items[0])))
    });
    let cfg = EngineConfig {
        flush_count: 100,
        flush_interval_ms: 25,
        retry_max_attempts: 1,
        retry_initial_delay_ms: 1,
        retry_max_delay_ms: 5,
        retry_factor: 2.0,
    };
    let engine = BatchEngine::new(cfg, Some(sink));

    engine.add(1).await.unwrap();
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(
        engine.last_error(),
        Some(EngineError::SinkFailed {
            attempts: 1,
            source: SinkError::Backend("reject 1".to_string()),
        })
    );

    engine.add(2).await.unwrap();
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(
        engine.last_error(),
        Some(EngineError::SinkFailed {
            attempts: 1,
            source: SinkError::Backend("reject 2".to_string()),
        })
    );
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test]
async fn concurrency_two_producers_lose_nothing_and_duplicate_nothing() {
    init_tracing();
    let (sink, calls) = recording_sink();
    let engine = BatchEngine::new(config(10, NEVER_MS), Some(sink));

    let producer = |engine: BatchEngine<u32>, base: u32| {
        tokio::spawn(async move {
            for i in 0..50 {
                engine.add(base + i).await.unwrap();
            }
        })
    };
    let a = producer(engine.clone(), 0);
    let b = producer(engine.clone(), 1_000);
    a.await.unwrap();
    b.await.unwrap();
    engine.close().await.unwrap();

    let mut delivered: Vec<u32> = calls.lock().concat();
    assert_eq!(delivered.len(), 100, "lost or duplicated items");
    delivered.sort_unstable();
    delivered.dedup();
    assert_eq!(delivered.len(), 100, "duplicated items");

    // Full batches are exactly threshold-sized; adds serialize on the buffer
    // lock, so nothing can slip past a crossing without being in some batch.
    for batch in calls.lock().iter() {
        assert!(batch.len() <= 10);
    }
}
