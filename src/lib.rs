//! # Batch Engine
//!
//! A generic, concurrency-safe batching and reliable-delivery engine.
//!
//! The engine decouples a high-rate stream of incoming items from a slow
//! downstream bulk-write sink: items accumulate in an in-memory buffer and are
//! flushed as a unit when either a count threshold is reached or a fixed time
//! interval elapses. Every flush is forwarded to the sink through a bounded
//! retry-with-backoff policy.
//!
//! ```text
//! producers ──► add() ──► PendingBuffer ──┐ (threshold crossed)
//!                                         ├──► flush ──► retry/backoff ──► BatchSink
//! interval scheduler ─────── tick ────────┘
//! ```
//!
//! ## Delivery contract
//!
//! - Within a batch, items arrive at the sink in insertion order.
//! - Across batches there is **no** ordering guarantee: a threshold flush and
//!   an interval flush triggered close together may call the sink
//!   concurrently, each with a disjoint batch. Sinks must tolerate this.
//! - Delivery is at-most-once: a batch that exhausts all retry attempts is
//!   dropped, not requeued. Durability belongs to the upstream transport.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use batch_engine::{BatchEngine, EngineConfig, SinkError};
//!
//! #[tokio::main]
//! async fn main() {
//!     let sink = Arc::new(|items: &[String]| {
//!         println!("writing {} items", items.len());
//!         Ok::<(), SinkError>(())
//!     });
//!
//!     let engine = BatchEngine::new(EngineConfig::default(), Some(sink));
//!
//!     engine.add("hello".to_string()).await.expect("add failed");
//!
//!     // Stops the interval scheduler and drains whatever is still buffered.
//!     engine.close().await.expect("close failed");
//! }
//! ```
//!
//! ## Modules
//!
//! - [`engine`]: the [`BatchEngine`] orchestrating buffer, scheduler and sink
//! - [`batching`]: the pending buffer and batch types
//! - [`resilience`]: retry policy and backoff combinator
//! - [`sink`]: the [`BatchSink`] trait consumed by the engine

pub mod batching;
pub mod config;
pub mod engine;
pub mod metrics;
pub mod resilience;
pub mod sink;

pub use batching::pending::{Batch, FlushReason, PendingBuffer};
pub use config::EngineConfig;
pub use engine::{BatchEngine, DeliveryReport, EngineError};
pub use resilience::retry::{retry_with_backoff, RetryError, RetryPolicy};
pub use sink::{BatchSink, SinkError};
