//! Configuration for the batch engine.
//!
//! # Example
//!
//! ```
//! use batch_engine::EngineConfig;
//!
//! // Minimal config (uses defaults)
//! let config = EngineConfig::default();
//! assert_eq!(config.flush_count, 1000);
//!
//! // Full config
//! let config = EngineConfig {
//!     flush_count: 100,
//!     flush_interval_ms: 250,
//!     retry_max_attempts: 3,
//!     ..Default::default()
//! };
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::resilience::retry::RetryPolicy;

/// Configuration for the batch engine.
///
/// All fields have sensible defaults. The threshold and interval decide when
/// a batch is handed to the sink; the retry fields parameterise the backoff
/// applied to each sink write.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Flush after this many buffered items (default: 1000)
    #[serde(default = "default_flush_count")]
    pub flush_count: usize,

    /// Interval scheduler period in milliseconds (default: 800)
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,

    /// Maximum sink write attempts per batch (default: 5)
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: usize,

    /// First backoff delay in milliseconds (default: 200)
    #[serde(default = "default_retry_initial_delay_ms")]
    pub retry_initial_delay_ms: u64,

    /// Backoff delay cap in milliseconds (default: 5000)
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,

    /// Backoff multiplier applied after each failed attempt (default: 2.0)
    #[serde(default = "default_retry_factor")]
    pub retry_factor: f64,
}

fn default_flush_count() -> usize { 1000 }
fn default_flush_interval_ms() -> u64 { 800 }
fn default_retry_max_attempts() -> usize { 5 }
fn default_retry_initial_delay_ms() -> u64 { 200 }
fn default_retry_max_delay_ms() -> u64 { 5000 }
fn default_retry_factor() -> f64 { 2.0 }

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            flush_count: default_flush_count(),
            flush_interval_ms: default_flush_interval_ms(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_initial_delay_ms: default_retry_initial_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            retry_factor: default_retry_factor(),
        }
    }
}

impl EngineConfig {
    /// The interval scheduler period.
    #[must_use]
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// Build the retry policy applied to sink writes.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_max_attempts,
            initial_delay: Duration::from_millis(self.retry_initial_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
            factor: self.retry_factor,
        }
    }
}
