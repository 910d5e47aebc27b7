//! Retry and backoff policies for sink delivery.

pub mod retry;
