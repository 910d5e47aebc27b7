//! Item accumulation for batched sink writes.

pub mod pending;
