//! Plan caching for Quarry
//!
//! This crate provides the process-wide store of compiled command
//! definitions:
//! - CacheKey: Structural identity of a command's compiled shape
//! - PlanCache: Bounded, concurrently accessed key to definition map
//! - CacheStats: Hit/miss/eviction counters
//!
//! The cache is generic over the cached value so it has no dependency on
//! the executor that produces definitions.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod key;
pub mod plan_cache;

pub use key::{CacheKey, KeyParameter};
pub use plan_cache::{CacheStats, PlanCache, DEFAULT_CAPACITY};
