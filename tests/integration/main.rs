//! Integration Tests
//!
//! Cross-crate tests through the `quarry` facade:
//! - Lifecycle: prepare, execute, read and close end to end
//! - Plan sharing: one cache across commands, connections and threads
//! - Configuration: file-backed config driving connection behavior
//! - Update path: harvesting and applying server-generated values

#[path = "../common/mod.rs"]
mod common;

mod config;
mod lifecycle;
mod plan_sharing;
mod update_path;
