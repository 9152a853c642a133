//! Scripted collaborators for tests
//!
//! This module provides in-memory stand-ins for every external collaborator
//! a command talks to:
//!
//! - **ScriptedProvider**: Provider factory that compiles trees to readable
//!   store text and hands out commands with scripted results
//! - **ScriptedCommand / ScriptedReader**: Physical command and reader that
//!   replay a [`ScriptedResult`] and record each execution
//! - **ScriptedConnection**: Physical connection with controllable state
//! - **StubCompiler**: Query compiler that wraps the trimmed text in a tree
//!
//! # Example
//!
//! ```ignore
//! use quarry_core::testing::{ScriptedProvider, ScriptedResult};
//!
//! let provider = ScriptedProvider::new("scripted");
//! provider.push_result(ScriptedResult::rows(vec![vec![Value::Int32(1)]]));
//! // ... run a command ...
//! assert_eq!(provider.log().len(), 1);
//! ```

mod compiler;
mod connection;
mod provider;

pub use compiler::StubCompiler;
pub use connection::ScriptedConnection;
pub use provider::{
    ExecutionLog, ExecutionRecord, ScriptedCommand, ScriptedProvider, ScriptedReader,
    ScriptedResult,
};
