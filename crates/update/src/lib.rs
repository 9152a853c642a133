//! Update command execution for Quarry
//!
//! Persisting tracked changes runs one physical command per extracted change
//! entry. This crate holds the pieces of that path:
//! - PropagatorResult: value trees produced from change entries, with flags
//!   and (for server-generated members) the record to write values back into
//! - ExtractedStateEntry: one change entry with its original and current trees
//! - FunctionUpdateCommand: binds identifiers, executes and harvests
//!   server-generated column values
//! - apply_server_generated_values: feeds harvested values back into the
//!   change-tracking graph

#![warn(missing_docs)]
#![warn(clippy::all)]

mod apply;
mod command;
mod entry;
mod propagator;

pub use apply::apply_server_generated_values;
pub use command::{FunctionUpdateCommand, GeneratedValues, UpdateTranslator};
pub use entry::{EntityState, ExtractedStateEntry};
pub use propagator::{CurrentValueRecord, PropagatorFlags, PropagatorResult, StructuralType};

#[cfg(test)]
mod test_support;
