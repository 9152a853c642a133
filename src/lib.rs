//! Quarry - command preparation and query plan caching for data-access layers
//!
//! Quarry turns query text, command trees or function-import references into
//! provider-compiled command definitions, caches those definitions across
//! commands and connections, and binds provider readers back to the command
//! that opened them.
//!
//! # Quick Start
//!
//! ```ignore
//! use quarry::{Command, CommandBehavior, Connection, Parameter};
//!
//! let conn = Connection::builder()
//!     .workspace(workspace)
//!     .provider(provider)
//!     .store_connection(store)
//!     .query_compiler(compiler)
//!     .build()?;
//! conn.open()?;
//!
//! let cmd = Command::with_connection("SELECT VALUE c FROM Customers AS c WHERE c.Id = @id", conn);
//! cmd.add_parameter(Parameter::new("id", 42i32))?;
//! let mut reader = cmd.execute_reader(CommandBehavior::DEFAULT)?;
//! while reader.read()? {
//!     let name = reader.get_value(1)?;
//! }
//! ```
//!
//! # Architecture
//!
//! - `quarry-core`: values, parameters, trees and collaborator contracts
//! - `quarry-cache`: the concurrent plan cache
//! - `quarry-executor`: commands, connections, definitions and readers
//! - `quarry-update`: update command execution (re-exported as [`update`])

pub use quarry_executor::*;

/// Update command execution
pub use quarry_update as update;

/// Scripted collaborators for tests and demos
pub use quarry_core::testing;

/// Collaborator contracts implemented by providers and query compilers
pub mod contracts {
    pub use quarry_core::{
        FunctionImport, FunctionParameter, InMemoryWorkspace, MetadataWorkspace, ParserOptions,
        Perspective, ProviderCommand, ProviderConnection, ProviderFactory, ProviderReader,
        QueryCompiler, StoreParameter, StoreParameterSpec, StoreStatement, TreeKind,
    };
}
