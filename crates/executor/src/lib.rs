//! # Quarry Executor
//!
//! Command preparation, plan caching and execution.
//!
//! This crate provides:
//! - [`Connection`] - Workspace, provider, store connection and plan cache
//! - [`Command`] - Statement, parameters and the prepare/execute lifecycle
//! - [`CommandDefinition`] - Immutable compiled form shared via the plan cache
//! - [`DataReader`] - Reader bound to the command that opened it
//! - [`QuarryConfig`] - Configuration loaded from `quarry.toml`
//!
//! ## Quick Start
//!
//! ```text
//! use quarry_executor::{Command, Connection, Parameter};
//!
//! let conn = Connection::builder()
//!     .workspace(workspace)
//!     .provider(provider)
//!     .store_connection(store)
//!     .query_compiler(compiler)
//!     .build()?;
//! conn.open()?;
//!
//! let cmd = Command::with_connection("SELECT VALUE c.Name FROM Customers AS c WHERE c.Id = @id", conn);
//! cmd.add_parameter(Parameter::new("id", 42i32))?;
//! let name = cmd.execute_scalar()?;
//! ```
//!
//! ## Plan Caching
//!
//! Text commands are looked up in the connection's plan cache by command
//! type, text, parameter shapes, mapping and provider. Stored-procedure and
//! tree commands always compile.

#![warn(missing_docs)]

mod command;
mod config;
mod connection;
mod definition;
mod reader;
mod resolver;
mod tree_builder;

// Test modules
#[cfg(test)]
mod tests;

// =============================================================================
// Public API
// =============================================================================

pub use command::{Command, ReaderClosingObserver};
pub use config::{CommandConfig, PlanCacheConfig, QuarryConfig, CONFIG_FILE_NAME};
pub use connection::{Connection, ConnectionBuilder, DefinitionCache};
pub use definition::CommandDefinition;
pub use reader::DataReader;
pub use resolver::{resolve_parameter_types, ResolvedParameter, ResolvedParameters};
pub use tree_builder::parse_function_import_name;

// Re-export the vocabulary so users don't need quarry-core directly
pub use quarry_core::{
    CommandBehavior, CommandTree, CommandType, ConnectionState, DbType, Error, ErrorKind,
    FunctionImport, MetadataWorkspace, Parameter, ParameterCollection, ParameterDirection,
    PrimitiveTypeKind, ProviderError, Result, TransactionId, TypeUsage, UpdateRowSource, Value,
};

// Re-export the cache types returned by Connection::plan_cache
pub use quarry_cache::{CacheKey, CacheStats, PlanCache};
