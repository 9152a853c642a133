//! Core types and contracts for Quarry
//!
//! This crate defines the foundational types shared by every layer:
//! - Value: Unified value enum for parameter and column data
//! - TypeUsage / PrimitiveTypeKind / DbType: Type descriptors
//! - Parameter / ParameterCollection: Named command parameters with dirty tracking
//! - CommandTree: Store-agnostic logical tree handed to providers
//! - MetadataWorkspace: Model metadata contract (+ in-memory implementation)
//! - Traits: Query compiler and physical provider contracts
//! - Error: Error taxonomy (InvalidState / NotSupported / Provider / Config)
//! - testing: Scripted collaborators for tests and examples

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod metadata;
pub mod parameter;
pub mod testing;
pub mod traits;
pub mod tree;
pub mod types;
pub mod value;

pub use error::{Error, ErrorKind, ProviderError, Result};
pub use metadata::{
    FunctionImport, FunctionParameter, InMemoryWorkspace, InMemoryWorkspaceBuilder,
    MetadataWorkspace,
};
pub use parameter::{Parameter, ParameterCollection};
pub use traits::{
    ProviderCommand, ProviderConnection, ProviderFactory, ProviderReader, QueryCompiler,
    StoreParameter, StoreParameterSpec, StoreStatement,
};
pub use tree::{CommandTree, ParserOptions, Perspective, TreeKind};
pub use types::{
    CommandBehavior, CommandType, ConnectionState, DbType, ParameterDirection, PrimitiveTypeKind,
    TransactionId, TypeUsage, UpdateRowSource,
};
pub use value::Value;
