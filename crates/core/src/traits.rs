//! Collaborator contracts
//!
//! This module defines the narrow interfaces through which commands reach
//! the systems they orchestrate but do not implement:
//! - [`QueryCompiler`]: query text to logical tree
//! - [`ProviderFactory`]: logical tree to store statement, and store commands
//! - [`ProviderCommand`] / [`ProviderReader`]: physical execution
//! - [`ProviderConnection`]: physical connection lifecycle
//!
//! Provider methods report [`ProviderError`]; those errors travel to the
//! caller unchanged.

use std::fmt;

use crate::error::{ProviderError, Result};
use crate::tree::{CommandTree, ParserOptions, Perspective};
use crate::types::{CommandBehavior, ConnectionState, ParameterDirection, TransactionId, TypeUsage};
use crate::value::Value;

/// Compiles query-language text into a logical tree
pub trait QueryCompiler: Send + Sync {
    /// Compile `text` against `perspective`
    ///
    /// `parameters` are the formal parameters (name, type) in declaration
    /// order. `options` of `None` selects the compiler defaults.
    ///
    /// # Errors
    ///
    /// Returns `QueryCompilation` (or any other error) on failure.
    fn compile(
        &self,
        text: &str,
        perspective: &Perspective,
        options: Option<&ParserOptions>,
        parameters: &[(String, TypeUsage)],
    ) -> Result<CommandTree>;
}

/// Parameter declared by a compiled store statement
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreParameterSpec {
    /// Parameter name
    pub name: String,
    /// Parameter type
    pub type_usage: TypeUsage,
}

/// Provider-compiled form of a logical tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStatement {
    /// Store command text
    pub command_text: String,
    /// Store parameters in binding order
    pub parameters: Vec<StoreParameterSpec>,
}

/// Parameter bound on a provider command
#[derive(Debug, Clone, PartialEq)]
pub struct StoreParameter {
    /// Parameter name
    pub name: String,
    /// Parameter direction
    pub direction: ParameterDirection,
    /// Parameter type, if known
    pub type_usage: Option<TypeUsage>,
    /// Bound (or returned) value
    pub value: Value,
}

impl StoreParameter {
    /// Input parameter
    pub fn input(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            direction: ParameterDirection::Input,
            type_usage: None,
            value: value.into(),
        }
    }
}

/// Factory for a backing-store provider
pub trait ProviderFactory: fmt::Debug + Send + Sync {
    /// Invariant provider name (part of plan cache keys)
    fn name(&self) -> &str;

    /// Create an empty provider command
    fn create_command(&self) -> Box<dyn ProviderCommand>;

    /// Compile a logical tree to a store statement
    ///
    /// # Errors
    ///
    /// Returns the provider's error when the tree cannot be compiled.
    fn create_command_definition(
        &self,
        tree: &CommandTree,
    ) -> std::result::Result<StoreStatement, ProviderError>;
}

/// Physical command against the backing store
pub trait ProviderCommand: fmt::Debug + Send {
    /// Store command text
    fn command_text(&self) -> &str;

    /// Set the store command text
    fn set_command_text(&mut self, text: &str);

    /// Timeout in seconds
    fn command_timeout(&self) -> u32;

    /// Set the timeout in seconds
    fn set_command_timeout(&mut self, seconds: u32);

    /// Enlist in (or leave) a transaction
    fn set_transaction(&mut self, transaction: Option<TransactionId>);

    /// Bound parameters
    fn parameters(&self) -> &[StoreParameter];

    /// Mutable bound parameters
    fn parameters_mut(&mut self) -> &mut Vec<StoreParameter>;

    /// Execute without a result set; returns the affected-row count
    ///
    /// # Errors
    ///
    /// Returns the provider's error unchanged.
    fn execute_non_query(&mut self) -> std::result::Result<i64, ProviderError>;

    /// Execute and open a reader
    ///
    /// # Errors
    ///
    /// Returns the provider's error unchanged.
    fn execute_reader(
        &mut self,
        behavior: CommandBehavior,
    ) -> std::result::Result<Box<dyn ProviderReader>, ProviderError>;
}

/// Forward-only reader over a physical result
pub trait ProviderReader: Send {
    /// Advance to the next row; false when exhausted
    fn read(&mut self) -> std::result::Result<bool, ProviderError>;

    /// Number of columns in the current result
    fn field_count(&self) -> usize;

    /// Column value of the current row by position
    fn get_value(&mut self, ordinal: usize) -> std::result::Result<Value, ProviderError>;

    /// Advance to the next result set; false when none remain
    fn next_result(&mut self) -> std::result::Result<bool, ProviderError>;

    /// Rows changed by the statement, or -1 for row-returning statements
    fn records_affected(&self) -> i64;

    /// Release the physical result
    fn close(&mut self);
}

/// Physical connection to the backing store
pub trait ProviderConnection: fmt::Debug + Send + Sync {
    /// Current state
    fn state(&self) -> ConnectionState;

    /// Open the connection
    ///
    /// # Errors
    ///
    /// Returns the provider's error unchanged.
    fn open(&self) -> std::result::Result<(), ProviderError>;

    /// Close the connection
    fn close(&self);
}
