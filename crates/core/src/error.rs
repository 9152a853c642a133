//! Error types for Quarry
//!
//! Every failure surfaced by the command pipeline is a variant of [`Error`].
//! Variants are grouped into a small taxonomy exposed through [`ErrorKind`]:
//!
//! | Kind | Meaning |
//! |------|---------|
//! | `InvalidState` | Operation not permitted in the current command/connection/reader state |
//! | `NotSupported` | Requested mode is not supported (e.g. command type) |
//! | `Provider` | Raised by the physical provider, passed through unchanged |
//! | `Config` | Configuration could not be read or is invalid |
//!
//! We use `thiserror` for `Display` and `Error` implementations.

use crate::types::{CommandType, ConnectionState};
use std::fmt;
use thiserror::Error;

/// Result type alias for Quarry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Operation not permitted given current state
    InvalidState,
    /// Unsupported mode or value
    NotSupported,
    /// Physical provider failure
    Provider,
    /// Configuration failure
    Config,
}

/// Failure reported by a physical provider (connection, command or reader)
///
/// Provider errors are never rewritten by the command pipeline; they reach
/// the caller exactly as the provider produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    /// Provider-specific error code, if any
    pub code: Option<i32>,
    /// Human readable message
    pub message: String,
}

impl ProviderError {
    /// Create a provider error without a code
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    /// Create a provider error with a provider-specific code
    pub fn with_code(code: i32, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "provider error {}: {}", code, self.message),
            None => write!(f, "provider error: {}", self.message),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Errors raised while preparing or executing commands
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    // ==================== Command State ====================
    /// A data reader bound to the command is still open
    #[error("the data reader associated with this command is still open")]
    ReaderStillOpen,

    /// Command text requested after a command tree was set
    #[error("cannot get command text: the command tree has been set")]
    CannotGetCommandText,

    /// Command text assigned after a command tree was set
    #[error("cannot set command text: a command tree has already been set")]
    CannotSetCommandText,

    /// Command tree requested after command text was set
    #[error("cannot get command tree: command text has been set")]
    CannotGetCommandTree,

    /// Command tree assigned after command text was set
    #[error("cannot set command tree: command text has already been set")]
    CannotSetCommandTree,

    /// Command tree assigned on a command whose type is not Text
    #[error("a command tree can only be set on a command of type Text")]
    TreeOnStoredProcedureCommand,

    /// Text command with neither text nor tree
    #[error("command text was not set")]
    NoCommandText,

    /// Command built from a prepared definition cannot be re-prepared without text
    #[error(
        "this command was created from a prepared command definition and has no command text; \
         create a new command definition to change its parameters"
    )]
    CannotReprepareDefinitionBased,

    /// Data reader used after it was closed
    #[error("invalid attempt to read when the data reader is closed")]
    ReaderClosed,

    // ==================== Connection State ====================
    /// No connection attached to the command
    #[error("no connection is associated with this command")]
    NoConnection,

    /// Connection lacks a provider factory or store connection
    #[error("a store provider and store connection must be configured before this operation")]
    ConnectionStringNeeded,

    /// Connection is closed or broken
    #[error("execution requires an open connection; the connection's current state is {state}")]
    ConnectionNotOpen {
        /// Observed connection state
        state: ConnectionState,
    },

    /// Connection is already open
    #[error("the connection is already open and cannot be opened again")]
    CannotReopenConnection,

    /// Store metadata could not be loaded for the workspace
    #[error("store metadata unavailable: {reason}")]
    StoreMetadataUnavailable {
        /// Reason reported by the workspace
        reason: String,
    },

    // ==================== Stored Procedures ====================
    /// Stored-procedure command has empty or whitespace text
    #[error("the command text of a stored procedure command must name a function import")]
    EmptyFunctionImportText,

    /// Stored-procedure text is not `container.functionImport`
    #[error("invalid function import reference '{text}': expected 'container.functionImport'")]
    InvalidFunctionImportText {
        /// Offending command text
        text: String,
    },

    /// Function import could not be resolved in the workspace
    #[error("function import '{container}.{name}' was not found")]
    FunctionImportNotFound {
        /// Container name
        container: String,
        /// Function import name
        name: String,
    },

    // ==================== Parameters ====================
    /// Parameter with an empty name
    #[error("parameter names must not be empty")]
    EmptyParameterName,

    /// Non-input parameter on a text command
    #[error("parameter '{name}' must be an input parameter")]
    InvalidParameterDirection {
        /// Parameter name
        name: String,
    },

    /// Parameter type cannot be determined
    #[error("the type of parameter '{name}' cannot be deduced; set a type or a non-null value")]
    UnknownParameterType {
        /// Parameter name
        name: String,
    },

    /// Two parameters share a name
    #[error("duplicate parameter name '{name}'")]
    DuplicateParameterName {
        /// Parameter name
        name: String,
    },

    // ==================== Metadata ====================
    /// Tree metadata does not match the connection metadata
    #[error("the command tree metadata is incompatible with the connection metadata")]
    MetadataIncompatible,

    /// Text command prepared on a connection without a query compiler
    #[error("the connection has no query compiler; text commands cannot be prepared")]
    QueryCompilerUnavailable,

    /// Query text failed to compile
    #[error("query compilation failed: {message}")]
    QueryCompilation {
        /// Compiler message
        message: String,
    },

    /// Structural result does not match its type's members
    #[error("structural result has {actual} members, its type declares {expected}")]
    StructuralMismatch {
        /// Declared member count
        expected: usize,
        /// Supplied child count
        actual: usize,
    },

    // ==================== Update ====================
    /// No value was supplied for an input identifier of an update command
    #[error("no value was supplied for input identifier {identifier}")]
    MissingInputIdentifier {
        /// Identifier of the key value
        identifier: i64,
    },

    // ==================== Not Supported ====================
    /// Command type other than Text or StoredProcedure
    #[error("command type {command_type} is not supported")]
    UnsupportedCommandType {
        /// Rejected command type
        command_type: CommandType,
    },

    // ==================== Provider ====================
    /// Raised by the physical provider
    #[error(transparent)]
    Provider(#[from] ProviderError),

    // ==================== Configuration ====================
    /// Configuration error
    #[error("configuration error: {reason}")]
    Config {
        /// Reason
        reason: String,
    },
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnsupportedCommandType { .. } => ErrorKind::NotSupported,
            Error::Provider(_) => ErrorKind::Provider,
            Error::Config { .. } => ErrorKind::Config,
            _ => ErrorKind::InvalidState,
        }
    }

    /// Whether this error is in the InvalidState class
    pub fn is_invalid_state(&self) -> bool {
        self.kind() == ErrorKind::InvalidState
    }

    /// Create a configuration error
    pub fn config(reason: impl Into<String>) -> Self {
        Error::Config {
            reason: reason.into(),
        }
    }
}
