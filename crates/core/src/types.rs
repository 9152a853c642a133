//! Core types for Quarry
//!
//! This module defines the small vocabulary shared by every layer:
//! - PrimitiveTypeKind / DbType / TypeUsage: Type descriptors
//! - ParameterDirection: Parameter direction
//! - CommandType: Text vs stored-procedure commands
//! - CommandBehavior: Execution behavior flags
//! - ConnectionState: Connection lifecycle state
//! - UpdateRowSource: How results are applied back to rows
//! - TransactionId: Opaque transaction handle

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use uuid::Uuid;

/// Primitive type of a model value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PrimitiveTypeKind {
    /// Boolean
    Boolean,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 64-bit floating point
    Double,
    /// Unicode string
    String,
    /// Binary blob
    Binary,
    /// 128-bit GUID
    Guid,
    /// UTC date and time
    DateTime,
}

impl PrimitiveTypeKind {
    /// Type name as used in trace output and cache keys
    pub fn name(&self) -> &'static str {
        match self {
            PrimitiveTypeKind::Boolean => "Boolean",
            PrimitiveTypeKind::Int32 => "Int32",
            PrimitiveTypeKind::Int64 => "Int64",
            PrimitiveTypeKind::Double => "Double",
            PrimitiveTypeKind::String => "String",
            PrimitiveTypeKind::Binary => "Binary",
            PrimitiveTypeKind::Guid => "Guid",
            PrimitiveTypeKind::DateTime => "DateTime",
        }
    }

    /// Whether a max-length facet applies to this kind
    pub fn is_sized(&self) -> bool {
        matches!(self, PrimitiveTypeKind::String | PrimitiveTypeKind::Binary)
    }
}

impl fmt::Display for PrimitiveTypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Provider-level declared kind of a parameter
///
/// `Object` is the generic kind: the parameter's type must then come from
/// an explicit [`TypeUsage`] or be inferred from its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DbType {
    /// Untyped; infer from value
    #[default]
    Object,
    /// Boolean
    Boolean,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 64-bit floating point
    Double,
    /// Unicode string
    String,
    /// Binary blob
    Binary,
    /// GUID
    Guid,
    /// UTC date and time
    DateTime,
}

impl DbType {
    /// Primitive kind this declared kind maps to (`None` for `Object`)
    pub fn primitive_kind(&self) -> Option<PrimitiveTypeKind> {
        match self {
            DbType::Object => None,
            DbType::Boolean => Some(PrimitiveTypeKind::Boolean),
            DbType::Int32 => Some(PrimitiveTypeKind::Int32),
            DbType::Int64 => Some(PrimitiveTypeKind::Int64),
            DbType::Double => Some(PrimitiveTypeKind::Double),
            DbType::String => Some(PrimitiveTypeKind::String),
            DbType::Binary => Some(PrimitiveTypeKind::Binary),
            DbType::Guid => Some(PrimitiveTypeKind::Guid),
            DbType::DateTime => Some(PrimitiveTypeKind::DateTime),
        }
    }
}

/// Type descriptor: a primitive kind plus facets
///
/// Compared structurally; two usages with the same kind and facets are
/// interchangeable for compilation and caching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeUsage {
    kind: PrimitiveTypeKind,
    max_length: Option<u32>,
    nullable: bool,
}

impl TypeUsage {
    /// Nullable usage of a primitive kind with no facets
    pub fn primitive(kind: PrimitiveTypeKind) -> Self {
        Self {
            kind,
            max_length: None,
            nullable: true,
        }
    }

    /// Set the max-length facet (ignored for kinds without one)
    pub fn with_max_length(mut self, max_length: u32) -> Self {
        if self.kind.is_sized() {
            self.max_length = Some(max_length);
        }
        self
    }

    /// Set nullability
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Primitive kind
    pub fn kind(&self) -> PrimitiveTypeKind {
        self.kind
    }

    /// Max-length facet
    pub fn max_length(&self) -> Option<u32> {
        self.max_length
    }

    /// Nullability facet
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }
}

impl fmt::Display for TypeUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(len) = self.max_length {
            write!(f, "({})", len)?;
        }
        if !self.nullable {
            f.write_str(" not null")?;
        }
        Ok(())
    }
}

/// Direction of a command parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ParameterDirection {
    /// Value flows to the store
    #[default]
    Input,
    /// Value flows back from the store
    Output,
    /// Both directions
    InputOutput,
    /// Store procedure return value
    ReturnValue,
}

impl ParameterDirection {
    /// Whether the store may write a value back into this parameter
    pub fn receives_store_value(&self) -> bool {
        !matches!(self, ParameterDirection::Input)
    }
}

/// How a command's text is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CommandType {
    /// Query-language statement (or an explicit command tree)
    #[default]
    Text,
    /// `container.functionImport` reference
    StoredProcedure,
    /// Direct table access (not supported by commands)
    TableDirect,
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandType::Text => f.write_str("Text"),
            CommandType::StoredProcedure => f.write_str("StoredProcedure"),
            CommandType::TableDirect => f.write_str("TableDirect"),
        }
    }
}

/// Behavior flags passed to reader execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CommandBehavior(u8);

impl CommandBehavior {
    /// No special behavior
    pub const DEFAULT: CommandBehavior = CommandBehavior(0);
    /// Only the first result set is returned
    pub const SINGLE_RESULT: CommandBehavior = CommandBehavior(1);
    /// Only column metadata is returned
    pub const SCHEMA_ONLY: CommandBehavior = CommandBehavior(1 << 1);
    /// Key information is returned with column metadata
    pub const KEY_INFO: CommandBehavior = CommandBehavior(1 << 2);
    /// At most one row is expected
    pub const SINGLE_ROW: CommandBehavior = CommandBehavior(1 << 3);
    /// Columns are read in order, once each
    pub const SEQUENTIAL_ACCESS: CommandBehavior = CommandBehavior(1 << 4);
    /// Closing the reader closes the connection
    pub const CLOSE_CONNECTION: CommandBehavior = CommandBehavior(1 << 5);

    /// Whether all flags of `other` are set
    pub fn contains(&self, other: CommandBehavior) -> bool {
        self.0 & other.0 == other.0
    }

    /// Raw bits
    pub fn bits(&self) -> u8 {
        self.0
    }
}

impl BitOr for CommandBehavior {
    type Output = CommandBehavior;

    fn bitor(self, rhs: Self) -> Self::Output {
        CommandBehavior(self.0 | rhs.0)
    }
}

impl BitOrAssign for CommandBehavior {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Not open
    #[default]
    Closed,
    /// Open and usable
    Open,
    /// Opening
    Connecting,
    /// Executing a command
    Executing,
    /// Fetching results
    Fetching,
    /// Unusable; must be closed and reopened
    Broken,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Closed => "Closed",
            ConnectionState::Open => "Open",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Executing => "Executing",
            ConnectionState::Fetching => "Fetching",
            ConnectionState::Broken => "Broken",
        };
        f.write_str(name)
    }
}

/// How command results are applied to a source row after an update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UpdateRowSource {
    /// Results are ignored
    None,
    /// Output parameters are mapped back
    OutputParameters,
    /// The first returned record is mapped back
    FirstReturnedRecord,
    /// Output parameters and the first returned record are mapped back
    #[default]
    Both,
}

/// Opaque handle of a store transaction
///
/// A TransactionId is a wrapper around a UUID v4. Commands carry it to the
/// provider command they execute so the provider can enlist the command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(Uuid);

impl TransactionId {
    /// Create a new random TransactionId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
