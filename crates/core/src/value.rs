//! Value types for Quarry
//!
//! This module defines:
//! - Value: Unified enum for parameter values and column data
//!
//! ## Type Rules
//!
//! - No implicit coercions: `Int32(1) != Int64(1)`
//! - `Binary` is not `String`
//! - `Double` uses IEEE-754 equality: `NaN != NaN`, `-0.0 == 0.0`
//! - `Null` carries no type; a parameter whose only information is a
//!   `Null` value cannot be typed

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::PrimitiveTypeKind;

/// Value exchanged with providers and stored in parameters
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    /// Null value
    #[default]
    Null,
    /// Boolean value
    Bool(bool),
    /// 32-bit signed integer
    Int32(i32),
    /// 64-bit signed integer
    Int64(i64),
    /// 64-bit floating point (IEEE-754)
    Double(f64),
    /// UTF-8 string
    String(String),
    /// Raw bytes
    Binary(Vec<u8>),
    /// GUID
    Guid(Uuid),
    /// UTC timestamp
    DateTime(DateTime<Utc>),
}

impl Value {
    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int32(_) => "Int32",
            Value::Int64(_) => "Int64",
            Value::Double(_) => "Double",
            Value::String(_) => "String",
            Value::Binary(_) => "Binary",
            Value::Guid(_) => "Guid",
            Value::DateTime(_) => "DateTime",
        }
    }

    /// Primitive kind inferred from the value, `None` for `Null`
    pub fn primitive_kind(&self) -> Option<PrimitiveTypeKind> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(PrimitiveTypeKind::Boolean),
            Value::Int32(_) => Some(PrimitiveTypeKind::Int32),
            Value::Int64(_) => Some(PrimitiveTypeKind::Int64),
            Value::Double(_) => Some(PrimitiveTypeKind::Double),
            Value::String(_) => Some(PrimitiveTypeKind::String),
            Value::Binary(_) => Some(PrimitiveTypeKind::Binary),
            Value::Guid(_) => Some(PrimitiveTypeKind::Guid),
            Value::DateTime(_) => Some(PrimitiveTypeKind::DateTime),
        }
    }

    /// Check if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get as bool if this is a Bool value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i64 if this is an integer value (either width)
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(i) => Some(i64::from(*i)),
            Value::Int64(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f64 if this is a Double value
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(f) => Some(*f),
            _ => None,
        }
    }

    /// Get as &str if this is a String value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as bytes if this is a Binary value
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(b) => Some(b),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int32(i)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int64(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Double(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Binary(b)
    }
}

impl From<Uuid> for Value {
    fn from(id: Uuid) -> Self {
        Value::Guid(id)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(ts: DateTime<Utc>) -> Self {
        Value::DateTime(ts)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}
