//! Propagator results
//!
//! A [`PropagatorResult`] is a node of the value tree extracted from a
//! tracked change. Leaves carry a value; server-generated leaves also carry
//! the record and ordinal the store-produced value must be written back to.
//! Structural nodes carry one child per member of their type.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::sync::Arc;

use quarry_core::{Error, Result, Value};

/// Flags describing how a propagated value participates in an update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PropagatorFlags(u8);

impl PropagatorFlags {
    /// No flags
    pub const NONE: PropagatorFlags = PropagatorFlags(0);
    /// Value is preserved rather than overwritten
    pub const PRESERVE: PropagatorFlags = PropagatorFlags(1);
    /// Value takes part in optimistic concurrency checks
    pub const CONCURRENCY_VALUE: PropagatorFlags = PropagatorFlags(1 << 1);
    /// Value is not known until the store produces it
    pub const UNKNOWN: PropagatorFlags = PropagatorFlags(1 << 2);
    /// Value is part of the entity key
    pub const KEY: PropagatorFlags = PropagatorFlags(1 << 3);
    /// Value is part of a foreign key
    pub const FOREIGN_KEY: PropagatorFlags = PropagatorFlags(1 << 4);

    /// Whether all flags of `other` are set
    pub fn contains(&self, other: PropagatorFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether no flag is set
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl BitOr for PropagatorFlags {
    type Output = PropagatorFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        PropagatorFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for PropagatorFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Record of current values in the change-tracking graph
///
/// Implementations use interior mutability; the record is shared between the
/// change tracker and every propagator result that points into it.
pub trait CurrentValueRecord: fmt::Debug + Send + Sync {
    /// Overwrite the value at `ordinal`
    fn set_value(&self, ordinal: usize, value: Value) -> Result<()>;
}

/// Entity or complex type whose members a structural result mirrors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralType {
    name: String,
    members: Vec<String>,
}

impl StructuralType {
    /// Type `name` declaring `members` in order
    pub fn new(
        name: impl Into<String>,
        members: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            members: members.into_iter().map(Into::into).collect(),
        }
    }

    /// Type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared members, in order
    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Position of member `name`
    pub fn ordinal_of(&self, name: &str) -> Option<usize> {
        self.members.iter().position(|m| m == name)
    }
}

/// Node of a propagated value tree
#[derive(Debug, Clone)]
pub enum PropagatorResult {
    /// Plain value
    Simple {
        /// Flags
        flags: PropagatorFlags,
        /// Value
        value: Value,
    },
    /// Value the store may regenerate, with the record it maps back to
    ServerGenSimple {
        /// Flags
        flags: PropagatorFlags,
        /// Value known before the update
        value: Value,
        /// Record receiving the store-produced value
        record: Arc<dyn CurrentValueRecord>,
        /// Position of the member inside `record`
        ordinal: usize,
    },
    /// One child per member of `structural_type`
    Structural {
        /// Children, in member order
        values: Vec<Arc<PropagatorResult>>,
        /// Type whose members the children mirror
        structural_type: Arc<StructuralType>,
        /// Whether any member was modified
        is_modified: bool,
    },
}

impl PropagatorResult {
    /// Plain leaf
    pub fn simple(flags: PropagatorFlags, value: impl Into<Value>) -> Arc<Self> {
        Arc::new(PropagatorResult::Simple {
            flags,
            value: value.into(),
        })
    }

    /// Server-generated leaf mapping back to `record` at `ordinal`
    pub fn server_gen_simple(
        flags: PropagatorFlags,
        value: impl Into<Value>,
        record: Arc<dyn CurrentValueRecord>,
        ordinal: usize,
    ) -> Arc<Self> {
        Arc::new(PropagatorResult::ServerGenSimple {
            flags,
            value: value.into(),
            record,
            ordinal,
        })
    }

    /// Structural node
    ///
    /// # Errors
    ///
    /// `StructuralMismatch` when the number of children differs from the
    /// number of members `structural_type` declares.
    pub fn structural(
        values: Vec<Arc<PropagatorResult>>,
        structural_type: Arc<StructuralType>,
        is_modified: bool,
    ) -> Result<Arc<Self>> {
        let expected = structural_type.members().len();
        if values.len() != expected {
            return Err(Error::StructuralMismatch {
                expected,
                actual: values.len(),
            });
        }
        Ok(Arc::new(PropagatorResult::Structural {
            values,
            structural_type,
            is_modified,
        }))
    }

    /// Whether this is a leaf
    pub fn is_simple(&self) -> bool {
        !matches!(self, PropagatorResult::Structural { .. })
    }

    /// Flags of a leaf; structural nodes carry none
    pub fn flags(&self) -> PropagatorFlags {
        match self {
            PropagatorResult::Simple { flags, .. }
            | PropagatorResult::ServerGenSimple { flags, .. } => *flags,
            PropagatorResult::Structural { .. } => PropagatorFlags::NONE,
        }
    }

    /// Value of a leaf
    pub fn value(&self) -> Option<&Value> {
        match self {
            PropagatorResult::Simple { value, .. }
            | PropagatorResult::ServerGenSimple { value, .. } => Some(value),
            PropagatorResult::Structural { .. } => None,
        }
    }

    /// Child for member `name` of a structural node
    pub fn member(&self, name: &str) -> Option<&Arc<PropagatorResult>> {
        match self {
            PropagatorResult::Structural {
                values,
                structural_type,
                ..
            } => structural_type.ordinal_of(name).and_then(|i| values.get(i)),
            _ => None,
        }
    }

    /// Whether the node (or, for structural nodes, any member) was modified
    pub fn is_modified(&self) -> bool {
        match self {
            PropagatorResult::Structural { is_modified, .. } => *is_modified,
            _ => false,
        }
    }
}
