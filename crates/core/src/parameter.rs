//! Named command parameters
//!
//! A [`Parameter`] carries a name, a direction, an optional declared type and
//! a value. The compiled shape of a command depends on parameter names,
//! directions and types, so parameters track a dirty flag that is raised
//! whenever one of those changes. Value changes only raise it when the
//! parameter's type is inferred from its value and the inferred kind changes.
//!
//! [`ParameterCollection`] keeps parameters in insertion order and raises its
//! own dirty flag on structural changes (add, remove, clear).

use crate::types::{DbType, ParameterDirection, TypeUsage};
use crate::value::Value;

/// A named command parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: String,
    direction: ParameterDirection,
    db_type: DbType,
    declared_type: Option<TypeUsage>,
    size: Option<u32>,
    value: Value,
    dirty: bool,
}

impl Parameter {
    /// Create an input parameter whose type is inferred from `value`
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            direction: ParameterDirection::Input,
            db_type: DbType::Object,
            declared_type: None,
            size: None,
            value: value.into(),
            dirty: false,
        }
    }

    /// Create an input parameter with a declared provider kind and no value
    pub fn typed(name: impl Into<String>, db_type: DbType) -> Self {
        Self {
            db_type,
            ..Self::new(name, Value::Null)
        }
    }

    /// Create a parameter from an explicit type usage (used for definition parameters)
    pub fn from_type_usage(name: impl Into<String>, type_usage: TypeUsage) -> Self {
        Self {
            declared_type: Some(type_usage),
            ..Self::new(name, Value::Null)
        }
    }

    /// Builder: set direction
    pub fn with_direction(mut self, direction: ParameterDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Builder: set declared type usage
    pub fn with_declared_type(mut self, type_usage: TypeUsage) -> Self {
        self.declared_type = Some(type_usage);
        self
    }

    /// Builder: set size facet
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    /// Builder: set value
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = value.into();
        self
    }

    /// Parameter name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter direction
    pub fn direction(&self) -> ParameterDirection {
        self.direction
    }

    /// Declared provider kind
    pub fn db_type(&self) -> DbType {
        self.db_type
    }

    /// Explicit type usage, if one was declared
    pub fn declared_type(&self) -> Option<&TypeUsage> {
        self.declared_type.as_ref()
    }

    /// Size facet
    pub fn size(&self) -> Option<u32> {
        self.size
    }

    /// Current value
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Whether a shape-affecting property changed since the last reset
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Rename the parameter
    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        if self.name != name {
            self.name = name;
            self.dirty = true;
        }
    }

    /// Change the direction
    pub fn set_direction(&mut self, direction: ParameterDirection) {
        if self.direction != direction {
            self.direction = direction;
            self.dirty = true;
        }
    }

    /// Change the declared provider kind
    pub fn set_db_type(&mut self, db_type: DbType) {
        if self.db_type != db_type {
            self.db_type = db_type;
            self.dirty = true;
        }
    }

    /// Change the declared type usage
    pub fn set_declared_type(&mut self, type_usage: Option<TypeUsage>) {
        if self.declared_type != type_usage {
            self.declared_type = type_usage;
            self.dirty = true;
        }
    }

    /// Change the size facet
    pub fn set_size(&mut self, size: Option<u32>) {
        if self.size != size {
            self.size = size;
            self.dirty = true;
        }
    }

    /// Change the value
    ///
    /// Marks the parameter dirty only if its type is inferred from the value
    /// and the inferred kind changes.
    pub fn set_value(&mut self, value: impl Into<Value>) {
        let value = value.into();
        if self.infers_from_value() && value.primitive_kind() != self.value.primitive_kind() {
            self.dirty = true;
        }
        self.value = value;
    }

    /// Store a value produced by the store (output parameters); never marks dirty
    pub fn set_value_from_store(&mut self, value: Value) {
        self.value = value;
    }

    /// Clear the dirty flag
    pub fn reset_dirty(&mut self) {
        self.dirty = false;
    }

    /// Resolve the parameter's type usage
    ///
    /// Order: declared type usage, then the declared provider kind, then the
    /// value's kind. Returns `None` when none of these yields a type.
    pub fn type_usage(&self) -> Option<TypeUsage> {
        if let Some(declared) = &self.declared_type {
            return Some(declared.clone());
        }
        let kind = self
            .db_type
            .primitive_kind()
            .or_else(|| self.value.primitive_kind())?;
        let usage = TypeUsage::primitive(kind);
        Some(match self.size {
            Some(size) => usage.with_max_length(size),
            None => usage,
        })
    }

    fn infers_from_value(&self) -> bool {
        self.declared_type.is_none() && self.db_type == DbType::Object
    }
}

/// Ordered collection of parameters with dirty tracking
///
/// Names are not required to be unique here; uniqueness is enforced when
/// parameter types are resolved for compilation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterCollection {
    items: Vec<Parameter>,
    dirty: bool,
}

impl ParameterCollection {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter
    pub fn add(&mut self, parameter: Parameter) {
        self.items.push(parameter);
        self.dirty = true;
    }

    /// Remove the first parameter with `name`
    pub fn remove(&mut self, name: &str) -> Option<Parameter> {
        let idx = self.items.iter().position(|p| p.name == name)?;
        self.dirty = true;
        Some(self.items.remove(idx))
    }

    /// Remove all parameters
    pub fn clear(&mut self) {
        if !self.items.is_empty() {
            self.items.clear();
            self.dirty = true;
        }
    }

    /// First parameter with `name`
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.items.iter().find(|p| p.name == name)
    }

    /// Mutable access to the first parameter with `name`
    ///
    /// Shape-affecting changes made through the returned reference mark the
    /// parameter dirty.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.items.iter_mut().find(|p| p.name == name)
    }

    /// Set the value of the first parameter with `name`; returns false if absent
    pub fn set_value(&mut self, name: &str, value: impl Into<Value>) -> bool {
        match self.get_mut(name) {
            Some(p) => {
                p.set_value(value);
                true
            }
            None => false,
        }
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, Parameter> {
        self.items.iter()
    }

    /// Iterate mutably in insertion order
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Parameter> {
        self.items.iter_mut()
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the collection is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether the collection or any parameter changed shape since the last reset
    pub fn is_dirty(&self) -> bool {
        self.dirty || self.items.iter().any(Parameter::is_dirty)
    }

    /// Clear the dirty flags of the collection and every parameter
    pub fn reset_dirty(&mut self) {
        self.dirty = false;
        for p in &mut self.items {
            p.reset_dirty();
        }
    }
}

impl<'a> IntoIterator for &'a ParameterCollection {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl FromIterator<Parameter> for ParameterCollection {
    fn from_iter<I: IntoIterator<Item = Parameter>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
            dirty: true,
        }
    }
}
