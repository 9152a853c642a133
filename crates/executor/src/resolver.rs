//! Parameter type resolution
//!
//! Before a command is compiled (or looked up in the plan cache) every
//! parameter must have a name, an acceptable direction and a type. The
//! resolver walks the collection in order and produces the ordered list of
//! `(name, type, direction)` shapes used both as the formal parameters of
//! the command tree and as part of the cache key.

use rustc_hash::FxHashSet;
use tracing::trace;

use quarry_core::{CommandType, Error, ParameterCollection, ParameterDirection, Result, TypeUsage};

/// Resolved shape of one parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedParameter {
    /// Parameter name
    pub name: String,
    /// Resolved type
    pub type_usage: TypeUsage,
    /// Parameter direction
    pub direction: ParameterDirection,
}

/// Resolved parameter shapes, in collection order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedParameters(Vec<ResolvedParameter>);

impl ResolvedParameters {
    /// Iterate in collection order
    pub fn iter(&self) -> std::slice::Iter<'_, ResolvedParameter> {
        self.0.iter()
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no parameters
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Look up a parameter's type by name
    pub fn type_of(&self, name: &str) -> Option<&TypeUsage> {
        self.0.iter().find(|p| p.name == name).map(|p| &p.type_usage)
    }

    /// `(name, type)` pairs for a command tree
    pub fn tree_parameters(&self) -> Vec<(String, TypeUsage)> {
        self.0
            .iter()
            .map(|p| (p.name.clone(), p.type_usage.clone()))
            .collect()
    }

    /// `(name, type, direction)` triples for a cache key
    pub fn key_parameters(&self) -> impl Iterator<Item = (String, TypeUsage, ParameterDirection)> + '_ {
        self.0
            .iter()
            .map(|p| (p.name.clone(), p.type_usage.clone(), p.direction))
    }
}

impl<'a> IntoIterator for &'a ResolvedParameters {
    type Item = &'a ResolvedParameter;
    type IntoIter = std::slice::Iter<'a, ResolvedParameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Resolve the type of every parameter
///
/// Checks, per parameter and in order:
/// 1. the name is not empty
/// 2. text commands only take `Input` parameters
/// 3. a type can be determined (declared type, declared kind or non-null value)
/// 4. the name was not already seen
///
/// # Errors
///
/// `EmptyParameterName`, `InvalidParameterDirection`, `UnknownParameterType`
/// or `DuplicateParameterName`; no partial result is returned.
pub fn resolve_parameter_types(
    parameters: &ParameterCollection,
    command_type: CommandType,
) -> Result<ResolvedParameters> {
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let mut resolved = Vec::with_capacity(parameters.len());

    for parameter in parameters.iter() {
        let name = parameter.name();
        if name.is_empty() {
            return Err(Error::EmptyParameterName);
        }

        if command_type == CommandType::Text && parameter.direction() != ParameterDirection::Input {
            return Err(Error::InvalidParameterDirection {
                name: name.to_string(),
            });
        }

        let type_usage = parameter
            .type_usage()
            .ok_or_else(|| Error::UnknownParameterType {
                name: name.to_string(),
            })?;

        if !seen.insert(name) {
            return Err(Error::DuplicateParameterName {
                name: name.to_string(),
            });
        }

        trace!(target: "quarry::resolver", name, %type_usage, "resolved parameter type");
        resolved.push(ResolvedParameter {
            name: name.to_string(),
            type_usage,
            direction: parameter.direction(),
        });
    }

    Ok(ResolvedParameters(resolved))
}
