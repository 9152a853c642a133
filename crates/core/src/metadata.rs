//! Model metadata contract
//!
//! The metadata/type system is an external collaborator. Commands only need
//! a narrow slice of it:
//! - resolve a function import by container and name
//! - decide whether two workspaces share the same conceptual-to-store mapping
//! - make sure store metadata is loaded when a connection opens
//!
//! [`InMemoryWorkspace`] is a complete in-memory implementation used by the
//! test suites and by embedders that assemble metadata in code.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::{ParameterDirection, TypeUsage};

/// Metadata workspace consumed by commands and connections
///
/// Thread safety: workspaces are shared between connections, commands and
/// trees (requires Send + Sync).
pub trait MetadataWorkspace: fmt::Debug + Send + Sync {
    /// Identity of the conceptual-to-store mapping loaded in this workspace
    ///
    /// Two workspaces with the same fingerprint compile identical trees to
    /// identical store commands.
    fn mapping_fingerprint(&self) -> u64;

    /// Resolve `container.name`; `None` when either part is unknown
    fn resolve_function_import(&self, container: &str, name: &str) -> Option<FunctionImport>;

    /// Whether trees built against `self` may run on a connection using `other`
    fn is_cspace_compatible(&self, other: &dyn MetadataWorkspace) -> bool {
        self.mapping_fingerprint() == other.mapping_fingerprint()
    }

    /// Load (or verify) store-space metadata
    ///
    /// # Errors
    ///
    /// Returns `StoreMetadataUnavailable` when store metadata cannot be loaded.
    fn ensure_store_metadata(&self) -> Result<()> {
        Ok(())
    }
}

/// Formal parameter of a function import
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionParameter {
    /// Parameter name
    pub name: String,
    /// Parameter type
    pub type_usage: TypeUsage,
    /// Parameter mode
    pub mode: ParameterDirection,
}

/// A function import declared in an entity container
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionImport {
    /// Owning container
    pub container: String,
    /// Import name
    pub name: String,
    /// Declared formal parameters
    pub parameters: Vec<FunctionParameter>,
    /// Result element type, if the import returns rows
    pub return_type: Option<TypeUsage>,
}

impl FunctionImport {
    /// Create a function import with no parameters and no result
    pub fn new(container: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            name: name.into(),
            parameters: Vec::new(),
            return_type: None,
        }
    }

    /// Builder: add a formal parameter
    pub fn with_parameter(
        mut self,
        name: impl Into<String>,
        type_usage: TypeUsage,
        mode: ParameterDirection,
    ) -> Self {
        self.parameters.push(FunctionParameter {
            name: name.into(),
            type_usage,
            mode,
        });
        self
    }

    /// Builder: set the result type
    pub fn with_return_type(mut self, type_usage: TypeUsage) -> Self {
        self.return_type = Some(type_usage);
        self
    }

    /// `container.name`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.container, self.name)
    }
}

/// In-memory metadata workspace
///
/// Containers and function imports are matched case-sensitively.
#[derive(Debug, Clone)]
pub struct InMemoryWorkspace {
    fingerprint: u64,
    containers: BTreeMap<String, BTreeMap<String, FunctionImport>>,
    store_metadata_error: Option<String>,
}

impl InMemoryWorkspace {
    /// Start building a workspace with the given mapping fingerprint
    pub fn builder(fingerprint: u64) -> InMemoryWorkspaceBuilder {
        InMemoryWorkspaceBuilder {
            workspace: InMemoryWorkspace {
                fingerprint,
                containers: BTreeMap::new(),
                store_metadata_error: None,
            },
        }
    }

    /// Empty workspace with the given fingerprint
    pub fn empty(fingerprint: u64) -> Arc<Self> {
        Self::builder(fingerprint).build()
    }

    /// Names of the declared containers
    pub fn container_names(&self) -> impl Iterator<Item = &str> {
        self.containers.keys().map(String::as_str)
    }
}

impl MetadataWorkspace for InMemoryWorkspace {
    fn mapping_fingerprint(&self) -> u64 {
        self.fingerprint
    }

    fn resolve_function_import(&self, container: &str, name: &str) -> Option<FunctionImport> {
        self.containers.get(container)?.get(name).cloned()
    }

    fn ensure_store_metadata(&self) -> Result<()> {
        match &self.store_metadata_error {
            Some(reason) => Err(Error::StoreMetadataUnavailable {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// Builder for [`InMemoryWorkspace`]
#[derive(Debug)]
pub struct InMemoryWorkspaceBuilder {
    workspace: InMemoryWorkspace,
}

impl InMemoryWorkspaceBuilder {
    /// Declare an (empty) container
    pub fn container(mut self, name: impl Into<String>) -> Self {
        self.workspace.containers.entry(name.into()).or_default();
        self
    }

    /// Declare a function import (its container is created if missing)
    pub fn function_import(mut self, function: FunctionImport) -> Self {
        self.workspace
            .containers
            .entry(function.container.clone())
            .or_default()
            .insert(function.name.clone(), function);
        self
    }

    /// Make `ensure_store_metadata` fail with `reason`
    pub fn fail_store_metadata(mut self, reason: impl Into<String>) -> Self {
        self.workspace.store_metadata_error = Some(reason.into());
        self
    }

    /// Finish
    pub fn build(self) -> Arc<InMemoryWorkspace> {
        Arc::new(self.workspace)
    }
}
