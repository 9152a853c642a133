//! Logical command trees
//!
//! A [`CommandTree`] is the resolved, store-agnostic form of a query or a
//! function invocation. Trees are produced by a [`QueryCompiler`] (for query
//! text), built directly for function imports, or supplied by the caller.
//! Providers compile trees to store commands.
//!
//! Trees are immutable and shared through `Arc`.
//!
//! [`QueryCompiler`]: crate::traits::QueryCompiler

use std::fmt;
use std::sync::Arc;

use crate::metadata::{FunctionImport, MetadataWorkspace};
use crate::types::TypeUsage;

/// Body of a command tree
#[derive(Debug, Clone, PartialEq)]
pub enum TreeKind {
    /// Compiled query expression (canonical text form)
    Query {
        /// Canonical expression
        expression: String,
    },
    /// Invocation of a function import
    Function {
        /// Target function import
        function: FunctionImport,
    },
}

/// Store-agnostic logical command
pub struct CommandTree {
    workspace: Arc<dyn MetadataWorkspace>,
    parameters: Vec<(String, TypeUsage)>,
    kind: TreeKind,
}

impl CommandTree {
    /// Query tree over `workspace`
    pub fn query(
        workspace: Arc<dyn MetadataWorkspace>,
        expression: impl Into<String>,
        parameters: Vec<(String, TypeUsage)>,
    ) -> Self {
        Self {
            workspace,
            parameters,
            kind: TreeKind::Query {
                expression: expression.into(),
            },
        }
    }

    /// Function-invocation tree; `parameters` become the formal arguments
    pub fn function(
        workspace: Arc<dyn MetadataWorkspace>,
        function: FunctionImport,
        parameters: Vec<(String, TypeUsage)>,
    ) -> Self {
        Self {
            workspace,
            parameters,
            kind: TreeKind::Function { function },
        }
    }

    /// Workspace the tree was built against
    pub fn workspace(&self) -> &Arc<dyn MetadataWorkspace> {
        &self.workspace
    }

    /// Declared parameters, in order
    pub fn parameters(&self) -> &[(String, TypeUsage)] {
        &self.parameters
    }

    /// Tree body
    pub fn kind(&self) -> &TreeKind {
        &self.kind
    }

    /// Whether this is a function-invocation tree
    pub fn is_function(&self) -> bool {
        matches!(self.kind, TreeKind::Function { .. })
    }
}

impl fmt::Debug for CommandTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandTree")
            .field("mapping", &self.workspace.mapping_fingerprint())
            .field("parameters", &self.parameters)
            .field("kind", &self.kind)
            .finish()
    }
}

/// View of a workspace used to resolve names while compiling query text
#[derive(Debug, Clone)]
pub struct Perspective {
    workspace: Arc<dyn MetadataWorkspace>,
}

impl Perspective {
    /// Model perspective over the whole workspace
    pub fn model(workspace: Arc<dyn MetadataWorkspace>) -> Self {
        Self { workspace }
    }

    /// Underlying workspace
    pub fn workspace(&self) -> &Arc<dyn MetadataWorkspace> {
        &self.workspace
    }
}

/// Options forwarded to the query compiler (`None` means compiler defaults)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParserOptions {
    /// Resolve identifiers case-sensitively
    pub case_sensitive: bool,
}
