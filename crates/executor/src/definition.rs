//! Compiled command definitions
//!
//! A [`CommandDefinition`] is the provider-bound, immutable result of
//! compiling a logical tree. Definitions are shared through `Arc` between
//! the plan cache and any number of commands.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use quarry_core::{
    CommandBehavior, CommandTree, Error, Parameter, ParameterCollection, ParameterDirection,
    ProviderCommand, ProviderFactory, ProviderReader, Result, StoreParameter, StoreStatement,
    TransactionId, Value,
};

use crate::command::Command;
use crate::connection::Connection;

/// Immutable compiled form of a command
pub struct CommandDefinition {
    tree: Arc<CommandTree>,
    statement: StoreStatement,
    provider: Arc<dyn ProviderFactory>,
}

/// Execution inputs taken from the command being run
pub(crate) struct ExecutionRequest<'a> {
    pub parameters: &'a ParameterCollection,
    pub timeout: Option<u32>,
    pub transaction: Option<TransactionId>,
    pub behavior: CommandBehavior,
}

impl CommandDefinition {
    /// Compile `tree` for the provider of `connection`
    ///
    /// # Errors
    ///
    /// - `MetadataIncompatible` when the tree was built against a workspace
    ///   with a different mapping (checked before the provider is called)
    /// - `ConnectionStringNeeded` when the connection has no provider
    /// - the provider's compile error, unchanged
    pub fn compile(tree: Arc<CommandTree>, connection: &Connection) -> Result<Self> {
        if !tree
            .workspace()
            .is_cspace_compatible(connection.workspace().as_ref())
        {
            return Err(Error::MetadataIncompatible);
        }

        let provider = Arc::clone(connection.provider().ok_or(Error::ConnectionStringNeeded)?);
        let statement = provider.create_command_definition(&tree)?;
        debug!(
            target: "quarry::definition",
            provider = provider.name(),
            text = %statement.command_text,
            "compiled command definition"
        );

        Ok(Self {
            tree,
            statement,
            provider,
        })
    }

    /// Logical tree
    pub fn tree(&self) -> &Arc<CommandTree> {
        &self.tree
    }

    /// Provider-compiled statement
    pub fn store_statement(&self) -> &StoreStatement {
        &self.statement
    }

    /// Provider factory the definition is bound to
    pub fn provider(&self) -> &Arc<dyn ProviderFactory> {
        &self.provider
    }

    /// Fresh input parameters, one per tree parameter, typed from the tree
    pub fn parameters(&self) -> Vec<Parameter> {
        self.tree
            .parameters()
            .iter()
            .map(|(name, type_usage)| Parameter::from_type_usage(name.clone(), type_usage.clone()))
            .collect()
    }

    /// New command bound to this definition
    pub fn create_command(self: &Arc<Self>) -> Command {
        Command::from_definition(Arc::clone(self), None)
    }

    /// Store command text
    pub fn to_trace_string(&self) -> &str {
        &self.statement.command_text
    }

    /// Create, configure and run a provider command
    ///
    /// Store parameters follow the statement's order; each takes the
    /// direction and value of the logical parameter with the same name.
    pub(crate) fn execute(
        &self,
        request: ExecutionRequest<'_>,
    ) -> Result<(Box<dyn ProviderCommand>, Box<dyn ProviderReader>)> {
        let mut store_command = self.provider.create_command();
        store_command.set_command_text(&self.statement.command_text);
        if let Some(timeout) = request.timeout {
            store_command.set_command_timeout(timeout);
        }
        store_command.set_transaction(request.transaction);

        let bound = store_command.parameters_mut();
        bound.clear();
        for spec in &self.statement.parameters {
            let (direction, value) = match request.parameters.get(&spec.name) {
                Some(p) => (p.direction(), p.value().clone()),
                None => (ParameterDirection::Input, Value::Null),
            };
            bound.push(StoreParameter {
                name: spec.name.clone(),
                direction,
                type_usage: Some(spec.type_usage.clone()),
                value,
            });
        }

        let reader = store_command.execute_reader(request.behavior)?;
        Ok((store_command, reader))
    }
}

impl fmt::Debug for CommandDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDefinition")
            .field("provider", &self.provider.name())
            .field("text", &self.statement.command_text)
            .field("parameters", &self.statement.parameters.len())
            .finish()
    }
}
