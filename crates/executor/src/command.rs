//! Commands
//!
//! A [`Command`] holds a statement (query text, a command tree, or a
//! function-import reference), its parameters and its execution settings,
//! and drives the prepare / execute / reader lifecycle:
//!
//! ```text
//! Idle --prepare--> Prepared --execute_reader--> ReaderOpen --reader closed--> Prepared
//!   ^                  |
//!   +---- mutation ----+
//! ```
//!
//! While a reader is open every mutator fails with `ReaderStillOpen`. Any
//! other mutation of the statement, command type, connection or parameter
//! shape discards the prepared definition.
//!
//! # Usage
//!
//! ```ignore
//! use quarry_executor::{Command, Parameter};
//!
//! let cmd = Command::with_connection("SELECT VALUE c FROM Customers AS c WHERE c.Id = @id", conn);
//! cmd.add_parameter(Parameter::new("id", 42i32))?;
//! let mut reader = cmd.execute_reader(CommandBehavior::DEFAULT)?;
//! while reader.read()? {
//!     let name = reader.get_value(1)?;
//! }
//! reader.close()?;
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use quarry_cache::CacheKey;
use quarry_core::{
    CommandBehavior, CommandTree, CommandType, ConnectionState, Error, Parameter,
    ParameterCollection, ProviderCommand, Result, TransactionId, UpdateRowSource, Value,
};

use crate::connection::Connection;
use crate::definition::{CommandDefinition, ExecutionRequest};
use crate::reader::DataReader;
use crate::resolver::resolve_parameter_types;
use crate::tree_builder::build_command_tree;

/// Callback run once each time a reader of the command closes
///
/// It runs after the command is unlocked, so it may mutate the command.
pub type ReaderClosingObserver = Arc<dyn Fn(&Command) -> Result<()> + Send + Sync>;

/// What the command executes
#[derive(Debug, Clone, Default)]
pub(crate) enum Statement {
    #[default]
    None,
    Text(String),
    Tree(Arc<CommandTree>),
}

pub(crate) enum Lifecycle {
    Idle,
    Prepared(Arc<CommandDefinition>),
    ReaderOpen {
        definition: Arc<CommandDefinition>,
        store_command: Option<Box<dyn ProviderCommand>>,
    },
}

impl Lifecycle {
    fn definition(&self) -> Option<&Arc<CommandDefinition>> {
        match self {
            Lifecycle::Idle => None,
            Lifecycle::Prepared(definition) => Some(definition),
            Lifecycle::ReaderOpen { definition, .. } => Some(definition),
        }
    }
}

pub(crate) struct CommandState {
    statement: Statement,
    command_type: CommandType,
    parameters: ParameterCollection,
    connection: Option<Arc<Connection>>,
    transaction: Option<TransactionId>,
    timeout: Option<u32>,
    enable_plan_caching: Option<bool>,
    updated_row_source: UpdateRowSource,
    definition_based: bool,
    prepared_tree: Option<Arc<CommandTree>>,
    lifecycle: Lifecycle,
    reader_closing: Option<ReaderClosingObserver>,
}

impl Default for CommandState {
    fn default() -> Self {
        Self {
            statement: Statement::None,
            command_type: CommandType::Text,
            parameters: ParameterCollection::new(),
            connection: None,
            transaction: None,
            timeout: None,
            enable_plan_caching: None,
            updated_row_source: UpdateRowSource::default(),
            definition_based: false,
            prepared_tree: None,
            lifecycle: Lifecycle::Idle,
            reader_closing: None,
        }
    }
}

impl CommandState {
    fn ensure_mutable(&self) -> Result<()> {
        match self.lifecycle {
            Lifecycle::ReaderOpen { .. } => Err(Error::ReaderStillOpen),
            _ => Ok(()),
        }
    }

    fn unprepare(&mut self) {
        self.prepared_tree = None;
        self.lifecycle = Lifecycle::Idle;
        self.parameters.reset_dirty();
    }

    fn plan_caching_enabled(&self) -> bool {
        self.enable_plan_caching.unwrap_or_else(|| {
            self.connection
                .as_ref()
                .map_or(true, |c| c.config().command.enable_plan_caching)
        })
    }

    fn effective_timeout(&self) -> Option<u32> {
        self.timeout.or_else(|| {
            self.connection
                .as_ref()
                .and_then(|c| c.config().command.default_timeout_secs)
        })
    }

    fn check_ready(&self) -> Result<Arc<Connection>> {
        let connection = self.connection.clone().ok_or(Error::NoConnection)?;
        connection.physical()?;
        match connection.state() {
            state @ (ConnectionState::Closed | ConnectionState::Broken) => {
                Err(Error::ConnectionNotOpen { state })
            }
            _ => Ok(connection),
        }
    }

    fn inner_prepare(&mut self, connection: &Arc<Connection>) -> Result<Arc<CommandDefinition>> {
        if self.parameters.is_dirty() {
            self.unprepare();
        }
        if let Some(definition) = self.lifecycle.definition() {
            return Ok(Arc::clone(definition));
        }

        let definition = self.definition_for(connection)?;
        self.lifecycle = Lifecycle::Prepared(Arc::clone(&definition));
        Ok(definition)
    }

    fn definition_for(&mut self, connection: &Arc<Connection>) -> Result<Arc<CommandDefinition>> {
        let cacheable = self.plan_caching_enabled() && self.command_type == CommandType::Text;
        let text = match &self.statement {
            Statement::Text(text) if cacheable => Some(text.clone()),
            _ => None,
        };

        let Some(text) = text else {
            return Ok(Arc::new(self.compile(connection)?));
        };

        let resolved = resolve_parameter_types(&self.parameters, self.command_type)?;
        let provider = connection.provider().ok_or(Error::ConnectionStringNeeded)?;
        let key = CacheKey::new(
            self.command_type,
            text,
            resolved.key_parameters(),
            connection.workspace().mapping_fingerprint(),
            provider.name(),
        );

        let cache = connection.plan_cache();
        if let Some(definition) = cache.try_lookup(&key) {
            return Ok(definition);
        }
        let compiled = Arc::new(self.compile(connection)?);
        Ok(cache.try_lookup_and_add(key, compiled))
    }

    fn compile(&mut self, connection: &Connection) -> Result<CommandDefinition> {
        let tree = match &self.prepared_tree {
            Some(tree) => Arc::clone(tree),
            None => {
                let tree = build_command_tree(
                    &self.statement,
                    self.command_type,
                    &self.parameters,
                    self.definition_based,
                    connection,
                )?;
                self.prepared_tree = Some(Arc::clone(&tree));
                tree
            }
        };
        CommandDefinition::compile(tree, connection)
    }

    /// Leave `ReaderOpen`, copying store-produced parameter values back
    pub(crate) fn release_reader(&mut self) {
        let lifecycle = std::mem::replace(&mut self.lifecycle, Lifecycle::Idle);
        self.lifecycle = match lifecycle {
            Lifecycle::ReaderOpen {
                definition,
                store_command,
            } => {
                if let Some(store_command) = store_command {
                    for stored in store_command.parameters() {
                        if !stored.direction.receives_store_value() {
                            continue;
                        }
                        if let Some(p) = self.parameters.get_mut(&stored.name) {
                            p.set_value_from_store(stored.value.clone());
                        }
                    }
                }
                Lifecycle::Prepared(definition)
            }
            other => other,
        };
    }

    pub(crate) fn reader_closing_observer(&self) -> Option<ReaderClosingObserver> {
        self.reader_closing.clone()
    }

    pub(crate) fn connection(&self) -> Option<Arc<Connection>> {
        self.connection.clone()
    }
}

/// A statement to prepare and execute against a [`Connection`]
///
/// Commands are `Send + Sync`, but one command is not meant to be mutated
/// from several threads at once.
pub struct Command {
    inner: Arc<Mutex<CommandState>>,
}

impl Command {
    /// Empty text command
    pub fn new() -> Self {
        Self::from_state(CommandState::default())
    }

    /// Text command with `text`
    pub fn with_text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::from_state(CommandState {
            statement: text_statement(text),
            ..CommandState::default()
        })
    }

    /// Text command with `text` attached to `connection`
    pub fn with_connection(text: impl Into<String>, connection: Arc<Connection>) -> Self {
        Self::from_state(CommandState {
            statement: text_statement(text.into()),
            connection: Some(connection),
            ..CommandState::default()
        })
    }

    /// Text command with `text`, attached to `connection` and enlisted in `transaction`
    pub fn with_transaction(
        text: impl Into<String>,
        connection: Arc<Connection>,
        transaction: TransactionId,
    ) -> Self {
        Self::from_state(CommandState {
            statement: text_statement(text.into()),
            connection: Some(connection),
            transaction: Some(transaction),
            ..CommandState::default()
        })
    }

    /// Command bound to a compiled definition
    ///
    /// Parameters are copied from the definition with clean dirty flags, so
    /// the command executes without recompiling until its parameter shape
    /// changes.
    pub fn from_definition(
        definition: Arc<CommandDefinition>,
        connection: Option<Arc<Connection>>,
    ) -> Self {
        let mut parameters: ParameterCollection = definition.parameters().into_iter().collect();
        parameters.reset_dirty();
        Self::from_state(CommandState {
            parameters,
            connection,
            definition_based: true,
            lifecycle: Lifecycle::Prepared(definition),
            ..CommandState::default()
        })
    }

    fn from_state(state: CommandState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    pub(crate) fn from_shared(inner: Arc<Mutex<CommandState>>) -> Self {
        Self { inner }
    }

    fn update<T>(&self, f: impl FnOnce(&mut CommandState) -> Result<T>) -> Result<T> {
        let mut state = self.inner.lock();
        state.ensure_mutable()?;
        f(&mut state)
    }

    // =========================================================================
    // Statement
    // =========================================================================

    /// Command text (`""` when unset)
    ///
    /// # Errors
    ///
    /// `CannotGetCommandText` when a command tree was set.
    pub fn text(&self) -> Result<String> {
        match &self.inner.lock().statement {
            Statement::Tree(_) => Err(Error::CannotGetCommandText),
            Statement::Text(text) => Ok(text.clone()),
            Statement::None => Ok(String::new()),
        }
    }

    /// Set the command text
    ///
    /// # Errors
    ///
    /// `ReaderStillOpen`, or `CannotSetCommandText` when a tree was set.
    pub fn set_text(&self, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        self.update(|s| {
            match &s.statement {
                Statement::Tree(_) => return Err(Error::CannotSetCommandText),
                Statement::Text(current) if *current == text => return Ok(()),
                Statement::None if text.is_empty() => return Ok(()),
                _ => {}
            }
            s.statement = text_statement(text);
            s.definition_based = false;
            s.unprepare();
            Ok(())
        })
    }

    /// Command tree, if one was set
    ///
    /// # Errors
    ///
    /// `CannotGetCommandTree` when command text was set.
    pub fn tree(&self) -> Result<Option<Arc<CommandTree>>> {
        match &self.inner.lock().statement {
            Statement::Text(_) => Err(Error::CannotGetCommandTree),
            Statement::Tree(tree) => Ok(Some(Arc::clone(tree))),
            Statement::None => Ok(None),
        }
    }

    /// Set (or clear) the command tree
    ///
    /// # Errors
    ///
    /// `ReaderStillOpen`, `CannotSetCommandTree` when text was set, or
    /// `TreeOnStoredProcedureCommand` when the command type is not Text.
    pub fn set_tree(&self, tree: Option<Arc<CommandTree>>) -> Result<()> {
        self.update(|s| {
            if matches!(s.statement, Statement::Text(_)) {
                return Err(Error::CannotSetCommandTree);
            }
            match (&s.statement, &tree) {
                (Statement::Tree(current), Some(new)) if Arc::ptr_eq(current, new) => {
                    return Ok(())
                }
                (Statement::None, None) => return Ok(()),
                _ => {}
            }
            if tree.is_some() && s.command_type != CommandType::Text {
                return Err(Error::TreeOnStoredProcedureCommand);
            }
            s.statement = tree.map_or(Statement::None, Statement::Tree);
            s.definition_based = false;
            s.unprepare();
            Ok(())
        })
    }

    /// How the text is interpreted
    pub fn command_type(&self) -> CommandType {
        self.inner.lock().command_type
    }

    /// Set how the text is interpreted
    ///
    /// # Errors
    ///
    /// `ReaderStillOpen`, or `UnsupportedCommandType` for anything other than
    /// Text and StoredProcedure.
    pub fn set_command_type(&self, command_type: CommandType) -> Result<()> {
        self.update(|s| {
            if !matches!(command_type, CommandType::Text | CommandType::StoredProcedure) {
                return Err(Error::UnsupportedCommandType { command_type });
            }
            if s.command_type != command_type {
                s.command_type = command_type;
                s.unprepare();
            }
            Ok(())
        })
    }

    // =========================================================================
    // Connection and execution settings
    // =========================================================================

    /// Attached connection
    pub fn connection(&self) -> Option<Arc<Connection>> {
        self.inner.lock().connection()
    }

    /// Attach (or detach) a connection
    ///
    /// Switching away from an attached connection discards the prepared
    /// definition; any change clears the transaction.
    pub fn set_connection(&self, connection: Option<Arc<Connection>>) -> Result<()> {
        self.update(|s| {
            let same = match (&s.connection, &connection) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            };
            if same {
                return Ok(());
            }
            if s.connection.is_some() {
                s.unprepare();
            }
            s.connection = connection;
            s.transaction = None;
            Ok(())
        })
    }

    /// Enlisted transaction
    pub fn transaction(&self) -> Option<TransactionId> {
        self.inner.lock().transaction
    }

    /// Enlist in (or leave) a transaction
    pub fn set_transaction(&self, transaction: Option<TransactionId>) -> Result<()> {
        self.update(|s| {
            s.transaction = transaction;
            Ok(())
        })
    }

    /// Timeout in seconds
    ///
    /// The explicit timeout if set, else the connection's configured default,
    /// else the default of a fresh provider command, else 0.
    pub fn command_timeout(&self) -> u32 {
        let state = self.inner.lock();
        if let Some(timeout) = state.effective_timeout() {
            return timeout;
        }
        state
            .connection
            .as_ref()
            .and_then(|c| c.provider())
            .map_or(0, |provider| provider.create_command().command_timeout())
    }

    /// Set an explicit timeout in seconds
    pub fn set_command_timeout(&self, seconds: u32) -> Result<()> {
        self.update(|s| {
            s.timeout = Some(seconds);
            Ok(())
        })
    }

    /// Drop the explicit timeout
    pub fn reset_command_timeout(&self) -> Result<()> {
        self.update(|s| {
            s.timeout = None;
            Ok(())
        })
    }

    /// Whether text commands use the plan cache
    pub fn enable_plan_caching(&self) -> bool {
        self.inner.lock().plan_caching_enabled()
    }

    /// Turn plan caching on or off for this command
    pub fn set_enable_plan_caching(&self, enabled: bool) -> Result<()> {
        self.update(|s| {
            s.enable_plan_caching = Some(enabled);
            Ok(())
        })
    }

    /// How results are applied to a source row
    pub fn updated_row_source(&self) -> UpdateRowSource {
        self.inner.lock().updated_row_source
    }

    /// Set how results are applied to a source row
    pub fn set_updated_row_source(&self, source: UpdateRowSource) -> Result<()> {
        self.update(|s| {
            s.updated_row_source = source;
            Ok(())
        })
    }

    /// Register (or clear) the reader-closing observer
    pub fn set_reader_closing_observer(
        &self,
        observer: Option<ReaderClosingObserver>,
    ) -> Result<()> {
        self.update(|s| {
            s.reader_closing = observer;
            Ok(())
        })
    }

    // =========================================================================
    // Parameters
    // =========================================================================

    /// Snapshot of the parameters
    pub fn parameters(&self) -> ParameterCollection {
        self.inner.lock().parameters.clone()
    }

    /// Value of the first parameter named `name`
    pub fn parameter_value(&self, name: &str) -> Option<Value> {
        self.inner.lock().parameters.get(name).map(|p| p.value().clone())
    }

    /// Append a parameter
    pub fn add_parameter(&self, parameter: Parameter) -> Result<()> {
        self.update(|s| {
            s.parameters.add(parameter);
            Ok(())
        })
    }

    /// Set a parameter's value; returns false if no parameter has that name
    pub fn set_parameter_value(&self, name: &str, value: impl Into<Value>) -> Result<bool> {
        let value = value.into();
        self.update(|s| Ok(s.parameters.set_value(name, value)))
    }

    /// Edit the parameter collection in place
    pub fn with_parameters_mut<T>(&self, f: impl FnOnce(&mut ParameterCollection) -> T) -> Result<T> {
        self.update(|s| Ok(f(&mut s.parameters)))
    }

    /// Remove every parameter
    pub fn clear_parameters(&self) -> Result<()> {
        self.update(|s| {
            s.parameters.clear();
            Ok(())
        })
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Whether a definition is attached
    pub fn is_prepared(&self) -> bool {
        !matches!(self.inner.lock().lifecycle, Lifecycle::Idle)
    }

    /// Whether a reader of this command is open
    pub fn is_reader_open(&self) -> bool {
        matches!(self.inner.lock().lifecycle, Lifecycle::ReaderOpen { .. })
    }

    /// Whether the command was created from a definition
    pub fn is_definition_based(&self) -> bool {
        self.inner.lock().definition_based
    }

    /// Compile (or fetch from the plan cache) without executing
    ///
    /// # Errors
    ///
    /// - `ReaderStillOpen`
    /// - `NoConnection`, `ConnectionStringNeeded`, `ConnectionNotOpen`
    /// - tree building, parameter and metadata errors
    /// - provider compile errors, unchanged
    pub fn prepare(&self) -> Result<()> {
        let mut state = self.inner.lock();
        state.ensure_mutable()?;
        let connection = state.check_ready()?;
        state.inner_prepare(&connection)?;
        Ok(())
    }

    /// Discard the prepared tree and definition
    pub fn unprepare(&self) -> Result<()> {
        self.update(|s| {
            s.unprepare();
            Ok(())
        })
    }

    /// Store command text of the prepared definition
    ///
    /// Prepares if needed; only requires an attached connection.
    pub fn to_trace_string(&self) -> Result<String> {
        let mut state = self.inner.lock();
        let connection = state.connection.clone().ok_or(Error::NoConnection)?;
        let definition = state.inner_prepare(&connection)?;
        Ok(definition.to_trace_string().to_string())
    }

    /// Prepare, execute and return an open reader
    ///
    /// # Errors
    ///
    /// Everything `prepare` reports, plus provider execution errors unchanged.
    pub fn execute_reader(&self, behavior: CommandBehavior) -> Result<DataReader> {
        let mut state = self.inner.lock();
        state.ensure_mutable()?;
        let connection = state.check_ready()?;
        let definition = state.inner_prepare(&connection)?;

        let (store_command, reader) = definition.execute(ExecutionRequest {
            parameters: &state.parameters,
            timeout: state.effective_timeout(),
            transaction: state.transaction,
            behavior,
        })?;
        debug!(
            target: "quarry::command",
            text = definition.to_trace_string(),
            behavior = behavior.bits(),
            "reader opened"
        );

        state.lifecycle = Lifecycle::ReaderOpen {
            definition,
            store_command: Some(store_command),
        };
        drop(state);
        Ok(DataReader::new(Arc::clone(&self.inner), reader, behavior))
    }

    /// First column of the first row, if any
    ///
    /// The reader is drained and closed on every path.
    pub fn execute_scalar(&self) -> Result<Option<Value>> {
        let mut reader = self.execute_reader(CommandBehavior::SEQUENTIAL_ACCESS)?;
        let value = if reader.read()? {
            Some(reader.get_value(0)?)
        } else {
            None
        };
        reader.drain()?;
        reader.close()?;
        Ok(value)
    }

    /// Rows affected (-1 for row-returning statements)
    ///
    /// The reader is drained and closed on every path.
    pub fn execute_non_query(&self) -> Result<i64> {
        let mut reader = self.execute_reader(CommandBehavior::SEQUENTIAL_ACCESS)?;
        reader.drain()?;
        let affected = reader.records_affected();
        reader.close()?;
        Ok(affected)
    }
}

impl Default for Command {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock();
        let lifecycle = match state.lifecycle {
            Lifecycle::Idle => "Idle",
            Lifecycle::Prepared(_) => "Prepared",
            Lifecycle::ReaderOpen { .. } => "ReaderOpen",
        };
        f.debug_struct("Command")
            .field("statement", &state.statement)
            .field("command_type", &state.command_type)
            .field("parameters", &state.parameters.len())
            .field("lifecycle", &lifecycle)
            .finish()
    }
}

fn text_statement(text: String) -> Statement {
    if text.is_empty() {
        Statement::None
    } else {
        Statement::Text(text)
    }
}
