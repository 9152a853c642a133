//! Scripted provider, command and reader

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::ProviderError;
use crate::traits::{
    ProviderCommand, ProviderFactory, ProviderReader, StoreParameter, StoreParameterSpec,
    StoreStatement,
};
use crate::tree::{CommandTree, TreeKind};
use crate::types::{CommandBehavior, TransactionId};
use crate::value::Value;

/// What a scripted command produces when executed
#[derive(Debug, Clone)]
pub struct ScriptedResult {
    /// Rows of the (single) result set
    pub rows: Vec<Vec<Value>>,
    /// Value reported by `records_affected` and `execute_non_query`
    pub records_affected: i64,
    /// Values written into non-input parameters on execution, by name
    pub output_values: Vec<(String, Value)>,
    /// Failure raised instead of executing
    pub failure: Option<ProviderError>,
}

impl Default for ScriptedResult {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            records_affected: -1,
            output_values: Vec::new(),
            failure: None,
        }
    }
}

impl ScriptedResult {
    /// Result set with the given rows
    pub fn rows(rows: Vec<Vec<Value>>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    /// Row-less statement affecting `count` rows
    pub fn affected(count: i64) -> Self {
        Self {
            records_affected: count,
            ..Self::default()
        }
    }

    /// Execution fails with `error`
    pub fn failing(error: ProviderError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    /// Builder: write `value` into parameter `name` on execution
    pub fn with_output(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.output_values.push((name.into(), value.into()));
        self
    }
}

/// One recorded execution
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRecord {
    /// Store text at execution time
    pub command_text: String,
    /// Timeout at execution time
    pub timeout: u32,
    /// Enlisted transaction
    pub transaction: Option<TransactionId>,
    /// Parameters bound at execution time (before outputs were written)
    pub parameters: Vec<StoreParameter>,
    /// Reader behavior, `None` for `execute_non_query`
    pub behavior: Option<CommandBehavior>,
}

/// Shared, append-only log of executions
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog(Arc<Mutex<Vec<ExecutionRecord>>>);

impl ExecutionLog {
    /// Empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records
    pub fn records(&self) -> Vec<ExecutionRecord> {
        self.0.lock().clone()
    }

    /// Most recent record
    pub fn last(&self) -> Option<ExecutionRecord> {
        self.0.lock().last().cloned()
    }

    /// Number of executions
    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    /// Whether nothing was executed
    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    fn push(&self, record: ExecutionRecord) {
        self.0.lock().push(record);
    }
}

/// Provider factory with scripted command results
///
/// Compiles query trees to `STORE[<expression>]` and function trees to
/// `EXEC <container>.<name>`. Each created command takes the next queued
/// [`ScriptedResult`], falling back to the default result when the queue is
/// empty.
#[derive(Debug)]
pub struct ScriptedProvider {
    name: String,
    default_timeout: u32,
    compiles: AtomicUsize,
    compile_failure: Mutex<Option<ProviderError>>,
    queued: Mutex<VecDeque<ScriptedResult>>,
    default_result: Mutex<ScriptedResult>,
    log: ExecutionLog,
    open_readers: Arc<AtomicUsize>,
}

impl ScriptedProvider {
    /// Provider with invariant name `name` and a 30 second default timeout
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Self::with_default_timeout(name, 30)
    }

    /// Provider whose fresh commands report `timeout` seconds
    pub fn with_default_timeout(name: impl Into<String>, timeout: u32) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            default_timeout: timeout,
            compiles: AtomicUsize::new(0),
            compile_failure: Mutex::new(None),
            queued: Mutex::new(VecDeque::new()),
            default_result: Mutex::new(ScriptedResult::default()),
            log: ExecutionLog::new(),
            open_readers: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Queue the result of the next created command
    pub fn push_result(&self, result: ScriptedResult) {
        self.queued.lock().push_back(result);
    }

    /// Result used once the queue is empty
    pub fn set_default_result(&self, result: ScriptedResult) {
        *self.default_result.lock() = result;
    }

    /// Make tree compilation fail (or succeed again with `None`)
    pub fn fail_compilation(&self, error: Option<ProviderError>) {
        *self.compile_failure.lock() = error;
    }

    /// Number of `create_command_definition` calls
    pub fn compile_count(&self) -> usize {
        self.compiles.load(Ordering::SeqCst)
    }

    /// Executions performed by commands of this provider
    pub fn log(&self) -> &ExecutionLog {
        &self.log
    }

    /// Readers opened and not yet closed
    pub fn open_readers(&self) -> usize {
        self.open_readers.load(Ordering::SeqCst)
    }
}

impl ProviderFactory for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn create_command(&self) -> Box<dyn ProviderCommand> {
        let result = self
            .queued
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.default_result.lock().clone());
        let mut command = ScriptedCommand::with_log(result, self.log.clone());
        command.timeout = self.default_timeout;
        command.open_readers = Arc::clone(&self.open_readers);
        Box::new(command)
    }

    fn create_command_definition(
        &self,
        tree: &CommandTree,
    ) -> std::result::Result<StoreStatement, ProviderError> {
        self.compiles.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.compile_failure.lock().clone() {
            return Err(err);
        }
        let command_text = match tree.kind() {
            TreeKind::Query { expression } => format!("STORE[{}]", expression),
            TreeKind::Function { function } => format!("EXEC {}", function.qualified_name()),
        };
        let parameters = tree
            .parameters()
            .iter()
            .map(|(name, type_usage)| StoreParameterSpec {
                name: name.clone(),
                type_usage: type_usage.clone(),
            })
            .collect();
        Ok(StoreStatement {
            command_text,
            parameters,
        })
    }
}

/// Provider command replaying a [`ScriptedResult`]
#[derive(Debug)]
pub struct ScriptedCommand {
    text: String,
    timeout: u32,
    transaction: Option<TransactionId>,
    parameters: Vec<StoreParameter>,
    result: ScriptedResult,
    log: ExecutionLog,
    open_readers: Arc<AtomicUsize>,
}

impl ScriptedCommand {
    /// Standalone command with its own log
    pub fn new(result: ScriptedResult) -> Self {
        Self::with_log(result, ExecutionLog::new())
    }

    /// Standalone command recording into `log`
    pub fn with_log(result: ScriptedResult, log: ExecutionLog) -> Self {
        Self {
            text: String::new(),
            timeout: 0,
            transaction: None,
            parameters: Vec::new(),
            result,
            log,
            open_readers: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Builder: initial store text
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Builder: bind a parameter
    pub fn with_parameter(mut self, parameter: StoreParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    fn record(&self, behavior: Option<CommandBehavior>) {
        self.log.push(ExecutionRecord {
            command_text: self.text.clone(),
            timeout: self.timeout,
            transaction: self.transaction,
            parameters: self.parameters.clone(),
            behavior,
        });
    }

    fn run(&mut self, behavior: Option<CommandBehavior>) -> std::result::Result<(), ProviderError> {
        self.record(behavior);
        if let Some(err) = &self.result.failure {
            return Err(err.clone());
        }
        for (name, value) in &self.result.output_values {
            if let Some(p) = self
                .parameters
                .iter_mut()
                .find(|p| &p.name == name && p.direction.receives_store_value())
            {
                p.value = value.clone();
            }
        }
        Ok(())
    }
}

impl ProviderCommand for ScriptedCommand {
    fn command_text(&self) -> &str {
        &self.text
    }

    fn set_command_text(&mut self, text: &str) {
        self.text = text.to_string();
    }

    fn command_timeout(&self) -> u32 {
        self.timeout
    }

    fn set_command_timeout(&mut self, seconds: u32) {
        self.timeout = seconds;
    }

    fn set_transaction(&mut self, transaction: Option<TransactionId>) {
        self.transaction = transaction;
    }

    fn parameters(&self) -> &[StoreParameter] {
        &self.parameters
    }

    fn parameters_mut(&mut self) -> &mut Vec<StoreParameter> {
        &mut self.parameters
    }

    fn execute_non_query(&mut self) -> std::result::Result<i64, ProviderError> {
        self.run(None)?;
        Ok(self.result.records_affected)
    }

    fn execute_reader(
        &mut self,
        behavior: CommandBehavior,
    ) -> std::result::Result<Box<dyn ProviderReader>, ProviderError> {
        self.run(Some(behavior))?;
        self.open_readers.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedReader {
            rows: self.result.rows.iter().cloned().collect(),
            current: None,
            records_affected: self.result.records_affected,
            closed: false,
            open_readers: Arc::clone(&self.open_readers),
        }))
    }
}

/// Reader over a single scripted result set
#[derive(Debug)]
pub struct ScriptedReader {
    rows: VecDeque<Vec<Value>>,
    current: Option<Vec<Value>>,
    records_affected: i64,
    closed: bool,
    open_readers: Arc<AtomicUsize>,
}

impl ScriptedReader {
    /// Whether `close` was called
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> std::result::Result<(), ProviderError> {
        if self.closed {
            return Err(ProviderError::new("reader is closed"));
        }
        Ok(())
    }
}

impl ProviderReader for ScriptedReader {
    fn read(&mut self) -> std::result::Result<bool, ProviderError> {
        self.ensure_open()?;
        self.current = self.rows.pop_front();
        Ok(self.current.is_some())
    }

    fn field_count(&self) -> usize {
        self.current.as_ref().map_or(0, Vec::len)
    }

    fn get_value(&mut self, ordinal: usize) -> std::result::Result<Value, ProviderError> {
        self.ensure_open()?;
        self.current
            .as_ref()
            .and_then(|row| row.get(ordinal))
            .cloned()
            .ok_or_else(|| ProviderError::new(format!("no value at ordinal {}", ordinal)))
    }

    fn next_result(&mut self) -> std::result::Result<bool, ProviderError> {
        self.ensure_open()?;
        self.rows.clear();
        self.current = None;
        Ok(false)
    }

    fn records_affected(&self) -> i64 {
        self.records_affected
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.open_readers.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{FunctionImport, InMemoryWorkspace};
    use crate::types::{ParameterDirection, PrimitiveTypeKind, TypeUsage};

    #[test]
    fn test_compiles_query_and_function_trees() {
        let provider = ScriptedProvider::new("scripted");
        let ws = InMemoryWorkspace::empty(1);
        let query = CommandTree::query(
            ws.clone(),
            "1 + @x",
            vec![("x".into(), TypeUsage::primitive(PrimitiveTypeKind::Int32))],
        );
        let stmt = provider.create_command_definition(&query).unwrap();
        assert_eq!(stmt.command_text, "STORE[1 + @x]");
        assert_eq!(stmt.parameters.len(), 1);

        let function = CommandTree::function(ws, FunctionImport::new("C", "F"), Vec::new());
        let stmt = provider.create_command_definition(&function).unwrap();
        assert_eq!(stmt.command_text, "EXEC C.F");
        assert_eq!(provider.compile_count(), 2);
    }

    #[test]
    fn test_queued_results_then_default() {
        let provider = ScriptedProvider::new("scripted");
        provider.push_result(ScriptedResult::affected(3));
        provider.set_default_result(ScriptedResult::affected(7));

        let mut first = provider.create_command();
        let mut second = provider.create_command();
        assert_eq!(first.execute_non_query().unwrap(), 3);
        assert_eq!(second.execute_non_query().unwrap(), 7);
        assert_eq!(provider.log().len(), 2);
        assert_eq!(first.command_timeout(), 30);
    }

    #[test]
    fn test_output_values_written_to_non_input_parameters() {
        let mut cmd = ScriptedCommand::new(
            ScriptedResult::affected(1)
                .with_output("out", 42i64)
                .with_output("in", 99i64),
        )
        .with_parameter(StoreParameter {
            name: "out".into(),
            direction: ParameterDirection::Output,
            type_usage: None,
            value: Value::Null,
        })
        .with_parameter(StoreParameter::input("in", 1i64));

        cmd.execute_non_query().unwrap();
        assert_eq!(cmd.parameters()[0].value, Value::Int64(42));
        assert_eq!(cmd.parameters()[1].value, Value::Int64(1));
    }

    #[test]
    fn test_reader_tracks_open_count() {
        let provider = ScriptedProvider::new("scripted");
        provider.push_result(ScriptedResult::rows(vec![vec![Value::Int32(1)]]));
        let mut cmd = provider.create_command();
        let mut reader = cmd.execute_reader(CommandBehavior::DEFAULT).unwrap();
        assert_eq!(provider.open_readers(), 1);

        assert!(reader.read().unwrap());
        assert_eq!(reader.get_value(0).unwrap(), Value::Int32(1));
        assert!(!reader.read().unwrap());

        reader.close();
        reader.close();
        assert_eq!(provider.open_readers(), 0);
        assert!(reader.read().is_err());
    }

    #[test]
    fn test_failure_is_recorded_and_returned() {
        let mut cmd = ScriptedCommand::new(ScriptedResult::failing(ProviderError::new("boom")));
        let log = cmd.log.clone();
        assert!(cmd.execute_reader(CommandBehavior::DEFAULT).is_err());
        assert_eq!(log.len(), 1);
        assert_eq!(log.last().unwrap().behavior, Some(CommandBehavior::DEFAULT));
    }
}
