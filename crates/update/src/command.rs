//! Function update commands
//!
//! A [`FunctionUpdateCommand`] wraps the physical command that persists one
//! extracted change entry. Execution:
//!
//! 1. apply the translator's timeout (none leaves the provider default)
//! 2. bind late-resolved key values into the registered input parameters
//! 3. without result columns, run a non-query and return the store's count
//! 4. with result columns, read at most one row and harvest one value per
//!    column, by position; return 1 when a row was read, else 0

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use quarry_core::{
    CommandBehavior, Error, ProviderCommand, ProviderReader, Result, StoreParameter, Value,
};

use crate::entry::ExtractedStateEntry;
use crate::propagator::PropagatorResult;

/// Harvested `(origin, value)` pairs, in result-column order
pub type GeneratedValues = Vec<(Arc<PropagatorResult>, Value)>;

/// Settings of the update pass that owns the command
pub trait UpdateTranslator: Send + Sync {
    /// Timeout in seconds for each update command
    fn command_timeout(&self) -> Option<u32>;
}

/// Physical command persisting one change entry
pub struct FunctionUpdateCommand {
    translator: Arc<dyn UpdateTranslator>,
    entry: ExtractedStateEntry,
    store_command: Box<dyn ProviderCommand>,
    input_identifiers: Vec<(i64, String)>,
    result_columns: Vec<(String, Arc<PropagatorResult>)>,
}

impl FunctionUpdateCommand {
    /// Command for `entry` running `store_command`
    pub fn new(
        translator: Arc<dyn UpdateTranslator>,
        entry: ExtractedStateEntry,
        store_command: Box<dyn ProviderCommand>,
    ) -> Self {
        Self {
            translator,
            entry,
            store_command,
            input_identifiers: Vec::new(),
            result_columns: Vec::new(),
        }
    }

    /// Change entry this command persists
    pub fn entry(&self) -> &ExtractedStateEntry {
        &self.entry
    }

    /// Underlying provider command
    pub fn store_command(&self) -> &dyn ProviderCommand {
        self.store_command.as_ref()
    }

    /// Bind the value of key `identifier` into parameter `parameter_name` at execution
    pub fn add_input_identifier(&mut self, identifier: i64, parameter_name: impl Into<String>) {
        self.input_identifiers.push((identifier, parameter_name.into()));
    }

    /// Declare a result column whose value maps back to `origin`
    pub fn add_result_column(&mut self, column: impl Into<String>, origin: Arc<PropagatorResult>) {
        self.result_columns.push((column.into(), origin));
    }

    /// Declared result columns, in store column order
    pub fn result_columns(&self) -> &[(String, Arc<PropagatorResult>)] {
        &self.result_columns
    }

    /// Write identifier values into their parameters
    ///
    /// A parameter missing from the store command is appended as an input.
    ///
    /// # Errors
    ///
    /// `MissingInputIdentifier` when `values` has no entry for a registered
    /// identifier.
    pub fn set_input_identifiers(&mut self, values: &HashMap<i64, Value>) -> Result<()> {
        for (identifier, name) in &self.input_identifiers {
            let value = values
                .get(identifier)
                .cloned()
                .ok_or(Error::MissingInputIdentifier {
                    identifier: *identifier,
                })?;
            let parameters = self.store_command.parameters_mut();
            match parameters.iter_mut().find(|p| &p.name == name) {
                Some(parameter) => parameter.value = value,
                None => parameters.push(StoreParameter::input(name.clone(), value)),
            }
        }
        Ok(())
    }

    /// Execute and harvest server-generated values into `generated`
    ///
    /// Returns the store's affected-row count, or (with result columns) 1 when
    /// a row was produced and 0 otherwise. Provider errors are returned
    /// unchanged; the reader is closed on every path.
    pub fn execute(
        &mut self,
        identifier_values: &HashMap<i64, Value>,
        generated: &mut GeneratedValues,
    ) -> Result<i64> {
        if let Some(timeout) = self.translator.command_timeout() {
            self.store_command.set_command_timeout(timeout);
        }
        self.set_input_identifiers(identifier_values)?;

        if self.result_columns.is_empty() {
            let affected = self.store_command.execute_non_query()?;
            debug!(target: "quarry::update", affected, "update command executed");
            return Ok(affected);
        }

        let mut reader = self
            .store_command
            .execute_reader(CommandBehavior::SEQUENTIAL_ACCESS)?;
        let harvested = harvest_row(reader.as_mut(), &self.result_columns, generated);
        reader.close();

        let rows = harvested?;
        debug!(
            target: "quarry::update",
            rows,
            columns = self.result_columns.len(),
            "update command harvested generated values"
        );
        Ok(rows)
    }
}

fn harvest_row(
    reader: &mut dyn ProviderReader,
    columns: &[(String, Arc<PropagatorResult>)],
    generated: &mut GeneratedValues,
) -> Result<i64> {
    if !reader.read()? {
        return Ok(0);
    }
    let mut row = Vec::with_capacity(columns.len());
    for (ordinal, (_, origin)) in columns.iter().enumerate() {
        row.push((Arc::clone(origin), reader.get_value(ordinal)?));
    }
    generated.extend(row);
    while reader.next_result()? {}
    Ok(1)
}

impl std::fmt::Debug for FunctionUpdateCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionUpdateCommand")
            .field("state", &self.entry.state)
            .field("text", &self.store_command.command_text())
            .field("input_identifiers", &self.input_identifiers)
            .field("result_columns", &self.result_columns.len())
            .finish()
    }
}
