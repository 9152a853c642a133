//! Data readers
//!
//! A [`DataReader`] is bound to the command that opened it: while it is open
//! the command refuses mutation. Closing the reader (explicitly or by
//! dropping it) runs the release protocol:
//!
//! 1. close the provider reader
//! 2. unlock the command and copy store-produced parameter values back
//! 3. run the command's reader-closing observer, once
//! 4. close the connection when opened with `CLOSE_CONNECTION`

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use quarry_core::{CommandBehavior, Error, ProviderReader, Result, Value};

use crate::command::{Command, CommandState};

/// Forward-only reader over a command's results
pub struct DataReader {
    command: Arc<Mutex<CommandState>>,
    reader: Box<dyn ProviderReader>,
    behavior: CommandBehavior,
    closed: bool,
}

impl DataReader {
    pub(crate) fn new(
        command: Arc<Mutex<CommandState>>,
        reader: Box<dyn ProviderReader>,
        behavior: CommandBehavior,
    ) -> Self {
        Self {
            command,
            reader,
            behavior,
            closed: false,
        }
    }

    /// Behavior the reader was opened with
    pub fn behavior(&self) -> CommandBehavior {
        self.behavior
    }

    /// Whether `close` has run
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Advance to the next row
    pub fn read(&mut self) -> Result<bool> {
        self.ensure_open()?;
        Ok(self.reader.read()?)
    }

    /// Columns in the current row
    pub fn field_count(&self) -> usize {
        self.reader.field_count()
    }

    /// Value of column `ordinal` in the current row
    pub fn get_value(&mut self, ordinal: usize) -> Result<Value> {
        self.ensure_open()?;
        Ok(self.reader.get_value(ordinal)?)
    }

    /// Advance to the next result set
    pub fn next_result(&mut self) -> Result<bool> {
        self.ensure_open()?;
        Ok(self.reader.next_result()?)
    }

    /// Rows changed by the statement (-1 for row-returning statements)
    pub fn records_affected(&self) -> i64 {
        self.reader.records_affected()
    }

    /// Consume every remaining row of every result set
    pub fn drain(&mut self) -> Result<()> {
        loop {
            while self.read()? {}
            if !self.next_result()? {
                return Ok(());
            }
        }
    }

    /// Close the reader and release the command
    ///
    /// Idempotent. The command is unlocked before the observer runs, even if
    /// the observer fails; its error is returned.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.reader.close();

        let (observer, connection) = {
            let mut state = self.command.lock();
            state.release_reader();
            (state.reader_closing_observer(), state.connection())
        };
        debug!(target: "quarry::reader", "reader closed");

        let observed = match observer {
            Some(observer) => observer(&Command::from_shared(Arc::clone(&self.command))),
            None => Ok(()),
        };

        if self.behavior.contains(CommandBehavior::CLOSE_CONNECTION) {
            if let Some(connection) = connection {
                connection.close();
            }
        }
        observed
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::ReaderClosed);
        }
        Ok(())
    }
}

impl Drop for DataReader {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(target: "quarry::reader", error = %e, "reader-closing observer failed");
        }
    }
}

impl std::fmt::Debug for DataReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataReader")
            .field("behavior", &self.behavior)
            .field("closed", &self.closed)
            .finish()
    }
}
