//! Stub query compiler

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::traits::QueryCompiler;
use crate::tree::{CommandTree, ParserOptions, Perspective};
use crate::types::TypeUsage;

/// Query compiler producing a query tree whose expression is the trimmed text
#[derive(Debug, Default)]
pub struct StubCompiler {
    compiles: AtomicUsize,
    failure: Mutex<Option<String>>,
}

impl StubCompiler {
    /// New compiler
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make compilation fail with `message` (or succeed again with `None`)
    pub fn fail_with(&self, message: Option<&str>) {
        *self.failure.lock() = message.map(str::to_string);
    }

    /// Number of `compile` calls
    pub fn compile_count(&self) -> usize {
        self.compiles.load(Ordering::SeqCst)
    }
}

impl QueryCompiler for StubCompiler {
    fn compile(
        &self,
        text: &str,
        perspective: &Perspective,
        _options: Option<&ParserOptions>,
        parameters: &[(String, TypeUsage)],
    ) -> Result<CommandTree> {
        self.compiles.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.failure.lock().clone() {
            return Err(Error::QueryCompilation { message });
        }
        Ok(CommandTree::query(
            Arc::clone(perspective.workspace()),
            text.trim(),
            parameters.to_vec(),
        ))
    }
}
