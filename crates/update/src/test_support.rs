//! Shared test doubles.

use std::sync::Arc;

use parking_lot::Mutex;

use quarry_core::{Result, Value};

use crate::propagator::CurrentValueRecord;

/// Current-value record remembering every write
#[derive(Debug, Default)]
pub struct RecordingRecord {
    writes: Mutex<Vec<(usize, Value)>>,
}

impl RecordingRecord {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn writes(&self) -> Vec<(usize, Value)> {
        self.writes.lock().clone()
    }
}

impl CurrentValueRecord for RecordingRecord {
    fn set_value(&self, ordinal: usize, value: Value) -> Result<()> {
        self.writes.lock().push((ordinal, value));
        Ok(())
    }
}
