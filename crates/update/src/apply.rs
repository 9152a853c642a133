//! Write harvested server-generated values back into tracked records.

use tracing::trace;

use quarry_core::{Result, Value};

use crate::command::GeneratedValues;
use crate::propagator::PropagatorResult;

/// Write each harvested value into the record of its server-generated origin
///
/// Values whose origin is not server-generated are skipped. Returns how many
/// values were written.
///
/// # Errors
///
/// The first error reported by a record; values before it stay written.
pub fn apply_server_generated_values(values: &GeneratedValues) -> Result<usize> {
    let mut applied = 0;
    for (origin, value) in values {
        match origin.as_ref() {
            PropagatorResult::ServerGenSimple {
                record, ordinal, ..
            } => {
                record.set_value(*ordinal, value.clone())?;
                applied += 1;
            }
            _ => skip(value),
        }
    }
    Ok(applied)
}

fn skip(value: &Value) {
    trace!(target: "quarry::update", ?value, "generated value has no server-generated origin");
}
