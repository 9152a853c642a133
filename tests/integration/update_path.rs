//! Update Path Tests
//!
//! Persisting an added entity: bind its late-resolved key, run the insert,
//! harvest the identity and row version, and write them back.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use quarry::testing::{ScriptedCommand, ScriptedResult};
use quarry::update::{
    apply_server_generated_values, CurrentValueRecord, EntityState, ExtractedStateEntry,
    FunctionUpdateCommand, GeneratedValues, PropagatorFlags, PropagatorResult, StructuralType,
    UpdateTranslator,
};
use quarry::{Result, Value};

#[derive(Debug, Default)]
struct TrackedOrder {
    values: Mutex<Vec<Value>>,
}

impl CurrentValueRecord for TrackedOrder {
    fn set_value(&self, ordinal: usize, value: Value) -> Result<()> {
        let mut values = self.values.lock();
        if values.len() <= ordinal {
            values.resize(ordinal + 1, Value::Null);
        }
        values[ordinal] = value;
        Ok(())
    }
}

struct Translator;

impl UpdateTranslator for Translator {
    fn command_timeout(&self) -> Option<u32> {
        Some(60)
    }
}

#[test]
fn insert_harvests_identity_and_row_version() {
    let order = Arc::new(TrackedOrder::default());
    let order_type = Arc::new(StructuralType::new("Order", ["Id", "CustomerId", "RowVersion"]));

    let id = PropagatorResult::server_gen_simple(
        PropagatorFlags::KEY | PropagatorFlags::UNKNOWN,
        Value::Null,
        order.clone(),
        0,
    );
    let row_version = PropagatorResult::server_gen_simple(
        PropagatorFlags::CONCURRENCY_VALUE,
        Value::Null,
        order.clone(),
        2,
    );
    let current = PropagatorResult::structural(
        vec![
            Arc::clone(&id),
            PropagatorResult::simple(PropagatorFlags::FOREIGN_KEY, Value::Null),
            Arc::clone(&row_version),
        ],
        order_type,
        true,
    )
    .unwrap();
    let entry = ExtractedStateEntry::new(EntityState::Added, None, Some(current));

    let store = ScriptedCommand::new(ScriptedResult::rows(vec![vec![
        Value::Int32(10248),
        Value::from("0x0000000000000A1F"),
    ]]))
    .with_text("INSERT INTO Orders (CustomerId) VALUES (@customerId)");
    let mut cmd = FunctionUpdateCommand::new(Arc::new(Translator), entry, Box::new(store));
    cmd.add_input_identifier(1, "customerId");
    cmd.add_result_column("Id", Arc::clone(&id));
    cmd.add_result_column("RowVersion", Arc::clone(&row_version));

    let keys = HashMap::from([(1, Value::from("ALFKI"))]);
    let mut generated = GeneratedValues::new();
    let affected = cmd.execute(&keys, &mut generated).unwrap();

    assert_eq!(affected, 1);
    assert_eq!(cmd.store_command().command_timeout(), 60);
    assert_eq!(cmd.store_command().parameters()[0].value, Value::from("ALFKI"));
    assert_eq!(generated.len(), 2);

    assert_eq!(apply_server_generated_values(&generated).unwrap(), 2);
    assert_eq!(
        *order.values.lock(),
        vec![
            Value::Int32(10248),
            Value::Null,
            Value::from("0x0000000000000A1F")
        ]
    );
}

#[test]
fn delete_without_result_columns_reports_store_count() {
    let order = Arc::new(TrackedOrder::default());
    let original =
        PropagatorResult::server_gen_simple(PropagatorFlags::KEY, 10248i32, order.clone(), 0);
    let entry = ExtractedStateEntry::new(EntityState::Deleted, Some(original), None);

    let store = ScriptedCommand::new(ScriptedResult::affected(0))
        .with_text("DELETE FROM Orders WHERE Id = @id");
    let mut cmd = FunctionUpdateCommand::new(Arc::new(Translator), entry, Box::new(store));
    cmd.add_input_identifier(4, "id");

    let keys = HashMap::from([(4, Value::Int32(10248))]);
    let mut generated = GeneratedValues::new();

    // Zero rows means a concurrency conflict for the caller; the command
    // reports the store's count unchanged.
    assert_eq!(cmd.execute(&keys, &mut generated).unwrap(), 0);
    assert!(generated.is_empty());
    assert!(order.values.lock().is_empty());
    assert_eq!(cmd.entry().state, EntityState::Deleted);
}
