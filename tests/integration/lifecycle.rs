//! End-to-end Command Lifecycle Tests
//!
//! Each test drives a command from construction through execution and reader
//! close, checking what the provider saw and what the command reports after.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::common::*;
use quarry::testing::ScriptedResult;
use quarry::{
    Command, CommandBehavior, CommandDefinition, CommandTree, CommandType, ConnectionState,
    DbType, Error, ErrorKind, Parameter, ParameterDirection, PrimitiveTypeKind,
    ReaderClosingObserver, Result, TypeUsage, Value,
};

// ============================================================================
// Query Commands
// ============================================================================

#[test]
fn query_round_trip() {
    let env = TestEnv::new();
    env.provider.push_result(ScriptedResult::rows(vec![
        vec![Value::Int32(1), Value::from("Alfreds")],
        vec![Value::Int32(2), Value::from("Ana Trujillo")],
    ]));

    let cmd = env.command("SELECT VALUE c FROM Customers AS c WHERE c.Country = @country");
    cmd.add_parameter(Parameter::new("country", "Germany")).unwrap();

    let mut reader = cmd.execute_reader(CommandBehavior::DEFAULT).unwrap();
    let mut ids = Vec::new();
    while reader.read().unwrap() {
        ids.push(reader.get_value(0).unwrap());
    }
    reader.close().unwrap();

    assert_eq!(ids, vec![Value::Int32(1), Value::Int32(2)]);
    let executed = env.provider.log().last().unwrap();
    assert_eq!(
        executed.command_text,
        "STORE[SELECT VALUE c FROM Customers AS c WHERE c.Country = @country]"
    );
    assert_eq!(executed.parameters[0].name, "country");
    assert_eq!(executed.parameters[0].value, Value::from("Germany"));
}

#[test]
fn reexecution_rebinds_values_without_recompiling() {
    let env = TestEnv::new();
    let cmd = env.command("SELECT VALUE o FROM Orders AS o WHERE o.Id = @id");
    cmd.add_parameter(Parameter::new("id", 1i32)).unwrap();

    for id in 1..=3 {
        cmd.set_parameter_value("id", id).unwrap();
        cmd.execute_non_query().unwrap();
        assert_eq!(
            env.provider.log().last().unwrap().parameters[0].value,
            Value::Int32(id)
        );
    }
    assert_eq!(env.compiler.compile_count(), 1);
    assert_eq!(env.provider.compile_count(), 1);
}

#[test]
fn preconditions_checked_before_provider() {
    let env = TestEnv::new();
    let cmd = env.command("SELECT @p");
    cmd.add_parameter(Parameter::new("p", 1i32)).unwrap();
    cmd.add_parameter(Parameter::new("p", 2i32)).unwrap();

    let err = cmd.prepare().unwrap_err();
    assert_eq!(err, Error::DuplicateParameterName { name: "p".into() });
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(env.compiler.compile_count(), 0);
    assert_eq!(env.provider.compile_count(), 0);
}

#[test]
fn untyped_null_parameter_rejected() {
    let env = TestEnv::new();
    let cmd = env.command("SELECT @p");
    cmd.add_parameter(Parameter::new("p", Value::Null)).unwrap();
    assert_eq!(
        cmd.prepare().unwrap_err(),
        Error::UnknownParameterType { name: "p".into() }
    );

    cmd.with_parameters_mut(|params| {
        if let Some(p) = params.get_mut("p") {
            p.set_db_type(DbType::Int64);
        }
    })
    .unwrap();
    cmd.prepare().unwrap();
}

#[test]
fn broken_store_blocks_execution() {
    let env = TestEnv::new();
    let cmd = env.command("SELECT 1");
    cmd.prepare().unwrap();

    env.store.set_state(ConnectionState::Broken);
    assert_eq!(
        cmd.execute_non_query().unwrap_err(),
        Error::ConnectionNotOpen {
            state: ConnectionState::Broken
        }
    );
    assert!(env.provider.log().is_empty());
}

// ============================================================================
// Stored Procedures
// ============================================================================

#[test]
fn stored_procedure_with_output_parameter() {
    let env = TestEnv::new();
    env.provider
        .push_result(ScriptedResult::affected(1).with_output("orderId", 10248i32));

    let cmd = env.command("Northwind.AddOrder");
    cmd.set_command_type(CommandType::StoredProcedure).unwrap();
    cmd.add_parameter(
        Parameter::typed("orderId", DbType::Int32).with_direction(ParameterDirection::Output),
    )
    .unwrap();

    assert_eq!(cmd.execute_non_query().unwrap(), 1);
    assert_eq!(cmd.parameter_value("orderId"), Some(Value::Int32(10248)));
    assert!(env.connection.plan_cache().is_empty());
}

// ============================================================================
// Definitions
// ============================================================================

#[test]
fn definition_shared_by_many_commands() {
    let env = TestEnv::new();
    let tree = Arc::new(CommandTree::query(
        northwind(),
        "o.Id = @id",
        vec![("id".into(), TypeUsage::primitive(PrimitiveTypeKind::Int32))],
    ));
    let definition = Arc::new(CommandDefinition::compile(tree, &env.connection).unwrap());

    let commands: Vec<Command> = (0..3)
        .map(|_| {
            Command::from_definition(Arc::clone(&definition), Some(Arc::clone(&env.connection)))
        })
        .collect();
    for (i, cmd) in commands.iter().enumerate() {
        cmd.set_parameter_value("id", i as i32).unwrap();
        cmd.execute_non_query().unwrap();
    }

    assert_eq!(env.provider.compile_count(), 1);
    let records = env.provider.log().records();
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.command_text == "STORE[o.Id = @id]"));
    assert_eq!(records[2].parameters[0].value, Value::Int32(2));
}

// ============================================================================
// Reader Binding
// ============================================================================

#[test]
fn observer_sees_output_values_and_unlocked_command() {
    let env = TestEnv::new();
    env.provider
        .push_result(ScriptedResult::affected(1).with_output("orderId", 7i32));
    let cmd = env.command("Northwind.AddOrder");
    cmd.set_command_type(CommandType::StoredProcedure).unwrap();
    cmd.add_parameter(
        Parameter::typed("orderId", DbType::Int32).with_direction(ParameterDirection::Output),
    )
    .unwrap();

    let seen = Arc::new(AtomicUsize::new(0));
    let observer: ReaderClosingObserver = {
        let seen = Arc::clone(&seen);
        Arc::new(move |command: &Command| -> Result<()> {
            assert!(!command.is_reader_open());
            if command.parameter_value("orderId") == Some(Value::Int32(7)) {
                seen.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        })
    };
    cmd.set_reader_closing_observer(Some(observer)).unwrap();

    let reader = cmd.execute_reader(CommandBehavior::DEFAULT).unwrap();
    drop(reader);

    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

#[test]
fn close_connection_reader_closes_connection_after_observer() {
    let env = TestEnv::new();
    let state_at_observer = Arc::new(parking_lot::Mutex::new(None));
    let observer: ReaderClosingObserver = {
        let state_at_observer = Arc::clone(&state_at_observer);
        Arc::new(move |command: &Command| -> Result<()> {
            let state = command.connection().map(|c| c.state());
            *state_at_observer.lock() = state;
            Ok(())
        })
    };

    let cmd = env.command("SELECT 1");
    cmd.set_reader_closing_observer(Some(observer)).unwrap();
    let mut reader = cmd
        .execute_reader(CommandBehavior::CLOSE_CONNECTION | CommandBehavior::SINGLE_RESULT)
        .unwrap();
    reader.close().unwrap();

    assert_eq!(*state_at_observer.lock(), Some(ConnectionState::Open));
    assert_eq!(env.connection.state(), ConnectionState::Closed);
    assert_eq!(
        cmd.execute_non_query().unwrap_err(),
        Error::ConnectionNotOpen {
            state: ConnectionState::Closed
        }
    );
}
