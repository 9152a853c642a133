//! Command tree construction
//!
//! Turns a command's statement into the logical tree handed to the provider:
//! - an explicitly set tree is used as is
//! - Text commands compile their text with the connection's query compiler
//! - StoredProcedure commands resolve `container.functionImport` against the
//!   workspace and build a function-invocation tree
//!
//! Parameter types are resolved first; they become the tree's formal
//! parameters.

use std::sync::Arc;

use tracing::debug;

use quarry_core::{
    CommandTree, CommandType, Error, ParameterCollection, Perspective, Result,
};

use crate::command::Statement;
use crate::connection::Connection;
use crate::resolver::resolve_parameter_types;

/// Split a function-import reference into `(container, function)`
///
/// Parts are trimmed. A reference with a single part uses
/// `default_container` when one is given.
///
/// # Errors
///
/// `InvalidFunctionImportText` when the text does not name both parts.
pub fn parse_function_import_name(
    text: &str,
    default_container: Option<&str>,
) -> Result<(String, String)> {
    let parts: Vec<&str> = text.split('.').collect();
    let (container, function) = match parts.as_slice() {
        [container, function] => (container.trim(), function.trim()),
        [function] => match default_container {
            Some(container) => (container, function.trim()),
            None => ("", ""),
        },
        _ => ("", ""),
    };

    if container.is_empty() || function.is_empty() {
        return Err(Error::InvalidFunctionImportText {
            text: text.to_string(),
        });
    }
    Ok((container.to_string(), function.to_string()))
}

/// Build the tree for one preparation cycle
pub(crate) fn build_command_tree(
    statement: &Statement,
    command_type: CommandType,
    parameters: &ParameterCollection,
    definition_based: bool,
    connection: &Connection,
) -> Result<Arc<CommandTree>> {
    if let Statement::Tree(tree) = statement {
        return Ok(Arc::clone(tree));
    }

    let text = match statement {
        Statement::Text(text) => text.as_str(),
        _ => "",
    };

    match command_type {
        CommandType::Text => build_query_tree(text, parameters, definition_based, connection),
        CommandType::StoredProcedure => build_function_tree(text, parameters, connection),
        other => Err(Error::UnsupportedCommandType {
            command_type: other,
        }),
    }
}

fn build_query_tree(
    text: &str,
    parameters: &ParameterCollection,
    definition_based: bool,
    connection: &Connection,
) -> Result<Arc<CommandTree>> {
    if text.is_empty() {
        return Err(if definition_based {
            Error::CannotReprepareDefinitionBased
        } else {
            Error::NoCommandText
        });
    }

    let resolved = resolve_parameter_types(parameters, CommandType::Text)?;
    let compiler = connection
        .query_compiler()
        .ok_or(Error::QueryCompilerUnavailable)?;
    let perspective = Perspective::model(Arc::clone(connection.workspace()));
    let tree = compiler.compile(text, &perspective, None, &resolved.tree_parameters())?;
    debug!(target: "quarry::command", parameters = resolved.len(), "compiled query text");
    Ok(Arc::new(tree))
}

fn build_function_tree(
    text: &str,
    parameters: &ParameterCollection,
    connection: &Connection,
) -> Result<Arc<CommandTree>> {
    if text.trim().is_empty() {
        return Err(Error::EmptyFunctionImportText);
    }

    let (container, name) = parse_function_import_name(text, None)?;
    let function = connection
        .workspace()
        .resolve_function_import(&container, &name)
        .ok_or_else(|| Error::FunctionImportNotFound {
            container: container.clone(),
            name: name.clone(),
        })?;

    let resolved = resolve_parameter_types(parameters, CommandType::StoredProcedure)?;
    debug!(
        target: "quarry::command",
        function = %function.qualified_name(),
        "built function import tree"
    );
    Ok(Arc::new(CommandTree::function(
        Arc::clone(connection.workspace()),
        function,
        resolved.tree_parameters(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_qualified_name() {
        assert_eq!(
            parse_function_import_name("Northwind.GetOrders", None).unwrap(),
            ("Northwind".to_string(), "GetOrders".to_string())
        );
    }

    #[test]
    fn test_parse_trims_parts() {
        assert_eq!(
            parse_function_import_name(" Northwind . GetOrders ", None).unwrap(),
            ("Northwind".to_string(), "GetOrders".to_string())
        );
    }

    #[test]
    fn test_parse_single_part_uses_default_container() {
        assert_eq!(
            parse_function_import_name("GetOrders", Some("Northwind")).unwrap(),
            ("Northwind".to_string(), "GetOrders".to_string())
        );
        assert!(matches!(
            parse_function_import_name("GetOrders", None),
            Err(Error::InvalidFunctionImportText { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for text in ["a.b.c", "a.", ".b", " . "] {
            assert!(
                matches!(
                    parse_function_import_name(text, None),
                    Err(Error::InvalidFunctionImportText { .. })
                ),
                "{:?} should be rejected",
                text
            );
        }
    }
}
