//! Test modules for the executor crate.


use std::sync::Arc;

use quarry_core::testing::{ScriptedConnection, ScriptedProvider, StubCompiler};
use quarry_core::{
    FunctionImport, InMemoryWorkspace, ParameterDirection, PrimitiveTypeKind, TypeUsage,
};

use crate::{Command, Connection, QuarryConfig};

/// Mapping fingerprint of the fixture workspace
pub const MAPPING: u64 = 0x5eed;

/// Workspace with a `Northwind` container and two function imports
pub fn workspace() -> Arc<InMemoryWorkspace> {
    InMemoryWorkspace::builder(MAPPING)
        .function_import(
            FunctionImport::new("Northwind", "GetOrders")
                .with_parameter(
                    "customerId",
                    TypeUsage::primitive(PrimitiveTypeKind::String),
                    ParameterDirection::Input,
                )
                .with_return_type(TypeUsage::primitive(PrimitiveTypeKind::Int32)),
        )
        .function_import(FunctionImport::new("Northwind", "AddOrder").with_parameter(
            "orderId",
            TypeUsage::primitive(PrimitiveTypeKind::Int32),
            ParameterDirection::Output,
        ))
        .build()
}

/// Open connection over scripted collaborators
pub struct Fixture {
    pub provider: Arc<ScriptedProvider>,
    pub compiler: Arc<StubCompiler>,
    pub store: Arc<ScriptedConnection>,
    pub connection: Arc<Connection>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(QuarryConfig::default())
    }

    pub fn with_config(config: QuarryConfig) -> Self {
        let provider = ScriptedProvider::new("scripted");
        let compiler = StubCompiler::new();
        let store = ScriptedConnection::new();
        let connection = Connection::builder()
            .workspace(workspace())
            .provider(provider.clone())
            .store_connection(store.clone())
            .query_compiler(compiler.clone())
            .config(config)
            .build()
            .unwrap();
        connection.open().unwrap();
        Self {
            provider,
            compiler,
            store,
            connection,
        }
    }

    pub fn command(&self, text: &str) -> Command {
        Command::with_connection(text, Arc::clone(&self.connection))
    }
}
