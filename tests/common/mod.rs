//! Shared test utilities for the integration suites.
//!
//! Import via `mod common;` from a test's main.rs.

#![allow(dead_code)]

use std::sync::{Arc, Once};

use quarry::contracts::{FunctionImport, InMemoryWorkspace};
use quarry::testing::{ScriptedConnection, ScriptedProvider, StubCompiler};
use quarry::{
    Command, Connection, DefinitionCache, ParameterDirection, PrimitiveTypeKind, QuarryConfig,
    TypeUsage,
};

// ============================================================================
// Initialization
// ============================================================================

static INIT_TRACING: Once = Once::new();

/// Install a test-writer subscriber once per process
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

/// Mapping fingerprint of [`northwind`]
pub const NORTHWIND: u64 = 0x4e57;

/// Workspace with the `Northwind` container
pub fn northwind() -> Arc<InMemoryWorkspace> {
    InMemoryWorkspace::builder(NORTHWIND)
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

// ============================================================================
// TestEnv - open connection over scripted collaborators
// ============================================================================

/// Open connection with handles to its scripted collaborators
pub struct TestEnv {
    pub provider: Arc<ScriptedProvider>,
    pub compiler: Arc<StubCompiler>,
    pub store: Arc<ScriptedConnection>,
    pub connection: Arc<Connection>,
}

impl TestEnv {
    /// Environment with a private plan cache and default config
    pub fn new() -> Self {
        Self::builder().open()
    }

    pub fn builder() -> TestEnvBuilder {
        TestEnvBuilder::default()
    }

    /// Text command on this environment's connection
    pub fn command(&self, text: &str) -> Command {
        Command::with_connection(text, Arc::clone(&self.connection))
    }
}

/// Options for [`TestEnv`]
#[derive(Default)]
pub struct TestEnvBuilder {
    provider_name: Option<String>,
    cache: Option<Arc<DefinitionCache>>,
    config: Option<QuarryConfig>,
}

impl TestEnvBuilder {
    pub fn provider_name(mut self, name: &str) -> Self {
        self.provider_name = Some(name.to_string());
        self
    }

    pub fn cache(mut self, cache: Arc<DefinitionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn config(mut self, config: QuarryConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn open(self) -> TestEnv {
        init_tracing();
        let provider = ScriptedProvider::new(self.provider_name.as_deref().unwrap_or("scripted"));
        let compiler = StubCompiler::new();
        let store = ScriptedConnection::new();

        let mut builder = Connection::builder()
            .workspace(northwind())
            .provider(provider.clone())
            .store_connection(store.clone())
            .query_compiler(compiler.clone())
            .config(self.config.unwrap_or_default());
        if let Some(cache) = self.cache {
            builder = builder.plan_cache(cache);
        }
        let connection = builder.build().expect("connection");
        connection.open().expect("open");

        TestEnv {
            provider,
            compiler,
            store,
            connection,
        }
    }
}
