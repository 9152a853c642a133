//! Connection to a model-backed store
//!
//! A [`Connection`] ties together everything a command needs to prepare and
//! execute: the metadata workspace, the provider factory, the physical store
//! connection, the query compiler and the plan cache. Connections are shared
//! through `Arc` and built with [`Connection::builder`].
//!
//! # Usage
//!
//! ```ignore
//! use quarry_executor::Connection;
//!
//! let conn = Connection::builder()
//!     .workspace(workspace)
//!     .provider(provider)
//!     .store_connection(store)
//!     .query_compiler(compiler)
//!     .build()?;
//! conn.open()?;
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use quarry_cache::PlanCache;
use quarry_core::{
    ConnectionState, Error, MetadataWorkspace, ProviderConnection, ProviderFactory,
    QueryCompiler, Result,
};

use crate::config::QuarryConfig;
use crate::definition::CommandDefinition;

/// Plan cache holding compiled command definitions
pub type DefinitionCache = PlanCache<CommandDefinition>;

#[derive(Debug, Default)]
struct OpenState {
    open: bool,
    opened_store: bool,
}

/// Connection shared by commands
pub struct Connection {
    workspace: Arc<dyn MetadataWorkspace>,
    provider: Option<Arc<dyn ProviderFactory>>,
    store_connection: Option<Arc<dyn ProviderConnection>>,
    query_compiler: Option<Arc<dyn QueryCompiler>>,
    plan_cache: Arc<DefinitionCache>,
    config: QuarryConfig,
    state: Mutex<OpenState>,
}

impl Connection {
    /// Start building a connection
    pub fn builder() -> ConnectionBuilder {
        ConnectionBuilder::default()
    }

    /// Open the connection
    ///
    /// Opens the store connection if it is closed, then makes sure store
    /// metadata is available. On failure the store connection is closed again
    /// if this call opened it, and the connection stays closed.
    ///
    /// # Errors
    ///
    /// - `ConnectionStringNeeded` without a provider or store connection
    /// - `CannotReopenConnection` when already open
    /// - provider and metadata errors, unchanged
    pub fn open(&self) -> Result<()> {
        let (store, _) = self.physical()?;
        let mut state = self.state.lock();
        if state.open {
            return Err(Error::CannotReopenConnection);
        }

        let opened_store = if store.state() == ConnectionState::Closed {
            store.open()?;
            true
        } else {
            false
        };

        if let Err(e) = self.workspace.ensure_store_metadata() {
            if opened_store {
                store.close();
            }
            debug!(target: "quarry::connection", error = %e, "connection open failed");
            return Err(e);
        }

        state.open = true;
        state.opened_store = opened_store;
        debug!(target: "quarry::connection", opened_store, "connection opened");
        Ok(())
    }

    /// Close the connection; the store connection is closed if `open` opened it
    pub fn close(&self) {
        let mut state = self.state.lock();
        if !state.open {
            return;
        }
        if state.opened_store {
            if let Some(store) = &self.store_connection {
                store.close();
            }
        }
        *state = OpenState::default();
        debug!(target: "quarry::connection", "connection closed");
    }

    /// Current state
    ///
    /// `Broken` when this connection is open but the store connection is not.
    pub fn state(&self) -> ConnectionState {
        if !self.state.lock().open {
            return ConnectionState::Closed;
        }
        match self.store_connection.as_ref().map(|s| s.state()) {
            Some(ConnectionState::Open) => ConnectionState::Open,
            _ => ConnectionState::Broken,
        }
    }

    /// Metadata workspace
    pub fn workspace(&self) -> &Arc<dyn MetadataWorkspace> {
        &self.workspace
    }

    /// Provider factory
    pub fn provider(&self) -> Option<&Arc<dyn ProviderFactory>> {
        self.provider.as_ref()
    }

    /// Physical store connection
    pub fn store_connection(&self) -> Option<&Arc<dyn ProviderConnection>> {
        self.store_connection.as_ref()
    }

    /// Query compiler for text commands
    pub fn query_compiler(&self) -> Option<&Arc<dyn QueryCompiler>> {
        self.query_compiler.as_ref()
    }

    /// Plan cache used by commands on this connection
    pub fn plan_cache(&self) -> &Arc<DefinitionCache> {
        &self.plan_cache
    }

    /// Configuration
    pub fn config(&self) -> &QuarryConfig {
        &self.config
    }

    pub(crate) fn physical(
        &self,
    ) -> Result<(&Arc<dyn ProviderConnection>, &Arc<dyn ProviderFactory>)> {
        match (&self.store_connection, &self.provider) {
            (Some(store), Some(provider)) => Ok((store, provider)),
            _ => Err(Error::ConnectionStringNeeded),
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("mapping", &self.workspace.mapping_fingerprint())
            .field("provider", &self.provider.as_ref().map(|p| p.name().to_string()))
            .field("state", &self.state())
            .field("plan_cache", &self.plan_cache)
            .finish()
    }
}

/// Builder for [`Connection`]
#[derive(Default)]
pub struct ConnectionBuilder {
    workspace: Option<Arc<dyn MetadataWorkspace>>,
    provider: Option<Arc<dyn ProviderFactory>>,
    store_connection: Option<Arc<dyn ProviderConnection>>,
    query_compiler: Option<Arc<dyn QueryCompiler>>,
    plan_cache: Option<Arc<DefinitionCache>>,
    config: Option<QuarryConfig>,
}

impl ConnectionBuilder {
    /// Metadata workspace (required)
    pub fn workspace(mut self, workspace: Arc<dyn MetadataWorkspace>) -> Self {
        self.workspace = Some(workspace);
        self
    }

    /// Provider factory
    pub fn provider(mut self, provider: Arc<dyn ProviderFactory>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Physical store connection
    pub fn store_connection(mut self, store: Arc<dyn ProviderConnection>) -> Self {
        self.store_connection = Some(store);
        self
    }

    /// Query compiler for text commands
    pub fn query_compiler(mut self, compiler: Arc<dyn QueryCompiler>) -> Self {
        self.query_compiler = Some(compiler);
        self
    }

    /// Share an existing plan cache (otherwise a private one is created)
    pub fn plan_cache(mut self, cache: Arc<DefinitionCache>) -> Self {
        self.plan_cache = Some(cache);
        self
    }

    /// Configuration (defaults to [`QuarryConfig::default`])
    pub fn config(mut self, config: QuarryConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the connection (closed)
    ///
    /// # Errors
    ///
    /// Returns `Config` when no workspace was given or the config is invalid.
    pub fn build(self) -> Result<Arc<Connection>> {
        let workspace = self
            .workspace
            .ok_or_else(|| Error::config("a metadata workspace is required"))?;
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let plan_cache = self
            .plan_cache
            .unwrap_or_else(|| Arc::new(PlanCache::new(config.plan_cache.capacity)));

        Ok(Arc::new(Connection {
            workspace,
            provider: self.provider,
            store_connection: self.store_connection,
            query_compiler: self.query_compiler,
            plan_cache,
            config,
            state: Mutex::new(OpenState::default()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_core::testing::{ScriptedConnection, ScriptedProvider};
    use quarry_core::{InMemoryWorkspace, ProviderError};

    fn connection(
        store: &Arc<ScriptedConnection>,
        workspace: Arc<InMemoryWorkspace>,
    ) -> Arc<Connection> {
        Connection::builder()
            .workspace(workspace)
            .provider(ScriptedProvider::new("scripted"))
            .store_connection(store.clone())
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_requires_workspace() {
        let err = Connection::builder().build().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let mut config = QuarryConfig::default();
        config.plan_cache.capacity = 0;
        let err = Connection::builder()
            .workspace(InMemoryWorkspace::empty(1))
            .config(config)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_private_cache_sized_from_config() {
        let mut config = QuarryConfig::default();
        config.plan_cache.capacity = 17;
        let conn = Connection::builder()
            .workspace(InMemoryWorkspace::empty(1))
            .config(config)
            .build()
            .unwrap();
        assert_eq!(conn.plan_cache().capacity(), 17);
    }

    #[test]
    fn test_open_requires_provider_and_store() {
        let conn = Connection::builder()
            .workspace(InMemoryWorkspace::empty(1))
            .build()
            .unwrap();
        assert_eq!(conn.open().unwrap_err(), Error::ConnectionStringNeeded);
    }

    #[test]
    fn test_open_and_close_owned_store() {
        let store = ScriptedConnection::new();
        let conn = connection(&store, InMemoryWorkspace::empty(1));
        assert_eq!(conn.state(), ConnectionState::Closed);

        conn.open().unwrap();
        assert_eq!(conn.state(), ConnectionState::Open);
        assert_eq!(store.open_count(), 1);

        assert_eq!(conn.open().unwrap_err(), Error::CannotReopenConnection);

        conn.close();
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert_eq!(store.state(), ConnectionState::Closed);
    }

    #[test]
    fn test_open_borrowed_store_is_left_open() {
        let store = ScriptedConnection::opened();
        let conn = connection(&store, InMemoryWorkspace::empty(1));
        conn.open().unwrap();
        assert_eq!(store.open_count(), 0);

        conn.close();
        assert_eq!(store.close_count(), 0);
        assert_eq!(store.state(), ConnectionState::Open);
    }

    #[test]
    fn test_metadata_failure_closes_store_opened_here() {
        let store = ScriptedConnection::new();
        let ws = InMemoryWorkspace::builder(1)
            .fail_store_metadata("no store schema")
            .build();
        let conn = connection(&store, ws);

        let err = conn.open().unwrap_err();
        assert!(matches!(err, Error::StoreMetadataUnavailable { .. }));
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert_eq!(store.state(), ConnectionState::Closed);
        assert_eq!(store.close_count(), 1);
    }

    #[test]
    fn test_metadata_failure_leaves_borrowed_store_open() {
        let store = ScriptedConnection::opened();
        let ws = InMemoryWorkspace::builder(1)
            .fail_store_metadata("no store schema")
            .build();
        let conn = connection(&store, ws);

        assert!(conn.open().is_err());
        assert_eq!(store.close_count(), 0);
        assert_eq!(store.state(), ConnectionState::Open);
    }

    #[test]
    fn test_store_open_failure_propagates() {
        let store = ScriptedConnection::new();
        store.fail_open(Some(ProviderError::with_code(18456, "login failed")));
        let conn = connection(&store, InMemoryWorkspace::empty(1));

        let err = conn.open().unwrap_err();
        assert!(matches!(err, Error::Provider(ref e) if e.code == Some(18456)));
        assert_eq!(conn.state(), ConnectionState::Closed);
    }

    #[test]
    fn test_broken_store_reports_broken() {
        let store = ScriptedConnection::new();
        let conn = connection(&store, InMemoryWorkspace::empty(1));
        conn.open().unwrap();
        store.set_state(ConnectionState::Broken);
        assert_eq!(conn.state(), ConnectionState::Broken);
    }
}
