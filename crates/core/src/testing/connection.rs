//! Scripted physical connection

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::ProviderError;
use crate::traits::ProviderConnection;
use crate::types::ConnectionState;

/// Physical connection whose state is set by the test
#[derive(Debug, Default)]
pub struct ScriptedConnection {
    state: Mutex<ConnectionState>,
    open_failure: Mutex<Option<ProviderError>>,
    opens: AtomicUsize,
    closes: AtomicUsize,
}

impl ScriptedConnection {
    /// Closed connection
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Connection that is already open
    pub fn opened() -> Arc<Self> {
        let conn = Self::new();
        conn.set_state(ConnectionState::Open);
        conn
    }

    /// Force the reported state
    pub fn set_state(&self, state: ConnectionState) {
        *self.state.lock() = state;
    }

    /// Make `open` fail (or succeed again with `None`)
    pub fn fail_open(&self, error: Option<ProviderError>) {
        *self.open_failure.lock() = error;
    }

    /// Number of `open` calls
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Number of `close` calls
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl ProviderConnection for ScriptedConnection {
    fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    fn open(&self) -> std::result::Result<(), ProviderError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.open_failure.lock().clone() {
            return Err(err);
        }
        *self.state.lock() = ConnectionState::Open;
        Ok(())
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        *self.state.lock() = ConnectionState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_close_cycle() {
        let conn = ScriptedConnection::new();
        assert_eq!(conn.state(), ConnectionState::Closed);
        conn.open().unwrap();
        assert_eq!(conn.state(), ConnectionState::Open);
        conn.close();
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert_eq!((conn.open_count(), conn.close_count()), (1, 1));
    }

    #[test]
    fn test_open_failure_leaves_state() {
        let conn = ScriptedConnection::new();
        conn.fail_open(Some(ProviderError::new("login failed")));
        assert!(conn.open().is_err());
        assert_eq!(conn.state(), ConnectionState::Closed);
    }
}
