//! Connection pooling for the store.
//!
//! Connections are opened lazily up to `max_connections` and handed back to
//! the pool when the guard is dropped.

use std::ops::{Deref, DerefMut};
use std::time::Instant;

use parking_lot::{Condvar, Mutex};
use rusqlite::Connection;
use tracing::{debug, warn};

use super::StoreConfig;
use crate::error::Error;

/// Internal pool state.
struct PoolState {
    idle: Vec<Connection>,
    open: usize,
}

/// A bounded pool of SQLite connections to one database file.
pub(crate) struct ConnectionPool {
    config: StoreConfig,
    state: Mutex<PoolState>,
    available: Condvar,
}

impl ConnectionPool {
    pub(crate) fn new(config: StoreConfig) -> Self {
        Self {
            config,
            state: Mutex::new(PoolState {
                idle: Vec::new(),
                open: 0,
            }),
            available: Condvar::new(),
        }
    }

    pub(crate) fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Check a connection out, opening a new one if the pool has room, or
    /// waiting up to the acquire timeout otherwise.
    pub(crate) fn acquire(&self) -> Result<PooledConnection<'_>, Error> {
        let deadline = Instant::now() + self.config.acquire_timeout;
        let mut state = self.state.lock();
        loop {
            if let Some(connection) = state.idle.pop() {
                return Ok(PooledConnection::new(connection, self));
            }

            if state.open < self.config.max_connections {
                state.open += 1;
                drop(state);
                return match self.connect() {
                    Ok(connection) => Ok(PooledConnection::new(connection, self)),
                    Err(e) => {
                        self.state.lock().open -= 1;
                        self.available.notify_one();
                        Err(e)
                    }
                };
            }

            warn!(
                max_connections = self.config.max_connections,
                "connection pool exhausted, waiting"
            );
            if self.available.wait_until(&mut state, deadline).timed_out() {
                return Err(Error::Pool(format!(
                    "no connection to {} available after {:?}",
                    self.config.name, self.config.acquire_timeout
                )));
            }
        }
    }

    fn connect(&self) -> Result<Connection, Error> {
        let path = self.config.path();
        let connection = Connection::open(&path)?;
        connection.busy_timeout(self.config.busy_timeout)?;
        connection.pragma_update(None, "foreign_keys", self.config.foreign_keys)?;
        debug!(path = %path.display(), "opened connection");
        Ok(connection)
    }

    fn release(&self, connection: Connection) {
        let mut state = self.state.lock();
        if connection.is_autocommit() {
            state.idle.push(connection);
        } else {
            // Left inside a transaction; closing it rolls the transaction back.
            state.open -= 1;
            drop(connection);
        }
        drop(state);
        self.available.notify_one();
    }

    /// Number of idle connections.
    pub(crate) fn idle_connections(&self) -> usize {
        self.state.lock().idle.len()
    }

    /// Number of open connections, idle or checked out.
    pub(crate) fn open_connections(&self) -> usize {
        self.state.lock().open
    }
}

/// A pooled connection that returns itself to the pool when dropped.
pub struct PooledConnection<'a> {
    connection: Option<Connection>,
    pool: &'a ConnectionPool,
}

impl<'a> PooledConnection<'a> {
    fn new(connection: Connection, pool: &'a ConnectionPool) -> Self {
        Self {
            connection: Some(connection),
            pool,
        }
    }
}

impl Deref for PooledConnection<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.connection
            .as_ref()
            .expect("pooled connection used after release")
    }
}

impl DerefMut for PooledConnection<'_> {
    fn deref_mut(&mut self) -> &mut Connection {
        self.connection
            .as_mut()
            .expect("pooled connection used after release")
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            self.pool.release(connection);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_pool(dir: &tempfile::TempDir, max: usize) -> ConnectionPool {
        let config = StoreConfig::in_directory(dir.path(), "pool.sqlite3")
            .with_max_connections(max)
            .with_acquire_timeout(Duration::from_millis(50));
        ConnectionPool::new(config)
    }

    #[test]
    fn test_connections_are_reused() {
        let dir = tempfile::tempdir().unwrap();
        let pool = test_pool(&dir, 2);

        {
            let _conn = pool.acquire().unwrap();
            assert_eq!(pool.open_connections(), 1);
            assert_eq!(pool.idle_connections(), 0);
        }
        assert_eq!(pool.idle_connections(), 1);

        let _conn = pool.acquire().unwrap();
        assert_eq!(pool.open_connections(), 1);
    }

    #[test]
    fn test_acquire_times_out_when_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let pool = test_pool(&dir, 1);

        let _held = pool.acquire().unwrap();
        let err = pool.acquire().err().unwrap();
        assert!(matches!(err, Error::Pool(_)));
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let pool = test_pool(&dir, 1);

        let conn = pool.acquire().unwrap();
        let enabled: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }
}
