//! Store configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Database file name used when none is given.
pub const DEFAULT_STORE_NAME: &str = "db.sqlite3";

/// Default maximum number of pooled connections.
pub const DEFAULT_MAX_CONNECTIONS: usize = 4;

/// Default time to wait for a pooled connection.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default time SQLite waits on a locked database before failing.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for a store (one SQLite database file).
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding the database file.
    pub directory: PathBuf,

    /// Database file name. This is the "store name" carried by transport
    /// records.
    pub name: String,

    /// Maximum number of open connections in the pool.
    pub max_connections: usize,

    /// How long `acquire` waits for a free connection.
    pub acquire_timeout: Duration,

    /// SQLite busy timeout applied to every connection.
    pub busy_timeout: Duration,

    /// Enforce foreign keys (`PRAGMA foreign_keys`), required for cascade
    /// deletes.
    pub foreign_keys: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./"),
            name: DEFAULT_STORE_NAME.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            foreign_keys: true,
        }
    }
}

impl StoreConfig {
    /// Create a configuration for the database file at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_STORE_NAME.to_string());
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("./"),
        };
        Self {
            directory,
            name,
            ..Default::default()
        }
    }

    /// Create a configuration for database `name` inside `directory`.
    pub fn in_directory(directory: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Full path of the database file.
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.name)
    }

    /// Check that the name is a plain file name inside `directory`.
    pub fn is_valid_name(&self) -> bool {
        !self.name.is_empty()
            && self.name != "."
            && self.name != ".."
            && !self.name.contains(['/', '\\'])
    }

    /// Use another database file in the same directory.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the maximum pool size (at least one).
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max.max(1);
        self
    }

    /// Set the acquire timeout.
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Set the SQLite busy timeout.
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Disable foreign-key enforcement.
    pub fn without_foreign_keys(mut self) -> Self {
        self.foreign_keys = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_path() {
        let config = StoreConfig::new("/var/data/app.sqlite3");
        assert_eq!(config.directory, PathBuf::from("/var/data"));
        assert_eq!(config.name, "app.sqlite3");
        assert_eq!(config.path(), PathBuf::from("/var/data/app.sqlite3"));
    }

    #[test]
    fn test_config_bare_name() {
        let config = StoreConfig::new("app.sqlite3");
        assert_eq!(config.directory, PathBuf::from("./"));
        assert_eq!(config.name, "app.sqlite3");
    }

    #[test]
    fn test_config_builder() {
        let config = StoreConfig::in_directory("/tmp", "a.db")
            .with_max_connections(0)
            .with_acquire_timeout(Duration::from_millis(50))
            .without_foreign_keys()
            .with_name("b.db");

        assert_eq!(config.max_connections, 1);
        assert_eq!(config.acquire_timeout, Duration::from_millis(50));
        assert!(!config.foreign_keys);
        assert_eq!(config.path(), PathBuf::from("/tmp/b.db"));
    }
}
