//! Store implementation over pooled SQLite connections.

use std::path::PathBuf;
use std::sync::Arc;

use rusqlite::{params_from_iter, Connection};
use tracing::{debug, info};

use super::pool::{ConnectionPool, PooledConnection};
use super::{Row, StoreConfig};
use crate::error::Error;
use crate::value::Value;

/// Execute one statement on `connection`, binding `params` positionally.
/// Returns the number of changed rows.
pub fn execute(connection: &Connection, sql: &str, params: &[Value]) -> Result<usize, Error> {
    debug!(sql, params = params.len(), "execute");
    Ok(connection.execute(sql, params_from_iter(params.iter()))?)
}

/// Run a query on `connection` and materialize every row.
pub fn query(connection: &Connection, sql: &str, params: &[Value]) -> Result<Vec<Row>, Error> {
    debug!(sql, params = params.len(), "query");
    let mut statement = connection.prepare(sql)?;
    let columns: Vec<String> = statement
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();

    let mut rows = statement.query(params_from_iter(params.iter()))?;
    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        let values = (0..columns.len())
            .map(|i| row.get_ref(i).map(Value::from))
            .collect::<Result<Vec<_>, _>>()?;
        result.push(Row::new(columns.clone(), values));
    }
    Ok(result)
}

/// Check whether a table exists, using `connection`.
pub fn table_exists(connection: &Connection, table: &str) -> Result<bool, Error> {
    let rows = query(
        connection,
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
        &[Value::from(table)],
    )?;
    Ok(!rows.is_empty())
}

fn table_names(connection: &Connection) -> Result<Vec<String>, Error> {
    let rows = query(
        connection,
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite%' ORDER BY name",
        &[],
    )?;
    Ok(rows
        .into_iter()
        .filter_map(|row| row.values().first().and_then(Value::as_str).map(String::from))
        .collect())
}

struct StoreInner {
    pool: ConnectionPool,
}

/// Handle to one SQLite database file.
///
/// Cloning is cheap; clones share the connection pool. Every operation checks
/// a connection out for the duration of one statement or one transaction.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Open (creating if needed) the database described by `config`.
    pub fn open(config: StoreConfig) -> Result<Self, Error> {
        if !config.is_valid_name() {
            return Err(Error::configuration(format!(
                "invalid store name {:?}",
                config.name
            )));
        }
        std::fs::create_dir_all(&config.directory)?;

        let store = Self {
            inner: Arc::new(StoreInner {
                pool: ConnectionPool::new(config),
            }),
        };
        // Fail early on an unopenable path.
        drop(store.connection()?);

        info!(path = %store.path().display(), "store opened");
        Ok(store)
    }

    /// The store configuration.
    pub fn config(&self) -> &StoreConfig {
        self.inner.pool.config()
    }

    /// The store name (database file name).
    pub fn name(&self) -> &str {
        &self.config().name
    }

    /// Full path of the database file.
    pub fn path(&self) -> PathBuf {
        self.config().path()
    }

    /// Open another database file in the same directory with the same
    /// settings. Returns a clone of `self` when `name` is this store.
    pub fn sibling(&self, name: &str) -> Result<Store, Error> {
        if name == self.name() {
            return Ok(self.clone());
        }
        Store::open(self.config().clone().with_name(name))
    }

    /// Check a connection out of the pool.
    pub fn connection(&self) -> Result<PooledConnection<'_>, Error> {
        self.inner.pool.acquire()
    }

    /// Execute one statement. Returns the number of changed rows.
    pub fn execute(&self, sql: &str, params: &[Value]) -> Result<usize, Error> {
        let connection = self.connection()?;
        execute(&connection, sql, params)
    }

    /// Execute an INSERT and return the rowid the store assigned.
    pub fn insert(&self, sql: &str, params: &[Value]) -> Result<i64, Error> {
        let connection = self.connection()?;
        execute(&connection, sql, params)?;
        Ok(connection.last_insert_rowid())
    }

    /// Run a query and return all rows.
    pub fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, Error> {
        let connection = self.connection()?;
        query(&connection, sql, params)
    }

    /// Run a query and return the first row, if any.
    pub fn query_first(&self, sql: &str, params: &[Value]) -> Result<Option<Row>, Error> {
        Ok(self.query(sql, params)?.into_iter().next())
    }

    /// Run `f` inside a transaction. Commits when `f` returns `Ok`, rolls
    /// back otherwise.
    pub fn transaction<T, F>(&self, f: F) -> Result<T, Error>
    where
        F: FnOnce(&Connection) -> Result<T, Error>,
    {
        let mut connection = self.connection()?;
        let transaction = connection.transaction()?;
        let value = f(&transaction)?;
        transaction.commit()?;
        Ok(value)
    }

    /// Check whether a table exists.
    pub fn table_exists(&self, table: &str) -> Result<bool, Error> {
        let connection = self.connection()?;
        table_exists(&connection, table)
    }

    /// List user tables (SQLite internal tables excluded).
    pub fn tables(&self) -> Result<Vec<String>, Error> {
        let connection = self.connection()?;
        table_names(&connection)
    }

    /// Drop every user table, the schema catalog included. Returns the
    /// number of tables dropped.
    pub fn drop_all(&self) -> Result<usize, Error> {
        let mut connection = self.connection()?;
        let tables = table_names(&connection)?;

        connection.pragma_update(None, "foreign_keys", false)?;
        let dropped = drop_tables(&mut connection, &tables);
        connection.pragma_update(None, "foreign_keys", self.config().foreign_keys)?;
        dropped?;

        info!(store = self.name(), tables = tables.len(), "dropped all tables");
        Ok(tables.len())
    }
}

fn drop_tables(connection: &mut Connection, tables: &[String]) -> Result<(), Error> {
    let transaction = connection.transaction()?;
    for table in tables {
        // Names come from sqlite_master and may predate the identifier rules.
        let sql = format!("DROP TABLE IF EXISTS \"{}\"", table.replace('"', "\"\""));
        execute(&transaction, &sql, &[])?;
    }
    transaction.commit()?;
    Ok(())
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.path())
            .field("open_connections", &self.inner.pool.open_connections())
            .field("idle_connections", &self.inner.pool.idle_connections())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store(dir: &tempfile::TempDir) -> Store {
        Store::open(StoreConfig::in_directory(dir.path(), "engine.sqlite3")).unwrap()
    }

    #[test]
    fn test_execute_and_query() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir);

        store
            .execute("CREATE TABLE t (ID INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT)", &[])
            .unwrap();
        let id = store
            .insert("INSERT INTO t (name) VALUES (?1)", &[Value::from("Ana")])
            .unwrap();
        assert_eq!(id, 1);

        let rows = store
            .query("SELECT * FROM t WHERE name = ?1", &[Value::from("Ana")])
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].columns(), &["ID".to_string(), "name".to_string()]);
        assert_eq!(rows[0].get("name"), Some(&Value::from("Ana")));
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir);
        store.execute("CREATE TABLE t (name TEXT)", &[]).unwrap();

        let result: Result<(), Error> = store.transaction(|conn| {
            execute(conn, "INSERT INTO t (name) VALUES ('a')", &[])?;
            execute(conn, "INSERT INTO missing (name) VALUES ('b')", &[])?;
            Ok(())
        });
        assert!(result.unwrap_err().is_store());

        let rows = store.query("SELECT * FROM t", &[]).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_drop_all() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir);
        store
            .execute("CREATE TABLE parent (ID INTEGER PRIMARY KEY)", &[])
            .unwrap();
        store
            .execute(
                "CREATE TABLE child (ID INTEGER PRIMARY KEY, IDparent INTEGER, \
                 FOREIGN KEY(IDparent) REFERENCES parent(ID) ON DELETE CASCADE)",
                &[],
            )
            .unwrap();

        assert_eq!(store.tables().unwrap(), vec!["child", "parent"]);
        assert_eq!(store.drop_all().unwrap(), 2);
        assert!(store.tables().unwrap().is_empty());
        assert!(!store.table_exists("parent").unwrap());
    }

    #[test]
    fn test_sibling_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir);

        let same = store.sibling("engine.sqlite3").unwrap();
        assert_eq!(same.path(), store.path());

        let other = store.sibling("other.sqlite3").unwrap();
        assert_eq!(other.path(), dir.path().join("other.sqlite3"));
        assert!(store.sibling("../escape.sqlite3").is_err());
    }

    #[test]
    fn test_debug_reports_pool() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir);
        store.execute("CREATE TABLE t (name TEXT)", &[]).unwrap();

        let debug = format!("{store:?}");
        assert!(debug.contains("engine.sqlite3"));
        assert!(debug.contains("idle_connections: 1"));
    }
}
