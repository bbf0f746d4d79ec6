//! Schema catalog: entity descriptors stored in a reserved table of the same
//! database.

use rusqlite::Connection;
use tracing::debug;

use super::EntityDef;
use crate::error::Error;
use crate::storage::{execute, query, Store};
use crate::value::Value;

/// Name of the catalog table.
pub const CATALOG_TABLE: &str = "models_db";

/// Create the catalog table if it does not exist.
pub fn ensure_in(connection: &Connection) -> Result<(), Error> {
    execute(
        connection,
        "CREATE TABLE IF NOT EXISTS \"models_db\" (\
         ID INTEGER PRIMARY KEY AUTOINCREMENT, \
         table_name TEXT UNIQUE, \
         model TEXT)",
        &[],
    )?;
    Ok(())
}

/// Read the definition of `table` on `connection`.
pub fn fetch_in(connection: &Connection, table: &str) -> Result<Option<EntityDef>, Error> {
    let rows = query(
        connection,
        "SELECT model FROM \"models_db\" WHERE table_name = ?1",
        &[Value::from(table)],
    )?;
    let Some(row) = rows.into_iter().next() else {
        return Ok(None);
    };
    let blob = row
        .get("model")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Deserialization(format!("catalog entry of `{table}` has no model")))?;

    debug!(table, "catalog entry loaded");
    EntityDef::from_blob(table, blob).map(Some)
}

/// Insert or replace the catalog entry of `def` on `connection`.
pub fn store_in(connection: &Connection, def: &EntityDef) -> Result<(), Error> {
    let blob = def.to_blob()?;
    execute(
        connection,
        "INSERT INTO \"models_db\" (table_name, model) VALUES (?1, ?2) \
         ON CONFLICT(table_name) DO UPDATE SET model = excluded.model",
        &[Value::from(def.table_name.as_str()), Value::from(blob)],
    )?;
    debug!(table = %def.table_name, "catalog entry stored");
    Ok(())
}

/// Delete the catalog entry of `table` on `connection`. Returns whether one
/// existed.
pub fn remove_in(connection: &Connection, table: &str) -> Result<bool, Error> {
    let removed = execute(
        connection,
        "DELETE FROM \"models_db\" WHERE table_name = ?1",
        &[Value::from(table)],
    )?;
    Ok(removed > 0)
}

/// The schema catalog of one store.
#[derive(Debug, Clone)]
pub struct SchemaCatalog {
    store: Store,
}

impl SchemaCatalog {
    /// Open the catalog of `store`, creating its table if needed.
    pub fn open(store: &Store) -> Result<Self, Error> {
        let connection = store.connection()?;
        ensure_in(&connection)?;
        Ok(Self {
            store: store.clone(),
        })
    }

    /// The store this catalog lives in.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Get the definition of `table`, if registered.
    pub fn get(&self, table: &str) -> Result<Option<EntityDef>, Error> {
        let connection = self.store.connection()?;
        fetch_in(&connection, table)
    }

    /// Register or replace a definition.
    pub fn put(&self, def: &EntityDef) -> Result<(), Error> {
        def.validate()?;
        let connection = self.store.connection()?;
        store_in(&connection, def)
    }

    /// Remove the entry of `table`. Returns whether one existed.
    pub fn remove(&self, table: &str) -> Result<bool, Error> {
        let connection = self.store.connection()?;
        remove_in(&connection, table)
    }

    /// Check if `table` is registered.
    pub fn contains(&self, table: &str) -> Result<bool, Error> {
        let row = self.store.query_first(
            "SELECT 1 FROM \"models_db\" WHERE table_name = ?1",
            &[Value::from(table)],
        )?;
        Ok(row.is_some())
    }

    /// Registered table names, sorted.
    pub fn tables(&self) -> Result<Vec<String>, Error> {
        let rows = self.store.query(
            "SELECT table_name FROM \"models_db\" ORDER BY table_name",
            &[],
        )?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.get("table_name").and_then(Value::as_str).map(String::from))
            .collect())
    }
}
