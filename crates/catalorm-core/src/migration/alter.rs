//! Additive ALTER TABLE operations.

use rusqlite::Connection;
use tracing::info;

use crate::catalog::FieldDef;
use crate::error::Error;
use crate::ident::{self, quote, relation_column, ID_COLUMN};
use crate::query::statement;
use crate::storage::{execute, query};
use crate::value::Value;

/// Column names of `table`, in table order. Empty if the table is missing.
pub fn table_columns(connection: &Connection, table: &str) -> Result<Vec<String>, Error> {
    let rows = query(
        connection,
        "SELECT name FROM pragma_table_info(?1)",
        &[Value::from(table)],
    )?;
    Ok(rows
        .into_iter()
        .filter_map(|row| row.get("name").and_then(Value::as_str).map(String::from))
        .collect())
}

/// Add the column of `field` to `table`.
///
/// Existing rows get the field's default, so a non-nullable field without
/// a default is rejected before any SQL runs.
pub fn add_column(connection: &Connection, table: &str, field: &FieldDef) -> Result<(), Error> {
    ident::validate(table, "table")?;
    field.validate()?;
    if !field.can_backfill() {
        return Err(Error::configuration(format!(
            "cannot add non-nullable field `{}` without a default to `{table}`",
            field.name
        )));
    }
    execute(
        connection,
        &statement::add_column(table, &field.name, &field.project_sql_type()),
        &[],
    )?;
    info!(table, column = %field.name, "column added");
    Ok(())
}

/// Add the nullable `ID<field>` column referencing `parent` to `table`.
pub fn add_foreign_key_column(
    connection: &Connection,
    table: &str,
    field_name: &str,
    parent: &str,
) -> Result<(), Error> {
    ident::validate(table, "table")?;
    ident::validate(field_name, "relation field")?;
    ident::validate(parent, "relation target")?;

    let column = relation_column(field_name);
    let definition = format!(
        "INTEGER NULL REFERENCES {}({ID_COLUMN}) ON DELETE CASCADE",
        quote(parent)
    );
    execute(
        connection,
        &statement::add_column(table, &column, &definition),
        &[],
    )?;
    info!(table, column = %column, parent, "foreign key column added");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Store, StoreConfig};

    fn test_store(dir: &tempfile::TempDir) -> Store {
        let store = Store::open(StoreConfig::in_directory(dir.path(), "alter.sqlite3")).unwrap();
        store
            .execute(
                "CREATE TABLE \"person\" (\"ID\" INTEGER PRIMARY KEY AUTOINCREMENT, \"name\" TEXT)",
                &[],
            )
            .unwrap();
        store
            .execute("INSERT INTO \"person\" (\"name\") VALUES ('Ana')", &[])
            .unwrap();
        store
    }

    #[test]
    fn test_add_column_backfills_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir);
        let connection = store.connection().unwrap();

        add_column(&connection, "person", &FieldDef::integer("age").with_default(18)).unwrap();
        assert_eq!(
            table_columns(&connection, "person").unwrap(),
            vec!["ID", "name", "age"]
        );
        let rows = query(&connection, "SELECT age FROM person", &[]).unwrap();
        assert_eq!(rows[0].get("age"), Some(&Value::Integer(18)));
    }

    #[test]
    fn test_add_required_column_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir);
        let connection = store.connection().unwrap();

        let err = add_column(&connection, "person", &FieldDef::integer("age")).unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(table_columns(&connection, "person").unwrap().len(), 2);
    }

    #[test]
    fn test_add_uuid_column_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir);
        let connection = store.connection().unwrap();

        let token = FieldDef::uuid("token").nullable(true);
        let err = add_column(&connection, "person", &token).unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(
            table_columns(&connection, "person").unwrap(),
            vec!["ID", "name"]
        );
    }

    #[test]
    fn test_add_foreign_key_column() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir);
        let connection = store.connection().unwrap();
        execute(
            &connection,
            "CREATE TABLE \"city\" (\"ID\" INTEGER PRIMARY KEY AUTOINCREMENT)",
            &[],
        )
        .unwrap();

        add_foreign_key_column(&connection, "person", "city", "city").unwrap();
        assert!(table_columns(&connection, "person")
            .unwrap()
            .contains(&"IDcity".to_string()));
        assert!(table_columns(&connection, "missing").unwrap().is_empty());
    }
}
