//! Additive schema evolution.
//!
//! Tables only ever grow: new fields and foreign-key columns are added with
//! `ALTER TABLE ... ADD COLUMN`. Columns are never dropped or retyped.

mod alter;
mod diff;

pub use alter::{add_column, add_foreign_key_column, table_columns};
pub use diff::{column_changes, ColumnChange};

use rusqlite::Connection;

use crate::catalog::EntityDef;
use crate::error::Error;

/// Add every column of `def` that its live table lacks. Returns the applied
/// changes.
pub fn sync_columns(connection: &Connection, def: &EntityDef) -> Result<Vec<ColumnChange>, Error> {
    let live = table_columns(connection, &def.table_name)?;
    let changes = column_changes(&live, def);
    for change in &changes {
        match change {
            ColumnChange::AddField(field) => add_column(connection, &def.table_name, field)?,
            ColumnChange::AddForeignKey(relation) => add_foreign_key_column(
                connection,
                &def.table_name,
                &relation.field_name,
                &relation.target,
            )?,
        }
    }
    Ok(changes)
}
