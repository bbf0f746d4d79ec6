//! Column diff between an entity definition and its live table.

use std::collections::HashSet;

use crate::catalog::{EntityDef, FieldDef, RelationDef};

/// A column the live table is missing.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnChange {
    /// Declared field without a column.
    AddField(FieldDef),
    /// Foreign key without its `ID<field>` column.
    AddForeignKey(RelationDef),
}

impl ColumnChange {
    /// Name of the column to add.
    pub fn column(&self) -> String {
        match self {
            ColumnChange::AddField(field) => field.name.clone(),
            ColumnChange::AddForeignKey(relation) => relation.column().unwrap_or_default(),
        }
    }
}

/// Additive changes that bring a table with `live_columns` up to `def`.
/// Columns the table has but `def` lacks are left alone.
pub fn column_changes(live_columns: &[String], def: &EntityDef) -> Vec<ColumnChange> {
    let live: HashSet<String> = live_columns
        .iter()
        .map(|c| c.to_ascii_lowercase())
        .collect();
    let missing = |column: &str| !live.contains(&column.to_ascii_lowercase());

    let fields = def
        .fields
        .iter()
        .filter(|f| missing(&f.name))
        .cloned()
        .map(ColumnChange::AddField);
    let foreign_keys = def
        .foreign_keys()
        .filter(|r| r.column().is_some_and(|c| missing(&c)))
        .cloned()
        .map(ColumnChange::AddForeignKey);
    fields.chain(foreign_keys).collect()
}
