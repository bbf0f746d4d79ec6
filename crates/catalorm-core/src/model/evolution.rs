//! Additive schema evolution of a live model.

use tracing::info;

use super::{Model, ModelState};
use crate::catalog::{self, EntityDef, FieldDef, FieldKind, RelationDef, RelationKind};
use crate::error::Error;
use crate::field::Field;
use crate::ident::ID_COLUMN;
use crate::migration;
use crate::relation as resolver;
use crate::storage::table_exists;

impl Model {
    /// Add a field to the entity: ALTER TABLE plus catalog update in one
    /// transaction. Returns `false` when the name is already taken.
    ///
    /// A schema-less model over an existing table first adopts the table's
    /// columns as nullable text fields, so the catalog entry keeps them.
    pub fn append_field(&mut self, field: FieldDef) -> Result<bool, Error> {
        let base = self.evolved()?;
        if self.has_name(&field.name) || base.has_name(&field.name) {
            return Ok(false);
        }
        let def = base.with_field(field.clone());
        def.validate()?;

        let table = self.table_name.clone();
        self.store.transaction(|conn| {
            if table_exists(conn, &table)? {
                catalog::ensure_in(conn)?;
                migration::add_column(conn, &table, &field)?;
                catalog::store_in(conn, &def)
            } else {
                resolver::install(conn, &def).map(drop)
            }
        })?;

        self.adopt(def)?;
        info!(table = %self.table_name, field = %field.name, "field appended");
        Ok(true)
    }

    /// Add a relation to the entity. Foreign keys add their `ID<field>`
    /// column; many-to-many relations resolve their junction table. Returns
    /// `false` when the name is already taken.
    pub fn append_relation(&mut self, relation: RelationDef) -> Result<bool, Error> {
        let base = self.evolved()?;
        if self.has_name(&relation.field_name) || base.has_name(&relation.field_name) {
            return Ok(false);
        }
        let def = base.with_relation(relation.clone());
        def.validate()?;

        let table = self.table_name.clone();
        let junction = self.store.transaction(|conn| {
            if !table_exists(conn, &table)? {
                let junctions = resolver::install(conn, &def)?;
                return Ok(junctions.into_iter().next().map(|(_, j)| j));
            }
            catalog::ensure_in(conn)?;
            let junction = match relation.kind {
                RelationKind::ForeignKey => {
                    migration::add_foreign_key_column(
                        conn,
                        &table,
                        &relation.field_name,
                        &relation.target,
                    )?;
                    None
                }
                RelationKind::ManyToMany => {
                    Some(resolver::ensure_junction(conn, &table, &relation)?)
                }
            };
            catalog::store_in(conn, &def)?;
            Ok(junction)
        })?;

        if let Some(junction) = junction {
            self.junctions.insert(relation.field_name.clone(), junction);
        }
        self.adopt(def)?;
        info!(table = %self.table_name, relation = %relation.field_name, "relation appended");
        Ok(true)
    }

    fn has_name(&self, name: &str) -> bool {
        self.schema.as_ref().is_some_and(|def| def.has_name(name)) || self.fields.contains_key(name)
    }

    /// The definition to extend: the schema, or the live columns of a
    /// schema-less table.
    fn evolved(&self) -> Result<EntityDef, Error> {
        if let Some(def) = &self.schema {
            return Ok(def.clone());
        }
        let columns = {
            let connection = self.store.connection()?;
            migration::table_columns(&connection, &self.table_name)?
        };
        Ok(columns
            .into_iter()
            .filter(|column| column != ID_COLUMN)
            .fold(EntityDef::new(self.table_name.clone()), |def, column| {
                def.with_field(FieldDef::text(column).nullable(true))
            }))
    }

    /// Install `def` as the schema. Columns it declares that are not live
    /// fields yet take over their undeclared values.
    fn adopt(&mut self, def: EntityDef) -> Result<(), Error> {
        let declared = def.fields.iter().cloned().chain(
            def.foreign_keys()
                .filter_map(|r| r.column())
                .map(|column| FieldDef::new(column, FieldKind::Integer).nullable(true)),
        );
        for field in declared.collect::<Vec<_>>() {
            if self.fields.contains_key(&field.name) {
                continue;
            }
            let name = field.name.clone();
            let mut live = Field::new(field);
            if let Some(value) = self.extras.shift_remove(&name) {
                live.hydrate(value)?;
            }
            self.fields.insert(name, live);
        }
        self.schema = Some(def);
        if self.state == ModelState::Uninitialized {
            self.state = ModelState::SchemaResolved;
        }
        Ok(())
    }
}
