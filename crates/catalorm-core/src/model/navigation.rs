//! Relation navigation.

use super::Model;
use crate::catalog::{RelationDef, RelationKind};
use crate::error::Error;
use crate::ident::{quote, ID_COLUMN};
use crate::query::QueryOptions;
use crate::relation::JunctionTable;
use crate::value::Value;

impl Model {
    /// Point the foreign key `field` at `target`.
    pub fn set_related(&mut self, field: &str, target: &Model) -> Result<(), Error> {
        let relation = self.relation_of(field, RelationKind::ForeignKey)?;
        check_target(&relation, target)?;
        let column = relation.column().unwrap_or_default();
        self.set(&column, Value::Integer(target.identity))
    }

    /// The entity the foreign key `field` points at, if any.
    pub fn related(&self, field: &str) -> Result<Option<Model>, Error> {
        let relation = self.relation_of(field, RelationKind::ForeignKey)?;
        let column = relation.column().unwrap_or_default();
        let Some(id) = self.fields.get(&column).and_then(|f| f.raw().as_i64()) else {
            return Ok(None);
        };

        let mut target = Model::open(&self.store, &relation.target)?;
        Ok(target.load_by_identity(id)?.then_some(target))
    }

    /// Link `other` through the many-to-many `field`. Returns `false` when
    /// the pair was already linked.
    pub fn link(&self, field: &str, other: &Model) -> Result<bool, Error> {
        let junction = self.junction_for(field, other)?;
        let sql = format!(
            "INSERT INTO {table} ({own}, {target}) SELECT ?1, ?2 \
             WHERE NOT EXISTS (SELECT 1 FROM {table} WHERE {own} = ?1 AND {target} = ?2)",
            table = quote(&junction.name),
            own = quote(&junction.owner_column),
            target = quote(&junction.target_column),
        );
        let inserted = self.store.execute(
            &sql,
            &[Value::Integer(self.identity), Value::Integer(other.identity)],
        )?;
        Ok(inserted > 0)
    }

    /// Remove the link to `other` through `field`. Returns whether a link
    /// existed.
    pub fn unlink(&self, field: &str, other: &Model) -> Result<bool, Error> {
        let junction = self.junction_for(field, other)?;
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?1 AND {} = ?2",
            quote(&junction.name),
            quote(&junction.owner_column),
            quote(&junction.target_column),
        );
        let removed = self.store.execute(
            &sql,
            &[Value::Integer(self.identity), Value::Integer(other.identity)],
        )?;
        Ok(removed > 0)
    }

    /// Entities linked through the many-to-many `field`.
    pub fn linked(&self, field: &str) -> Result<Vec<Model>, Error> {
        let relation = self.relation_of(field, RelationKind::ManyToMany)?;
        let junction = self.junction(field)?;
        if !self.is_saved() {
            return Ok(Vec::new());
        }

        let target = Model::open(&self.store, &relation.target)?;
        let options = QueryOptions::new().filter_with(
            format!(
                "{} IN (SELECT {} FROM {} WHERE {} = ?)",
                quote(ID_COLUMN),
                quote(&junction.target_column),
                quote(&junction.name),
                quote(&junction.owner_column),
            ),
            [self.identity],
        );
        target.find_all(&options)
    }

    fn relation_of(&self, field: &str, kind: RelationKind) -> Result<RelationDef, Error> {
        let relation = self
            .schema
            .as_ref()
            .and_then(|def| def.relation(field))
            .ok_or_else(|| self.unknown_field(field))?;
        if relation.kind != kind {
            return Err(Error::configuration(format!(
                "`{field}` of `{}` is a {} relation",
                self.table_name,
                relation.kind.class_name()
            )));
        }
        Ok(relation.clone())
    }

    fn junction(&self, field: &str) -> Result<&JunctionTable, Error> {
        self.junctions.get(field).ok_or_else(|| {
            Error::configuration(format!(
                "no junction table for `{field}` of `{}`",
                self.table_name
            ))
        })
    }

    fn junction_for(&self, field: &str, other: &Model) -> Result<&JunctionTable, Error> {
        let relation = self.relation_of(field, RelationKind::ManyToMany)?;
        check_target(&relation, other)?;
        if !self.is_saved() {
            return Err(Error::validation(format!(
                "`{}` must be saved before linking",
                self.table_name
            )));
        }
        self.junction(field)
    }
}

fn check_target(relation: &RelationDef, target: &Model) -> Result<(), Error> {
    if target.table_name != relation.target {
        return Err(Error::configuration(format!(
            "`{}` relates to `{}`, not `{}`",
            relation.field_name, relation.target, target.table_name
        )));
    }
    if !target.is_saved() {
        return Err(Error::validation(format!(
            "related `{}` must be saved first",
            target.table_name
        )));
    }
    Ok(())
}
