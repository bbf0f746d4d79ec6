//! Entity definitions.

use std::collections::HashSet;

use super::catalog::CATALOG_TABLE;
use super::field::FieldDef;
use super::relation::RelationDef;
use crate::error::Error;
use crate::ident;

/// An entity definition (table schema). The identity column `ID` is implicit.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDef {
    /// Table name.
    pub table_name: String,
    /// Field definitions, in column order.
    pub fields: Vec<FieldDef>,
    /// Relation definitions.
    pub relations: Vec<RelationDef>,
}

impl EntityDef {
    /// Create an empty entity definition.
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            fields: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// Create an empty definition named after the type `T`.
    pub fn for_type<T: ?Sized>() -> Self {
        Self::new(default_table_name::<T>())
    }

    /// Add a field to the entity.
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a relation to the entity.
    pub fn with_relation(mut self, relation: RelationDef) -> Self {
        self.relations.push(relation);
        self
    }

    /// Get a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Get a relation by field name.
    pub fn relation(&self, field_name: &str) -> Option<&RelationDef> {
        self.relations.iter().find(|r| r.field_name == field_name)
    }

    /// Check if a field or relation uses `name`.
    pub fn has_name(&self, name: &str) -> bool {
        self.field(name).is_some() || self.relation(name).is_some()
    }

    /// Foreign-key relations.
    pub fn foreign_keys(&self) -> impl Iterator<Item = &RelationDef> {
        self.relations.iter().filter(|r| r.is_foreign_key())
    }

    /// Many-to-many relations.
    pub fn many_to_many(&self) -> impl Iterator<Item = &RelationDef> {
        self.relations.iter().filter(|r| !r.is_foreign_key())
    }

    /// Column names after `ID`: declared fields, then foreign-key columns.
    pub fn columns(&self) -> Vec<String> {
        self.fields
            .iter()
            .map(|f| f.name.clone())
            .chain(self.relations.iter().filter_map(RelationDef::column))
            .collect()
    }

    /// Validate names, defaults and uniqueness.
    pub fn validate(&self) -> Result<(), Error> {
        ident::validate(&self.table_name, "table")?;
        if self.table_name.eq_ignore_ascii_case(CATALOG_TABLE) {
            return Err(Error::configuration(format!(
                "table name {:?} is reserved for the schema catalog",
                self.table_name
            )));
        }
        for field in &self.fields {
            field.validate()?;
        }
        for relation in &self.relations {
            relation.validate()?;
        }

        // SQLite identifiers are case-insensitive.
        let mut seen = HashSet::new();
        let names = self
            .fields
            .iter()
            .map(|f| f.name.clone())
            .chain(self.relations.iter().map(|r| r.field_name.clone()))
            .chain(self.relations.iter().filter_map(RelationDef::column));
        for name in names {
            if !seen.insert(name.to_ascii_lowercase()) {
                return Err(Error::configuration(format!(
                    "duplicate field or column `{name}` in `{}`",
                    self.table_name
                )));
            }
        }
        Ok(())
    }
}

/// Types that declare an entity.
///
/// ```ignore
/// struct Person;
///
/// impl Entity for Person {
///     fn schema(def: EntityDef) -> EntityDef {
///         def.with_field(FieldDef::varchar("name", 50))
///             .with_field(FieldDef::integer("age").nullable(true))
///     }
/// }
/// ```
pub trait Entity {
    /// Add fields and relations to `def`.
    fn schema(def: EntityDef) -> EntityDef;

    /// Table name; defaults to the lower-cased type name.
    fn table_name() -> String {
        default_table_name::<Self>()
    }

    /// The complete definition.
    fn definition() -> EntityDef {
        Self::schema(EntityDef::new(Self::table_name()))
    }
}

/// Lower-cased type name of `T`, without module path or generic arguments.
pub fn default_table_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::")
        .next()
        .unwrap_or(base)
        .to_ascii_lowercase()
}
