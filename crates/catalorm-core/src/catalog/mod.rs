//! Schema catalog for catalorm.
//!
//! Field kinds, field/relation/entity definitions, their descriptor and blob
//! codecs, and the catalog table that stores them.

mod catalog;
mod entity;
mod field;
mod relation;
mod schema;
mod types;

pub use catalog::{ensure_in, fetch_in, remove_in, store_in, SchemaCatalog, CATALOG_TABLE};
pub use entity::{default_table_name, Entity, EntityDef};
pub use field::FieldDef;
pub use relation::{RelationDef, RelationKind};
pub use types::{kind_names, FieldKind, DEFAULT_EMAIL_LENGTH};
