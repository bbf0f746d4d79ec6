//! catalorm core - field types, schema catalog, relation resolver and model
//! engine over SQLite.
//!
//! This crate provides the engine behind the `catalorm` facade. Entity
//! schemas are stored in a catalog table inside the same database, so any
//! entity can be reconstructed from its table name.

pub mod catalog;
pub mod error;
pub mod field;
pub mod ident;
pub mod migration;
pub mod model;
pub mod query;
pub mod relation;
pub mod storage;
pub mod transport;
pub mod value;

pub use catalog::{
    default_table_name, Entity, EntityDef, FieldDef, FieldKind, RelationDef, RelationKind,
    SchemaCatalog, CATALOG_TABLE,
};
pub use error::Error;
pub use field::Field;
pub use model::{Model, ModelState, UNSAVED};
pub use query::QueryOptions;
pub use relation::JunctionTable;
pub use storage::{Row, Store, StoreConfig};
pub use value::Value;
