//! catalorm - an embedded ORM that keeps entity schemas inside the database.
//!
//! ```ignore
//! use catalorm::{Database, EntityDef, FieldDef, QueryOptions, StoreConfig};
//!
//! let db = Database::open(StoreConfig::new("data/app.sqlite3"))?;
//! let mut person = db.declare(
//!     EntityDef::new("person")
//!         .with_field(FieldDef::varchar("name", 50))
//!         .with_field(FieldDef::integer("age").nullable(true)),
//! )?;
//! person.save_with([("name", "Ana")])?;
//!
//! let found = db.model("person")?.find_all(&QueryOptions::new().filter("name = 'Ana'"))?;
//! ```

use tracing::info;

pub use catalorm_core::catalog::{self, default_table_name, Entity, FieldKind, RelationKind};
pub use catalorm_core::query::{self, QueryOptions};
pub use catalorm_core::storage::{self, Row, Store, StoreConfig};
pub use catalorm_core::{
    migration, transport, EntityDef, Error, FieldDef, JunctionTable, Model, ModelState,
    RelationDef, SchemaCatalog, Value, UNSAVED,
};

/// Handle to one database: its store and schema catalog.
#[derive(Debug, Clone)]
pub struct Database {
    store: Store,
    catalog: SchemaCatalog,
}

impl Database {
    /// Open (creating if needed) the database described by `config`.
    pub fn open(config: StoreConfig) -> Result<Self, Error> {
        let store = Store::open(config)?;
        let catalog = SchemaCatalog::open(&store)?;
        info!(store = store.name(), entities = catalog.tables()?.len(), "database opened");
        Ok(Self { store, catalog })
    }

    /// Get a reference to the store.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Get a reference to the schema catalog.
    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    /// Declare an entity and return an unsaved instance of it.
    pub fn declare(&self, def: EntityDef) -> Result<Model, Error> {
        Model::declare(&self.store, def)
    }

    /// Declare the entity described by `E`.
    pub fn declare_entity<E: Entity>(&self) -> Result<Model, Error> {
        Model::declare_entity::<E>(&self.store)
    }

    /// An unsaved instance of the entity stored in `table`.
    pub fn model(&self, table: &str) -> Result<Model, Error> {
        Model::open(&self.store, table)
    }

    /// Check whether `table` exists.
    pub fn table_exists(&self, table: &str) -> Result<bool, Error> {
        self.store.table_exists(table)
    }

    /// The registered definition of `table`.
    pub fn schema(&self, table: &str) -> Result<Option<EntityDef>, Error> {
        self.catalog.get(table)
    }

    /// Encode models as transport JSON.
    pub fn serialize(&self, models: &[Model]) -> Result<String, Error> {
        transport::serialize(models)
    }

    /// Decode transport JSON; stores are resolved next to this database.
    pub fn deserialize(&self, json: &str) -> Result<Vec<Model>, Error> {
        transport::deserialize(&self.store, json)
    }

    /// Drop every table, the catalog included, then recreate an empty
    /// catalog. Returns the number of tables dropped.
    pub fn drop_all(&self) -> Result<usize, Error> {
        let dropped = self.store.drop_all()?;
        SchemaCatalog::open(&self.store)?;
        Ok(dropped)
    }
}
