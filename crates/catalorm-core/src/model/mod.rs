//! Model engine: entity instances bound to a store.
//!
//! A [`Model`] is one row of one entity table. It is created from a
//! definition ([`Model::declare`]), reconstructed from the schema catalog
//! ([`Model::open`]) or hydrated from query results ([`Model::find_all`]).
//! Declared entities only accept their own fields; models of tables without
//! a catalog entry are schema-less and accept any column.

mod evolution;
mod navigation;

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use crate::catalog::{self, Entity, EntityDef, FieldDef, FieldKind};
use crate::error::Error;
use crate::field::Field;
use crate::ident::{self, ID_COLUMN};
use crate::query::{statement, QueryOptions};
use crate::relation::{self, JunctionTable};
use crate::storage::{Row, Store};
use crate::value::Value;

/// Identity of a model that has not been persisted.
pub const UNSAVED: i64 = -1;

/// Lifecycle state of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    /// No schema: the table has no catalog entry.
    Uninitialized,
    /// Schema known, not persisted.
    SchemaResolved,
    /// Written by `save`.
    Persisted,
    /// Read from the store.
    Loaded,
}

/// One entity instance.
#[derive(Debug, Clone)]
pub struct Model {
    store: Store,
    table_name: String,
    schema: Option<EntityDef>,
    fields: IndexMap<String, Field>,
    junctions: HashMap<String, JunctionTable>,
    extras: IndexMap<String, Value>,
    identity: i64,
    projection: Option<Vec<String>>,
    state: ModelState,
}

impl Model {
    /// Declare an entity: create its table and junction tables if missing
    /// and register its definition in the catalog, in one transaction.
    pub fn declare(store: &Store, def: EntityDef) -> Result<Self, Error> {
        def.validate()?;
        let junctions = store.transaction(|conn| relation::install(conn, &def))?;
        debug!(table = %def.table_name, "entity declared");
        Ok(Self::with_schema(
            store,
            def,
            junctions.into_iter().collect(),
        ))
    }

    /// Declare the entity described by `E`.
    pub fn declare_entity<E: Entity>(store: &Store) -> Result<Self, Error> {
        Self::declare(store, E::definition())
    }

    /// Reconstruct the entity of `table` from the catalog. Without a catalog
    /// entry the model is schema-less.
    pub fn open(store: &Store, table: &str) -> Result<Self, Error> {
        ident::validate(table, "table")?;
        let connection = store.connection()?;
        catalog::ensure_in(&connection)?;
        match catalog::fetch_in(&connection, table)? {
            Some(def) => {
                let mut junctions = HashMap::new();
                for relation in def.many_to_many() {
                    if let Some(junction) = relation::find_junction(&connection, table, relation)? {
                        junctions.insert(relation.field_name.clone(), junction);
                    }
                }
                drop(connection);
                Ok(Self::with_schema(store, def, junctions))
            }
            None => Ok(Self {
                store: store.clone(),
                table_name: table.to_string(),
                schema: None,
                fields: IndexMap::new(),
                junctions: HashMap::new(),
                extras: IndexMap::new(),
                identity: UNSAVED,
                projection: None,
                state: ModelState::Uninitialized,
            }),
        }
    }

    /// Rebuild a model of `table` from field data shaped like
    /// [`to_dict`](Self::to_dict). Values are hydrated, not validated.
    pub fn from_dict(
        store: &Store,
        table: &str,
        data: &Map<String, JsonValue>,
    ) -> Result<Self, Error> {
        let mut model = Self::open(store, table)?;
        for (name, value) in data {
            model.assign(name, Value::from_json(value)?)?;
        }
        if model.is_saved() {
            model.state = ModelState::Loaded;
        }
        Ok(model)
    }

    fn with_schema(store: &Store, def: EntityDef, junctions: HashMap<String, JunctionTable>) -> Self {
        let mut model = Self {
            store: store.clone(),
            table_name: def.table_name.clone(),
            schema: Some(def),
            fields: IndexMap::new(),
            junctions,
            extras: IndexMap::new(),
            identity: UNSAVED,
            projection: None,
            state: ModelState::SchemaResolved,
        };
        model.reset_fields();
        model
    }

    fn reset_fields(&mut self) {
        self.fields.clear();
        if let Some(def) = &self.schema {
            for field in &def.fields {
                self.fields
                    .insert(field.name.clone(), Field::new(field.clone()));
            }
            for column in def.foreign_keys().filter_map(|r| r.column()) {
                let field = FieldDef::new(column.clone(), FieldKind::Integer).nullable(true);
                self.fields.insert(column, Field::new(field));
            }
        }
    }

    /// A fresh, unsaved instance of the same entity.
    pub fn blank(&self) -> Self {
        let mut model = Self {
            store: self.store.clone(),
            table_name: self.table_name.clone(),
            schema: self.schema.clone(),
            fields: IndexMap::new(),
            junctions: self.junctions.clone(),
            extras: IndexMap::new(),
            identity: UNSAVED,
            projection: None,
            state: if self.schema.is_some() {
                ModelState::SchemaResolved
            } else {
                ModelState::Uninitialized
            },
        };
        model.reset_fields();
        model
    }

    /// The store this model persists to.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Table name.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Entity definition, if the entity is declared.
    pub fn schema(&self) -> Option<&EntityDef> {
        self.schema.as_ref()
    }

    /// Identity, or [`UNSAVED`].
    pub fn identity(&self) -> i64 {
        self.identity
    }

    /// Check if the model has been persisted or loaded.
    pub fn is_saved(&self) -> bool {
        self.identity != UNSAVED
    }

    /// Lifecycle state.
    pub fn state(&self) -> ModelState {
        self.state
    }

    /// Columns projected by the query that produced this model, if any.
    pub fn projection(&self) -> Option<&[String]> {
        self.projection.as_deref()
    }

    /// Column names after `ID`: declared fields, foreign-key columns, then
    /// undeclared columns.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields
            .keys()
            .chain(self.extras.keys())
            .map(String::as_str)
            .collect()
    }

    /// Get a field value. `ID` yields the identity.
    pub fn get(&self, name: &str) -> Result<Value, Error> {
        if name == ID_COLUMN {
            return Ok(Value::Integer(self.identity));
        }
        if let Some(field) = self.fields.get(name) {
            return field.read();
        }
        self.extras
            .get(name)
            .cloned()
            .ok_or_else(|| self.unknown_field(name))
    }

    /// Set a field value through validation. Schema-less models accept any
    /// column name.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), Error> {
        if name.eq_ignore_ascii_case(ID_COLUMN) {
            return Err(Error::configuration(format!(
                "`{ID_COLUMN}` of `{}` is assigned by the store",
                self.table_name
            )));
        }
        if let Some(field) = self.fields.get_mut(name) {
            return field.validate_and_set(value);
        }
        if self.schema.is_some() {
            return Err(self.unknown_field(name));
        }
        ident::validate(name, "column")?;
        self.extras.insert(name.to_string(), value.into());
        Ok(())
    }

    /// Store a value read from the store or from a transport record.
    pub(crate) fn assign(&mut self, name: &str, value: Value) -> Result<(), Error> {
        if name == ID_COLUMN {
            self.identity = match FieldKind::Integer.coerce(value)? {
                Value::Integer(id) => id,
                _ => UNSAVED,
            };
            return Ok(());
        }
        match self.fields.get_mut(name) {
            Some(field) => field.hydrate(value),
            None => {
                self.extras.insert(name.to_string(), value);
                Ok(())
            }
        }
    }

    fn hydrate(&mut self, row: Row) -> Result<(), Error> {
        // Joined tables repeat column names; the entity's own come first.
        let mut seen = HashSet::new();
        for (column, value) in row.into_pairs() {
            if seen.insert(column.clone()) {
                self.assign(&column, value)?;
            }
        }
        self.state = ModelState::Loaded;
        Ok(())
    }

    /// Apply `updates`, then [`save`](Self::save).
    pub fn save_with<I, K, V>(&mut self, updates: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (name, value) in updates {
            self.set(name.as_ref(), value)?;
        }
        self.save()
    }

    /// Insert the model, or update it by identity once saved.
    ///
    /// Every column is validated before any SQL runs. A model produced by a
    /// projecting query only writes its projected columns. A projection that
    /// leaves out `ID` yields unsaved models, so saving one inserts a new row
    /// holding only the projected columns.
    pub fn save(&mut self) -> Result<(), Error> {
        for field in self.fields.values_mut() {
            field.stamp();
        }

        let projected = |name: &str| {
            self.projection
                .as_ref()
                .map_or(true, |columns| columns.iter().any(|c| c == name))
        };
        let mut columns = Vec::new();
        let mut params = Vec::new();
        for (name, field) in &self.fields {
            if projected(name) {
                columns.push(name.clone());
                params.push(field.read()?);
            }
        }
        for (name, value) in &self.extras {
            if projected(name) {
                columns.push(name.clone());
                params.push(value.clone());
            }
        }

        if self.is_saved() {
            if !columns.is_empty() {
                params.push(Value::Integer(self.identity));
                self.store
                    .execute(&statement::update(&self.table_name, &columns), &params)?;
            }
        } else {
            self.identity = self
                .store
                .insert(&statement::insert(&self.table_name, &columns), &params)?;
        }
        self.state = ModelState::Persisted;
        debug!(table = %self.table_name, id = self.identity, "saved");
        Ok(())
    }

    /// Load the row with identity `id`. Returns whether it exists.
    pub fn load_by_identity(&mut self, id: i64) -> Result<bool, Error> {
        let row = self
            .store
            .query_first(&statement::select_by_identity(&self.table_name), &[Value::Integer(id)])?;
        let Some(row) = row else {
            return Ok(false);
        };
        self.reset_fields();
        self.extras.clear();
        self.projection = None;
        self.hydrate(row)?;
        debug!(table = %self.table_name, id, "loaded");
        Ok(true)
    }

    /// Load the first row matching `options`. Returns whether one exists.
    pub fn load_first_matching(&mut self, options: &QueryOptions) -> Result<bool, Error> {
        let options = options.clone().limit(1);
        let (sql, params) = statement::select(&self.table_name, &options)?;
        let Some(row) = self.store.query_first(&sql, &params)? else {
            return Ok(false);
        };
        self.reset_fields();
        self.extras.clear();
        self.identity = UNSAVED;
        self.projection = options.projection();
        self.hydrate(row)?;
        Ok(true)
    }

    /// All rows matching `options`, each as a fresh instance of this entity.
    pub fn find_all(&self, options: &QueryOptions) -> Result<Vec<Model>, Error> {
        let (sql, params) = statement::select(&self.table_name, options)?;
        let rows = self.store.query(&sql, &params)?;
        let projection = options.projection();

        rows.into_iter()
            .map(|row| {
                let mut model = self.blank();
                model.projection = projection.clone();
                model.hydrate(row)?;
                Ok(model)
            })
            .collect()
    }

    /// Run a SELECT written by the caller and hydrate each row into a fresh
    /// instance of this entity. Rows without an `ID` column stay unsaved.
    pub fn select(&self, sql: &str, params: &[Value]) -> Result<Vec<Model>, Error> {
        let rows = self.store.query(sql, params)?;
        rows.into_iter()
            .map(|row| {
                let mut model = self.blank();
                model.hydrate(row)?;
                Ok(model)
            })
            .collect()
    }

    /// Delete the row of this model. Unsaved models issue no SQL.
    pub fn remove(&mut self) -> Result<(), Error> {
        if self.is_saved() {
            self.store.execute(
                &statement::delete_by_identity(&self.table_name),
                &[Value::Integer(self.identity)],
            )?;
            debug!(table = %self.table_name, id = self.identity, "removed");
        }
        self.identity = UNSAVED;
        self.state = if self.schema.is_some() {
            ModelState::SchemaResolved
        } else {
            ModelState::Uninitialized
        };
        Ok(())
    }

    /// Delete every row of the table. Returns the number of rows deleted.
    pub fn clear(&self) -> Result<usize, Error> {
        self.store.execute(&statement::delete_all(&self.table_name), &[])
    }

    /// Field values as a JSON object: `ID` once saved, then every non-null
    /// value, restricted to the projection when there is one.
    pub fn to_dict(&self) -> Map<String, JsonValue> {
        let mut map = Map::new();
        if self.identity > 0 {
            map.insert(ID_COLUMN.to_string(), JsonValue::from(self.identity));
        }
        let projected = |name: &str| {
            self.projection
                .as_ref()
                .map_or(true, |columns| columns.iter().any(|c| c == name))
        };

        let fields = self
            .fields
            .iter()
            .filter(|(name, _)| projected(name))
            .filter_map(|(name, field)| field.read().ok().map(|value| (name, value)));
        let extras = self
            .extras
            .iter()
            .filter(|(name, _)| projected(name))
            .map(|(name, value)| (name, value.clone()));
        for (name, value) in fields.chain(extras) {
            if value.is_null() || value.as_str() == Some("None") {
                continue;
            }
            map.insert(name.clone(), value.to_json());
        }
        map
    }

    /// [`to_dict`](Self::to_dict) as a JSON value.
    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(self.to_dict())
    }

    fn unknown_field(&self, name: &str) -> Error {
        Error::UnknownField {
            table: self.table_name.clone(),
            field: name.to_string(),
        }
    }
}
