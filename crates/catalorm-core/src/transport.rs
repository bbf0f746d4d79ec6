//! Transport format: models as JSON records carrying their table and store.
//!
//! ```json
//! [{"table_name": "person", "store_name": "db.sqlite3", "datos": {"ID": 1, "name": "Ana"}}]
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as JsonValue};

use crate::error::Error;
use crate::model::Model;
use crate::storage::Store;

#[derive(Debug, Serialize, Deserialize)]
struct TransportRecord {
    table_name: String,
    store_name: String,
    datos: Map<String, JsonValue>,
}

/// Encode `models` as a JSON array of transport records.
pub fn serialize(models: &[Model]) -> Result<String, Error> {
    let records: Vec<TransportRecord> = models
        .iter()
        .map(|model| TransportRecord {
            table_name: model.table_name().to_string(),
            store_name: model.store().name().to_string(),
            datos: model.to_dict(),
        })
        .collect();
    serde_json::to_string(&records).map_err(|e| Error::Serialization(e.to_string()))
}

/// Decode transport records. Each record's store is opened next to `store`
/// and its schema is rebuilt from that store's catalog.
pub fn deserialize(store: &Store, json: &str) -> Result<Vec<Model>, Error> {
    let records: Vec<TransportRecord> =
        serde_json::from_str(json).map_err(|e| Error::Deserialization(e.to_string()))?;
    records
        .iter()
        .map(|record| {
            let store = store.sibling(&record.store_name)?;
            Model::from_dict(&store, &record.table_name, &record.datos)
        })
        .collect()
}

/// Field values of every model, as a JSON array.
pub fn to_array_dict(models: &[Model]) -> JsonValue {
    JsonValue::Array(
        models
            .iter()
            .map(|model| JsonValue::Object(model.to_dict()))
            .collect(),
    )
}

/// Remove every model. Returns `[{"ID": id, "success": true}, ...]` with the
/// identities the models had.
pub fn remove_rows(models: &mut [Model]) -> Result<JsonValue, Error> {
    let mut removed = Vec::with_capacity(models.len());
    for model in models.iter_mut() {
        let id = model.identity();
        model.remove()?;
        removed.push(json!({"ID": id, "success": true}));
    }
    Ok(JsonValue::Array(removed))
}
