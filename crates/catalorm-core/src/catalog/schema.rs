//! Catalog blob codec.
//!
//! An entity's fields and relations are stored as base64 (standard alphabet)
//! of a JSON document `{"fields": [...], "relationship": [...]}` holding one
//! descriptor per field and per relation.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::entity::EntityDef;
use super::field::FieldDef;
use super::relation::RelationDef;
use crate::error::Error;

#[derive(Debug, Default, Serialize, Deserialize)]
struct SchemaDocument {
    #[serde(default)]
    fields: Vec<JsonValue>,
    #[serde(default)]
    relationship: Vec<JsonValue>,
}

impl EntityDef {
    /// Encode fields and relations as a catalog blob.
    pub fn to_blob(&self) -> Result<String, Error> {
        let document = SchemaDocument {
            fields: self.fields.iter().map(FieldDef::to_descriptor).collect(),
            relationship: self
                .relations
                .iter()
                .map(RelationDef::to_descriptor)
                .collect(),
        };
        let json =
            serde_json::to_vec(&document).map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(STANDARD.encode(json))
    }

    /// Rebuild the definition of `table_name` from a catalog blob.
    pub fn from_blob(table_name: &str, blob: &str) -> Result<Self, Error> {
        let json = STANDARD
            .decode(blob.trim())
            .map_err(|e| Error::Deserialization(format!("catalog blob of `{table_name}`: {e}")))?;
        let document: SchemaDocument = serde_json::from_slice(&json)
            .map_err(|e| Error::Deserialization(format!("catalog blob of `{table_name}`: {e}")))?;

        let mut def = EntityDef::new(table_name);
        for descriptor in &document.fields {
            def.fields.push(FieldDef::from_descriptor(descriptor)?);
        }
        for descriptor in &document.relationship {
            def.relations.push(RelationDef::from_descriptor(descriptor)?);
        }
        Ok(def)
    }
}
