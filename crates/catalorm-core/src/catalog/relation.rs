//! Relation definitions between entities.

use serde_json::{json, Value as JsonValue};

use crate::error::Error;
use crate::ident::{self, ID_COLUMN};

/// Kind of a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// Many-to-one: an `ID<field>` column on the owner references the target.
    ForeignKey,
    /// Many-to-many through a junction table.
    ManyToMany,
}

impl RelationKind {
    /// Descriptor `class_name` of this kind.
    pub fn class_name(&self) -> &'static str {
        match self {
            RelationKind::ForeignKey => "ForeignKey",
            RelationKind::ManyToMany => "ManyToMany",
        }
    }

    fn from_class_name(name: &str) -> Option<Self> {
        match name {
            "ForeignKey" => Some(RelationKind::ForeignKey),
            "ManyToMany" => Some(RelationKind::ManyToMany),
            _ => None,
        }
    }
}

/// A relation declared on an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDef {
    /// Relation kind.
    pub kind: RelationKind,
    /// Field name on the owning entity.
    pub field_name: String,
    /// Target table.
    pub target: String,
}

impl RelationDef {
    /// Create a foreign-key relation from `field_name` to `target`.
    pub fn foreign_key(field_name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            kind: RelationKind::ForeignKey,
            field_name: field_name.into(),
            target: target.into(),
        }
    }

    /// Create a many-to-many relation from `field_name` to `target`.
    pub fn many_to_many(field_name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            kind: RelationKind::ManyToMany,
            field_name: field_name.into(),
            target: target.into(),
        }
    }

    /// Check if this is a foreign key.
    pub fn is_foreign_key(&self) -> bool {
        self.kind == RelationKind::ForeignKey
    }

    /// Column contributed to the owner's table, for foreign keys.
    pub fn column(&self) -> Option<String> {
        self.is_foreign_key()
            .then(|| ident::relation_column(&self.field_name))
    }

    /// Check the field and target names.
    pub fn validate(&self) -> Result<(), Error> {
        ident::validate(&self.field_name, "relation field")?;
        ident::validate(&self.target, "relation target")?;
        if self.field_name.eq_ignore_ascii_case(ID_COLUMN) {
            return Err(Error::configuration(format!(
                "relation field name {:?} is reserved for the identity column",
                self.field_name
            )));
        }
        Ok(())
    }

    /// Encode as a JSON descriptor.
    pub fn to_descriptor(&self) -> JsonValue {
        json!({
            "class_name": self.kind.class_name(),
            "field_name": self.field_name,
            "target": self.target,
        })
    }

    /// Decode a JSON descriptor.
    pub fn from_descriptor(descriptor: &JsonValue) -> Result<Self, Error> {
        let text = |key: &str| {
            descriptor
                .get(key)
                .and_then(JsonValue::as_str)
                .ok_or_else(|| Error::configuration(format!("relation descriptor has no `{key}`")))
        };
        let class_name = text("class_name")?;
        let kind = RelationKind::from_class_name(class_name).ok_or_else(|| {
            Error::configuration(format!("unknown relation class {class_name:?}"))
        })?;

        let relation = Self {
            kind,
            field_name: text("field_name")?.to_string(),
            target: text("target")?.to_string(),
        };
        relation.validate()?;
        Ok(relation)
    }
}
