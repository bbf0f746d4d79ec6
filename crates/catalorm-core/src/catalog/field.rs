//! Field definitions for entities.

use serde_json::{Map, Value as JsonValue};

use super::types::{FieldKind, DEFAULT_EMAIL_LENGTH};
use crate::error::Error;
use crate::ident::{self, ID_COLUMN};
use crate::value::Value;

/// A field definition within an entity: name, kind, nullability and default.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    /// Field (and column) name.
    pub name: String,
    /// Field kind with its options.
    pub kind: FieldKind,
    /// Whether the column accepts NULL.
    pub nullable: bool,
    /// Default value, coerced to the kind when used.
    pub default: Option<Value>,
}

impl FieldDef {
    /// Create a new non-nullable field.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: false,
            default: None,
        }
    }

    /// Create a nullable field.
    pub fn optional(name: impl Into<String>, kind: FieldKind) -> Self {
        Self::new(name, kind).nullable(true)
    }

    /// Unbounded text field.
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text)
    }

    /// Text field limited to `max_length` characters.
    pub fn varchar(name: impl Into<String>, max_length: u32) -> Self {
        Self::new(name, FieldKind::VarChar { max_length })
    }

    /// Email field with the default length limit.
    pub fn email(name: impl Into<String>) -> Self {
        Self::new(
            name,
            FieldKind::Email {
                max_length: DEFAULT_EMAIL_LENGTH,
            },
        )
    }

    /// Fixed-point decimal field.
    pub fn decimal(name: impl Into<String>, max_digits: u32, decimal_places: u32) -> Self {
        Self::new(
            name,
            FieldKind::Decimal {
                max_digits,
                decimal_places,
            },
        )
    }

    /// Date field, filled with today on first persist.
    pub fn date(name: impl Into<String>) -> Self {
        Self::new(
            name,
            FieldKind::Date {
                auto_now: false,
                auto_now_add: true,
            },
        )
    }

    /// Date-time field without automatic values.
    pub fn datetime(name: impl Into<String>) -> Self {
        Self::new(
            name,
            FieldKind::DateTime {
                auto_now: false,
                auto_now_add: false,
            },
        )
    }

    /// Boolean field.
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    /// Integer field.
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    /// Floating point field.
    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Float)
    }

    /// Generated UUID field.
    pub fn uuid(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Uuid)
    }

    /// Set nullability.
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Set the default value.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Set the `auto_now` / `auto_now_add` flags of a date or date-time field.
    /// Other kinds are left unchanged.
    pub fn with_auto(mut self, now: bool, now_add: bool) -> Self {
        match &mut self.kind {
            FieldKind::Date {
                auto_now,
                auto_now_add,
            }
            | FieldKind::DateTime {
                auto_now,
                auto_now_add,
            } => {
                *auto_now = now;
                *auto_now_add = now_add;
            }
            _ => {}
        }
        self
    }

    /// The default coerced to this field's kind, or null.
    pub fn default_value(&self) -> Result<Value, Error> {
        match &self.default {
            Some(default) => self.kind.coerce(default.clone()),
            None => Ok(Value::Null),
        }
    }

    /// Check the name and the default.
    pub fn validate(&self) -> Result<(), Error> {
        ident::validate(&self.name, "field")?;
        if self.name.eq_ignore_ascii_case(ID_COLUMN) {
            return Err(Error::configuration(format!(
                "field name {:?} is reserved for the identity column",
                self.name
            )));
        }
        self.default_value().map_err(|e| {
            Error::configuration(format!("invalid default for field `{}`: {e}", self.name))
        })?;
        Ok(())
    }

    /// Column definition used in CREATE / ALTER TABLE, without the name:
    /// `TYPE NOT NULL|NULL [DEFAULT literal]`.
    pub fn project_sql_type(&self) -> String {
        if self.kind == FieldKind::Uuid {
            return "TEXT NOT NULL".to_string();
        }
        let mut sql = format!(
            "{} {}",
            self.kind.sql_type(),
            if self.nullable { "NULL" } else { "NOT NULL" }
        );
        if let Ok(default) = self.default_value() {
            if !default.is_null() {
                sql.push_str(" DEFAULT ");
                sql.push_str(&default.to_sql_literal());
            }
        }
        sql
    }

    /// Whether a column for this field can be added to a table that already
    /// has rows. UUID columns are always `NOT NULL` without a default.
    pub fn can_backfill(&self) -> bool {
        self.kind != FieldKind::Uuid && (self.nullable || self.default.is_some())
    }

    /// Encode as a flat JSON descriptor.
    pub fn to_descriptor(&self) -> JsonValue {
        let mut map = Map::new();
        map.insert("kind".into(), JsonValue::from(self.kind.name()));
        map.insert("field_name".into(), JsonValue::from(self.name.clone()));
        map.insert("nullable".into(), JsonValue::Bool(self.nullable));
        map.insert(
            "default".into(),
            self.default
                .as_ref()
                .map(Value::to_json)
                .unwrap_or(JsonValue::Null),
        );
        for (key, value) in self.kind.options() {
            map.insert(key.into(), value);
        }
        JsonValue::Object(map)
    }

    /// Build a field from a JSON descriptor through the kind registry.
    pub fn from_descriptor(descriptor: &JsonValue) -> Result<Self, Error> {
        let map = descriptor
            .as_object()
            .ok_or_else(|| Error::configuration("field descriptor is not an object"))?;
        let kind = FieldKind::from_descriptor(map)?;
        let name = map
            .get("field_name")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| Error::configuration("field descriptor has no `field_name`"))?;
        let nullable = map
            .get("nullable")
            .and_then(JsonValue::as_bool)
            .unwrap_or(false);
        let default = match map.get("default") {
            None | Some(JsonValue::Null) => None,
            Some(json) => Some(Value::from_json(json).map_err(|e| {
                Error::configuration(format!("invalid default for field `{name}`: {e}"))
            })?),
        };

        let field = Self {
            name: name.to_string(),
            kind,
            nullable,
            default,
        };
        field.validate()?;
        Ok(field)
    }
}
