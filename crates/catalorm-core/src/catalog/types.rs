//! Field kinds: value domains, coercion rules and SQL column types.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{Map, Value as JsonValue};

use crate::error::Error;
use crate::value::{parse_date, parse_datetime, parse_decimal, Value};

/// Default `max_length` of an email field.
pub const DEFAULT_EMAIL_LENGTH: u32 = 254;

/// The closed set of field kinds, with their kind-specific options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Unbounded text.
    Text,
    /// Text limited to `max_length` characters.
    VarChar {
        /// Maximum number of characters.
        max_length: u32,
    },
    /// Email address; must contain `@` and `.`.
    Email {
        /// Maximum number of characters.
        max_length: u32,
    },
    /// Fixed-point decimal.
    Decimal {
        /// Total number of digits.
        max_digits: u32,
        /// Digits after the decimal point.
        decimal_places: u32,
    },
    /// Calendar date.
    Date {
        /// Replace with today on every read.
        auto_now: bool,
        /// Fill with today while empty.
        auto_now_add: bool,
    },
    /// Date and time.
    DateTime {
        /// Replace with now on every read.
        auto_now: bool,
        /// Fill with now while empty.
        auto_now_add: bool,
    },
    /// Boolean stored as 0/1.
    Boolean,
    /// 64-bit integer.
    Integer,
    /// Floating point.
    Float,
    /// Generated UUID; assigned values are ignored.
    Uuid,
}

impl FieldKind {
    /// Descriptor name of this kind.
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Text => "Text",
            FieldKind::VarChar { .. } => "VarChar",
            FieldKind::Email { .. } => "Email",
            FieldKind::Decimal { .. } => "Decimal",
            FieldKind::Date { .. } => "Date",
            FieldKind::DateTime { .. } => "DateTime",
            FieldKind::Boolean => "Boolean",
            FieldKind::Integer => "Integer",
            FieldKind::Float => "Float",
            FieldKind::Uuid => "UUID",
        }
    }

    /// Column type, without nullability or default.
    pub fn sql_type(&self) -> String {
        match self {
            FieldKind::Text | FieldKind::Uuid => "TEXT".to_string(),
            FieldKind::VarChar { max_length } | FieldKind::Email { max_length } => {
                format!("VARCHAR({max_length})")
            }
            FieldKind::Decimal {
                max_digits,
                decimal_places,
            } => format!("DECIMAL({max_digits},{decimal_places})"),
            FieldKind::Date { .. } => "DATE".to_string(),
            FieldKind::DateTime { .. } => "DATETIME".to_string(),
            FieldKind::Boolean => "BOOL".to_string(),
            FieldKind::Integer => "INTEGER".to_string(),
            FieldKind::Float => "REAL".to_string(),
        }
    }

    /// Check if values of this kind are filled in automatically on persist.
    pub fn is_auto_timestamp(&self) -> bool {
        matches!(
            self,
            FieldKind::Date { auto_now, auto_now_add } | FieldKind::DateTime { auto_now, auto_now_add }
                if *auto_now || *auto_now_add
        )
    }

    /// Maximum number of characters, for text kinds that have one.
    pub fn max_length(&self) -> Option<u32> {
        match self {
            FieldKind::VarChar { max_length } | FieldKind::Email { max_length } => {
                Some(*max_length)
            }
            _ => None,
        }
    }

    /// Coerce `value` into this kind's value domain.
    ///
    /// Null passes through unchanged. Booleans collapse to `0` / `1` by
    /// truthiness. Empty text becomes null for numeric and temporal kinds.
    pub fn coerce(&self, value: Value) -> Result<Value, Error> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        let coerced = match self {
            FieldKind::Text
            | FieldKind::VarChar { .. }
            | FieldKind::Email { .. }
            | FieldKind::Uuid => match &value {
                Value::Text(_) => Some(value.clone()),
                other => Some(Value::Text(other.to_string())),
            },
            FieldKind::Boolean => Some(Value::from(value.is_truthy())),
            FieldKind::Integer => match &value {
                Value::Integer(_) => Some(value.clone()),
                Value::Real(f) if f.fract() == 0.0 => f.to_i64().map(Value::Integer),
                Value::Decimal(d) if d.fract().is_zero() => d.to_i64().map(Value::Integer),
                Value::Text(s) if s.trim().is_empty() => Some(Value::Null),
                Value::Text(s) => s.trim().parse::<i64>().ok().map(Value::Integer),
                _ => None,
            },
            FieldKind::Float => match &value {
                Value::Real(_) => Some(value.clone()),
                Value::Integer(i) => Some(Value::Real(*i as f64)),
                Value::Decimal(d) => d.to_f64().map(Value::Real),
                Value::Text(s) if s.trim().is_empty() => Some(Value::Null),
                Value::Text(s) => s.trim().parse::<f64>().ok().map(Value::Real),
                _ => None,
            },
            FieldKind::Decimal { .. } => match &value {
                Value::Decimal(_) => Some(value.clone()),
                Value::Integer(i) => Some(Value::Decimal(Decimal::from(*i))),
                Value::Real(f) if f.is_finite() => parse_decimal(&f.to_string()).map(Value::Decimal),
                Value::Text(s) if s.trim().is_empty() => Some(Value::Null),
                Value::Text(s) => parse_decimal(s).map(Value::Decimal),
                _ => None,
            },
            FieldKind::Date { .. } => match &value {
                Value::Date(_) => Some(value.clone()),
                Value::DateTime(dt) => Some(Value::Date(dt.date())),
                Value::Text(s) if s.trim().is_empty() => Some(Value::Null),
                Value::Text(s) => parse_date(s).map(Value::Date),
                _ => None,
            },
            FieldKind::DateTime { .. } => match &value {
                Value::DateTime(_) => Some(value.clone()),
                Value::Date(d) => d.and_hms_opt(0, 0, 0).map(Value::DateTime),
                Value::Text(s) if s.trim().is_empty() => Some(Value::Null),
                Value::Text(s) => parse_datetime(s).map(Value::DateTime),
                _ => None,
            },
        };
        coerced.ok_or_else(|| {
            Error::validation(format!("cannot store {value:?} in a {} field", self.name()))
        })
    }

    /// Kind-specific options, as written into a field descriptor.
    pub(crate) fn options(&self) -> Vec<(&'static str, JsonValue)> {
        match self {
            FieldKind::VarChar { max_length } | FieldKind::Email { max_length } => {
                vec![("max_length", JsonValue::from(*max_length))]
            }
            FieldKind::Decimal {
                max_digits,
                decimal_places,
            } => vec![
                ("max_digits", JsonValue::from(*max_digits)),
                ("decimal_places", JsonValue::from(*decimal_places)),
            ],
            FieldKind::Date {
                auto_now,
                auto_now_add,
            }
            | FieldKind::DateTime {
                auto_now,
                auto_now_add,
            } => vec![
                ("auto_now", JsonValue::Bool(*auto_now)),
                ("auto_now_add", JsonValue::Bool(*auto_now_add)),
            ],
            _ => Vec::new(),
        }
    }

    /// Build a kind from a field descriptor by looking its `kind` up in the
    /// constructor registry.
    pub fn from_descriptor(descriptor: &Map<String, JsonValue>) -> Result<Self, Error> {
        let name = descriptor
            .get("kind")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| Error::configuration("field descriptor has no `kind`"))?;
        let constructor = KIND_REGISTRY
            .iter()
            .find(|(kind, _)| *kind == name)
            .map(|(_, constructor)| constructor)
            .ok_or_else(|| Error::configuration(format!("unknown field kind {name:?}")))?;
        constructor(descriptor)
    }
}

type KindConstructor = fn(&Map<String, JsonValue>) -> Result<FieldKind, Error>;

/// Registry of field kind constructors, keyed by descriptor name.
const KIND_REGISTRY: &[(&str, KindConstructor)] = &[
    ("Text", text_kind),
    ("VarChar", varchar_kind),
    ("Email", email_kind),
    ("Decimal", decimal_kind),
    ("Date", date_kind),
    ("DateTime", datetime_kind),
    ("Boolean", boolean_kind),
    ("Integer", integer_kind),
    ("Float", float_kind),
    ("UUID", uuid_kind),
];

/// Names of every registered field kind.
pub fn kind_names() -> impl Iterator<Item = &'static str> {
    KIND_REGISTRY.iter().map(|(name, _)| *name)
}

fn required_u32(descriptor: &Map<String, JsonValue>, key: &str, kind: &str) -> Result<u32, Error> {
    descriptor
        .get(key)
        .and_then(JsonValue::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| Error::configuration(format!("{kind} field descriptor needs `{key}`")))
}

fn optional_u32(
    descriptor: &Map<String, JsonValue>,
    key: &str,
    kind: &str,
    default: u32,
) -> Result<u32, Error> {
    match descriptor.get(key) {
        None | Some(JsonValue::Null) => Ok(default),
        Some(_) => required_u32(descriptor, key, kind),
    }
}

fn flag(descriptor: &Map<String, JsonValue>, key: &str, default: bool) -> bool {
    descriptor
        .get(key)
        .and_then(JsonValue::as_bool)
        .unwrap_or(default)
}

fn text_kind(_: &Map<String, JsonValue>) -> Result<FieldKind, Error> {
    Ok(FieldKind::Text)
}

fn varchar_kind(descriptor: &Map<String, JsonValue>) -> Result<FieldKind, Error> {
    Ok(FieldKind::VarChar {
        max_length: required_u32(descriptor, "max_length", "VarChar")?,
    })
}

fn email_kind(descriptor: &Map<String, JsonValue>) -> Result<FieldKind, Error> {
    Ok(FieldKind::Email {
        max_length: optional_u32(descriptor, "max_length", "Email", DEFAULT_EMAIL_LENGTH)?,
    })
}

fn decimal_kind(descriptor: &Map<String, JsonValue>) -> Result<FieldKind, Error> {
    let max_digits = required_u32(descriptor, "max_digits", "Decimal")?;
    let decimal_places = required_u32(descriptor, "decimal_places", "Decimal")?;
    if decimal_places > max_digits || decimal_places > 28 {
        return Err(Error::configuration(format!(
            "Decimal({max_digits},{decimal_places}) has more decimal places than digits"
        )));
    }
    Ok(FieldKind::Decimal {
        max_digits,
        decimal_places,
    })
}

fn date_kind(descriptor: &Map<String, JsonValue>) -> Result<FieldKind, Error> {
    Ok(FieldKind::Date {
        auto_now: flag(descriptor, "auto_now", false),
        auto_now_add: flag(descriptor, "auto_now_add", true),
    })
}

fn datetime_kind(descriptor: &Map<String, JsonValue>) -> Result<FieldKind, Error> {
    Ok(FieldKind::DateTime {
        auto_now: flag(descriptor, "auto_now", false),
        auto_now_add: flag(descriptor, "auto_now_add", false),
    })
}

fn boolean_kind(_: &Map<String, JsonValue>) -> Result<FieldKind, Error> {
    Ok(FieldKind::Boolean)
}

fn integer_kind(_: &Map<String, JsonValue>) -> Result<FieldKind, Error> {
    Ok(FieldKind::Integer)
}

fn float_kind(_: &Map<String, JsonValue>) -> Result<FieldKind, Error> {
    Ok(FieldKind::Float)
}

fn uuid_kind(_: &Map<String, JsonValue>) -> Result<FieldKind, Error> {
    Ok(FieldKind::Uuid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn descriptor(value: JsonValue) -> Map<String, JsonValue> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_sql_types() {
        assert_eq!(FieldKind::VarChar { max_length: 50 }.sql_type(), "VARCHAR(50)");
        assert_eq!(
            FieldKind::Decimal {
                max_digits: 10,
                decimal_places: 2
            }
            .sql_type(),
            "DECIMAL(10,2)"
        );
        assert_eq!(FieldKind::Boolean.sql_type(), "BOOL");
        assert_eq!(FieldKind::Float.sql_type(), "REAL");
        assert_eq!(FieldKind::Uuid.sql_type(), "TEXT");
    }

    #[test]
    fn test_registry_lookup() {
        let kind = FieldKind::from_descriptor(&descriptor(json!({
            "kind": "VarChar", "max_length": 30
        })))
        .unwrap();
        assert_eq!(kind, FieldKind::VarChar { max_length: 30 });

        let email = FieldKind::from_descriptor(&descriptor(json!({"kind": "Email"}))).unwrap();
        assert_eq!(email.max_length(), Some(DEFAULT_EMAIL_LENGTH));

        let date = FieldKind::from_descriptor(&descriptor(json!({"kind": "Date"}))).unwrap();
        assert!(date.is_auto_timestamp());

        assert_eq!(kind_names().count(), 10);
    }

    #[test]
    fn test_registry_errors() {
        let unknown = FieldKind::from_descriptor(&descriptor(json!({"kind": "Money"})));
        assert!(unknown.unwrap_err().is_configuration());

        let missing = FieldKind::from_descriptor(&descriptor(json!({"kind": "VarChar"})));
        assert!(missing.unwrap_err().is_configuration());

        let no_kind = FieldKind::from_descriptor(&descriptor(json!({"field_name": "x"})));
        assert!(no_kind.unwrap_err().is_configuration());
    }

    #[test]
    fn test_coercion() {
        assert_eq!(
            FieldKind::Integer.coerce(Value::from("42")).unwrap(),
            Value::Integer(42)
        );
        assert_eq!(
            FieldKind::Integer.coerce(Value::Real(3.0)).unwrap(),
            Value::Integer(3)
        );
        assert!(FieldKind::Integer.coerce(Value::Real(3.5)).is_err());
        assert!(FieldKind::Integer.coerce(Value::from("abc")).is_err());
        assert!(FieldKind::Integer.coerce(Value::Real(1e20)).is_err());
        assert!(FieldKind::Integer.coerce(Value::Real(f64::INFINITY)).is_err());
        assert_eq!(
            FieldKind::Integer.coerce(Value::Real(-4096.0)).unwrap(),
            Value::Integer(-4096)
        );

        assert_eq!(
            FieldKind::Float.coerce(Value::Integer(2)).unwrap(),
            Value::Real(2.0)
        );
        assert_eq!(
            FieldKind::Text.coerce(Value::Integer(7)).unwrap(),
            Value::from("7")
        );
        assert_eq!(
            FieldKind::Boolean.coerce(Value::from("yes")).unwrap(),
            Value::Integer(1)
        );
        assert_eq!(
            FieldKind::Boolean.coerce(Value::Integer(0)).unwrap(),
            Value::Integer(0)
        );
        assert_eq!(FieldKind::Integer.coerce(Value::Null).unwrap(), Value::Null);

        let decimal = FieldKind::Decimal {
            max_digits: 6,
            decimal_places: 2,
        };
        assert_eq!(
            decimal.coerce(Value::Real(12.5)).unwrap(),
            Value::Decimal(Decimal::new(125, 1))
        );
    }
}
