//! Runtime values shared by fields, statements, rows and JSON.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;

use crate::error::Error;

/// Storage format for `DATE` values.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Storage format for `DATETIME` values.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

const DATETIME_INPUT_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// A runtime value.
///
/// Booleans have no variant of their own: they live in the integer domain as
/// `0` / `1`, which is also how SQLite stores them.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent value.
    #[default]
    Null,
    /// 64-bit signed integer (also booleans and identities).
    Integer(i64),
    /// 64-bit floating point.
    Real(f64),
    /// UTF-8 text.
    Text(String),
    /// Fixed-point decimal.
    Decimal(Decimal),
    /// Calendar date.
    Date(NaiveDate),
    /// Date and time without timezone.
    DateTime(NaiveDateTime),
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Null or the empty string.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Truthiness used by boolean coercion.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Integer(i) => *i != 0,
            Value::Real(f) => *f != 0.0,
            Value::Text(s) => !s.is_empty(),
            Value::Decimal(d) => !d.is_zero(),
            Value::Date(_) | Value::DateTime(_) => true,
        }
    }

    /// Try to get as i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Real(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            Value::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }

    /// Try to get as string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as decimal.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// Try to get as date.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Try to get as datetime.
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Render as a SQL literal. Text and temporal values are single-quoted
    /// with embedded quotes doubled; numerics are bare.
    pub fn to_sql_literal(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Real(f) => f.to_string(),
            Value::Decimal(d) => d.to_string(),
            Value::Text(s) => quote_literal(s),
            Value::Date(_) | Value::DateTime(_) => quote_literal(&self.to_string()),
        }
    }

    /// Convert to a JSON value.
    ///
    /// Decimals become JSON numbers and therefore pass through `f64`.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Integer(i) => JsonValue::from(*i),
            Value::Real(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::Decimal(d) => d
                .to_f64()
                .and_then(serde_json::Number::from_f64)
                .map(JsonValue::Number)
                .unwrap_or_else(|| JsonValue::String(d.to_string())),
            Value::Text(s) => JsonValue::String(s.clone()),
            Value::Date(_) | Value::DateTime(_) => JsonValue::String(self.to_string()),
        }
    }

    /// Convert from a JSON scalar.
    pub fn from_json(json: &JsonValue) -> Result<Self, Error> {
        match json {
            JsonValue::Null => Ok(Value::Null),
            JsonValue::Bool(b) => Ok(Value::from(*b)),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Ok(Value::Integer(i)),
                None => n
                    .as_f64()
                    .map(Value::Real)
                    .ok_or_else(|| Error::Deserialization(format!("unsupported number {n}"))),
            },
            JsonValue::String(s) => Ok(Value::Text(s.clone())),
            other => Err(Error::Deserialization(format!(
                "expected a scalar value, got {other}"
            ))),
        }
    }
}

fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Parse a `DATE` value.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .ok()
        .or_else(|| parse_datetime(text).map(|dt| dt.date()))
}

/// Parse a `DATETIME` value. Accepts space or `T` separators, optional
/// seconds fraction, RFC 3339 offsets and bare dates (midnight).
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    DATETIME_INPUT_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.naive_local())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(text, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Parse a decimal from text or from the shortest representation of a float.
pub(crate) fn parse_decimal(text: &str) -> Option<Decimal> {
    let text = text.trim();
    Decimal::from_str(text)
        .ok()
        .or_else(|| Decimal::from_scientific(text).ok())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "None"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Value::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_FORMAT)),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Value::Real(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Decimal(_) | Value::Date(_) | Value::DateTime(_) => {
                ToSqlOutput::Owned(SqlValue::Text(self.to_string()))
            }
        })
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(cell: ValueRef<'_>) -> Self {
        match cell {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
                Value::Text(String::from_utf8_lossy(bytes).into_owned())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Real(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Integer(i64::from(b))
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emptiness_and_truthiness() {
        assert!(Value::Null.is_empty());
        assert!(Value::from("").is_empty());
        assert!(!Value::Integer(0).is_empty());

        assert!(!Value::Integer(0).is_truthy());
        assert!(Value::from("no").is_truthy());
        assert!(!Value::Real(0.0).is_truthy());
        assert_eq!(Value::from(true), Value::Integer(1));
    }

    #[test]
    fn test_sql_literals() {
        assert_eq!(Value::from("O'Hara").to_sql_literal(), "'O''Hara'");
        assert_eq!(Value::Integer(42).to_sql_literal(), "42");
        assert_eq!(Value::Null.to_sql_literal(), "NULL");

        let date = NaiveDate::from_ymd_opt(2017, 8, 29).unwrap();
        assert_eq!(Value::Date(date).to_sql_literal(), "'2017-08-29'");
    }

    #[test]
    fn test_datetime_parsing() {
        let expected = NaiveDate::from_ymd_opt(2017, 9, 2)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        assert_eq!(parse_datetime("2017-09-02 10:30:00"), Some(expected));
        assert_eq!(parse_datetime("2017-09-02T10:30:00"), Some(expected));
        assert_eq!(parse_datetime("2017-09-02 10:30"), Some(expected));
        assert_eq!(
            parse_datetime("2017-09-02"),
            NaiveDate::from_ymd_opt(2017, 9, 2).unwrap().and_hms_opt(0, 0, 0)
        );
        assert!(parse_datetime("yesterday").is_none());
        assert_eq!(
            parse_date("2017-09-02 10:30:00"),
            NaiveDate::from_ymd_opt(2017, 9, 2)
        );
    }

    #[test]
    fn test_json_conversion() {
        assert_eq!(Value::Integer(7).to_json(), JsonValue::from(7));
        assert_eq!(
            Value::from_json(&JsonValue::from("Ana")).unwrap(),
            Value::from("Ana")
        );
        assert_eq!(
            Value::from_json(&JsonValue::Bool(true)).unwrap(),
            Value::Integer(1)
        );
        assert!(Value::from_json(&serde_json::json!([1, 2])).is_err());

        let price = Decimal::new(1250, 2);
        assert_eq!(Value::Decimal(price).to_json(), serde_json::json!(12.5));
    }
}
