//! Live fields: a definition plus the current value.

use chrono::Local;
use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use crate::catalog::{FieldDef, FieldKind};
use crate::error::Error;
use crate::value::Value;

/// A field of a model instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    def: FieldDef,
    value: Value,
}

impl Field {
    /// Create a field holding its default (or null).
    pub fn new(def: FieldDef) -> Self {
        let value = def.default_value().unwrap_or(Value::Null);
        Self { def, value }
    }

    /// The field definition.
    pub fn def(&self) -> &FieldDef {
        &self.def
    }

    /// Field name.
    pub fn name(&self) -> &str {
        &self.def.name
    }

    /// Field kind.
    pub fn kind(&self) -> FieldKind {
        self.def.kind
    }

    /// The stored value, without read-time formatting.
    pub fn raw(&self) -> &Value {
        &self.value
    }

    /// Coerce and validate `value`, then store it.
    pub fn validate_and_set(&mut self, value: impl Into<Value>) -> Result<(), Error> {
        let kind = self.def.kind;
        if kind == FieldKind::Uuid {
            return Ok(());
        }
        let value = kind.coerce(value.into()).map_err(|e| self.context(e))?;

        if let (FieldKind::Email { .. }, Value::Text(s)) = (kind, &value) {
            if !s.is_empty() && !(s.contains('@') && s.contains('.')) {
                return Err(Error::validation(format!(
                    "field `{}`: {s:?} is not an email address",
                    self.def.name
                )));
            }
        }
        if value.is_empty() && !self.def.nullable && !kind.is_auto_timestamp() {
            return Err(self.empty_error());
        }
        if let (Some(max_length), Value::Text(s)) = (kind.max_length(), &value) {
            let length = s.chars().count();
            if length > max_length as usize {
                return Err(Error::validation(format!(
                    "field `{}`: {length} characters exceed max_length {max_length}",
                    self.def.name
                )));
            }
        }
        if let (
            FieldKind::Decimal {
                max_digits,
                decimal_places,
            },
            Value::Decimal(d),
        ) = (kind, &value)
        {
            let allowed = max_digits.saturating_sub(decimal_places);
            let digits = integral_digits(&round(*d, decimal_places));
            if digits > allowed {
                return Err(Error::validation(format!(
                    "field `{}`: {d} has more than {allowed} digits before the decimal point",
                    self.def.name
                )));
            }
        }

        self.value = value;
        Ok(())
    }

    /// Load a stored cell. Coerces without the emptiness check.
    pub fn hydrate(&mut self, value: Value) -> Result<(), Error> {
        self.value = self.def.kind.coerce(value).map_err(|e| self.context(e))?;
        Ok(())
    }

    /// The value after read-time formatting.
    ///
    /// UUID fields yield a fresh identifier on every read; `auto_now` yields
    /// the current date/time; `auto_now_add` yields it while the field is
    /// empty; decimals are rounded to `decimal_places`.
    pub fn read(&self) -> Result<Value, Error> {
        match self.def.kind {
            FieldKind::Uuid => return Ok(Value::Text(Uuid::new_v4().to_string())),
            FieldKind::Date {
                auto_now,
                auto_now_add,
            } if auto_now || (auto_now_add && self.value.is_empty()) => {
                return Ok(Value::Date(Local::now().date_naive()));
            }
            FieldKind::DateTime {
                auto_now,
                auto_now_add,
            } if auto_now || (auto_now_add && self.value.is_empty()) => {
                return Ok(Value::DateTime(Local::now().naive_local()));
            }
            _ => {}
        }

        if self.value.is_empty() && !self.def.nullable {
            return Err(self.empty_error());
        }
        match (self.def.kind, &self.value) {
            (FieldKind::Decimal { decimal_places, .. }, Value::Decimal(d)) => {
                Ok(Value::Decimal(round(*d, decimal_places)))
            }
            _ => Ok(self.value.clone()),
        }
    }

    /// Materialize automatic date/time values into the stored value.
    pub fn stamp(&mut self) {
        if self.def.kind.is_auto_timestamp() {
            if let Ok(now) = self.read() {
                self.value = now;
            }
        }
    }

    /// Column definition, see [`FieldDef::project_sql_type`].
    pub fn project_sql_type(&self) -> String {
        self.def.project_sql_type()
    }

    /// SQL literal of the read value.
    pub fn format_literal(&self) -> Result<String, Error> {
        Ok(self.read()?.to_sql_literal())
    }

    fn empty_error(&self) -> Error {
        Error::validation(format!("field `{}` cannot be empty", self.def.name))
    }

    fn context(&self, error: Error) -> Error {
        match error {
            Error::Validation(message) => {
                Error::Validation(format!("field `{}`: {message}", self.def.name))
            }
            other => other,
        }
    }
}

fn round(value: Decimal, decimal_places: u32) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(decimal_places);
    rounded
}

fn integral_digits(value: &Decimal) -> u32 {
    let integral = value.trunc().abs().normalize();
    if integral.is_zero() {
        0
    } else {
        integral.to_string().chars().filter(char::is_ascii_digit).count() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_required_field() {
        let mut field = Field::new(FieldDef::varchar("name", 50));
        assert!(field.read().unwrap_err().is_validation());
        assert!(field.validate_and_set("").unwrap_err().is_validation());
        assert!(field.validate_and_set(Value::Null).unwrap_err().is_validation());

        field.validate_and_set("Ana").unwrap();
        assert_eq!(field.read().unwrap(), Value::from("Ana"));
    }

    #[test]
    fn test_nullable_field() {
        let mut field = Field::new(FieldDef::integer("age").nullable(true));
        assert_eq!(field.read().unwrap(), Value::Null);
        field.validate_and_set("31").unwrap();
        assert_eq!(field.read().unwrap(), Value::Integer(31));
        field.validate_and_set(Value::Null).unwrap();
        assert_eq!(field.read().unwrap(), Value::Null);
    }

    #[test]
    fn test_default_value() {
        let field = Field::new(FieldDef::integer("stock").with_default(10));
        assert_eq!(field.read().unwrap(), Value::Integer(10));
        assert_eq!(field.format_literal().unwrap(), "10");
    }

    #[test]
    fn test_email_validation() {
        let mut field = Field::new(FieldDef::email("email"));
        assert!(field.validate_and_set("bademail").unwrap_err().is_validation());
        assert!(field.validate_and_set("a@b").is_err());
        field.validate_and_set("a@b.com").unwrap();
        assert_eq!(field.read().unwrap(), Value::from("a@b.com"));

        let mut optional = Field::new(FieldDef::email("backup").nullable(true));
        optional.validate_and_set(Value::Null).unwrap();
    }

    #[test]
    fn test_max_length() {
        let mut field = Field::new(FieldDef::varchar("code", 3));
        field.validate_and_set("ñño").unwrap();
        assert!(field.validate_and_set("abcd").unwrap_err().is_validation());
    }

    #[test]
    fn test_boolean_field() {
        let mut field = Field::new(FieldDef::boolean("active"));
        field.validate_and_set(true).unwrap();
        assert_eq!(field.read().unwrap(), Value::Integer(1));
        field.validate_and_set(0).unwrap();
        assert_eq!(field.read().unwrap(), Value::Integer(0));
        field.validate_and_set("").unwrap();
        assert_eq!(field.read().unwrap(), Value::Integer(0));
    }

    #[test]
    fn test_uuid_field() {
        let mut field = Field::new(FieldDef::uuid("token"));
        field.validate_and_set("ignored").unwrap();
        let first = field.read().unwrap();
        let second = field.read().unwrap();
        assert_ne!(first, Value::from("ignored"));
        assert_ne!(first, second);
        assert!(Uuid::parse_str(first.as_str().unwrap()).is_ok());
    }

    #[test]
    fn test_decimal_field() {
        let mut field = Field::new(FieldDef::decimal("price", 5, 2));
        field.validate_and_set(12.345).unwrap();
        assert_eq!(field.read().unwrap(), Value::Decimal(Decimal::new(1235, 2)));

        field.validate_and_set("7").unwrap();
        assert_eq!(field.format_literal().unwrap(), "7.00");

        assert!(field.validate_and_set("1234.5").unwrap_err().is_validation());
        field.validate_and_set("999.99").unwrap();
    }

    #[test]
    fn test_auto_now_add() {
        let mut field = Field::new(FieldDef::date("created"));
        assert_eq!(field.read().unwrap(), Value::Date(Local::now().date_naive()));

        let past = NaiveDate::from_ymd_opt(2017, 8, 29).unwrap();
        field.validate_and_set("2017-08-29").unwrap();
        assert_eq!(field.read().unwrap(), Value::Date(past));
    }

    #[test]
    fn test_auto_now_and_stamp() {
        let mut field = Field::new(FieldDef::datetime("updated").with_auto(true, false));
        field.validate_and_set("2017-08-29 10:00:00").unwrap();
        assert!(matches!(field.read().unwrap(), Value::DateTime(dt) if dt.date() != NaiveDate::from_ymd_opt(2017, 8, 29).unwrap()));

        let mut created = Field::new(FieldDef::datetime("created").with_auto(false, true));
        assert!(created.raw().is_null());
        created.stamp();
        assert!(matches!(created.raw(), Value::DateTime(_)));
        let stamped = created.raw().clone();
        created.stamp();
        assert_eq!(created.raw(), &stamped);
    }

    #[test]
    fn test_hydrate_skips_emptiness() {
        let mut field = Field::new(FieldDef::varchar("name", 10));
        field.hydrate(Value::Null).unwrap();
        assert!(field.raw().is_null());
        assert!(field.hydrate(Value::Real(1.5)).is_ok());
        assert_eq!(field.raw(), &Value::from("1.5"));
    }

    #[test]
    fn test_coercion_error_names_field() {
        let mut field = Field::new(FieldDef::integer("age"));
        let err = field.validate_and_set("old").unwrap_err();
        assert!(err.to_string().contains("`age`"));
    }
}
