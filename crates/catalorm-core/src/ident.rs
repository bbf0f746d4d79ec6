//! SQL identifier grammar.
//!
//! Table and column names are interpolated into statements, so they are
//! restricted to `[A-Za-z_][A-Za-z0-9_]*` and always emitted double-quoted.
//! Literal values never go through here; they are bound as parameters.

use crate::error::Error;

/// Name of the identity column every entity table carries.
pub const ID_COLUMN: &str = "ID";

/// Check whether `name` matches the identifier grammar.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validate an identifier, naming what it identifies in the error.
pub fn validate(name: &str, what: &str) -> Result<(), Error> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(Error::configuration(format!("invalid {what} name {name:?}")))
    }
}

/// Double-quote a validated identifier.
pub fn quote(name: &str) -> String {
    format!("\"{name}\"")
}

/// Validate and quote a projection column: `*`, `column` or `table.column`.
pub fn quote_column_ref(column: &str) -> Result<String, Error> {
    let column = column.trim();
    if column == "*" {
        return Ok("*".to_string());
    }
    match column.split_once('.') {
        Some((table, "*")) => {
            validate(table, "table")?;
            Ok(format!("{}.*", quote(table)))
        }
        Some((table, name)) => {
            validate(table, "table")?;
            validate(name, "column")?;
            Ok(format!("{}.{}", quote(table), quote(name)))
        }
        None => {
            validate(column, "column")?;
            Ok(quote(column))
        }
    }
}

/// Name of the implicit column a relation field contributes.
pub fn relation_column(field_name: &str) -> String {
    format!("{ID_COLUMN}{field_name}")
}
