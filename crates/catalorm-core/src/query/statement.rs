//! SQL statement builders.
//!
//! Identifiers are quoted here; every value is left as a `?` placeholder.

use super::QueryOptions;
use crate::catalog::EntityDef;
use crate::error::Error;
use crate::ident::{quote, quote_column_ref, relation_column, ID_COLUMN};
use crate::value::Value;

const JOIN_KEYWORDS: &[&str] = &["INNER", "LEFT", "RIGHT", "FULL", "CROSS", "NATURAL", "JOIN"];

/// `CREATE TABLE IF NOT EXISTS` for an entity: identity, declared fields,
/// foreign-key columns, then the foreign-key clauses.
pub fn create_table(def: &EntityDef) -> String {
    let mut parts = vec![format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", quote(ID_COLUMN))];
    for field in &def.fields {
        parts.push(format!("{} {}", quote(&field.name), field.project_sql_type()));
    }
    for relation in def.foreign_keys() {
        parts.push(format!(
            "{} INTEGER NULL",
            quote(&relation_column(&relation.field_name))
        ));
    }
    for relation in def.foreign_keys() {
        parts.push(foreign_key_clause(&relation.field_name, &relation.target));
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote(&def.table_name),
        parts.join(", ")
    )
}

/// `FOREIGN KEY("ID<field>") REFERENCES "<target>"(ID) ON DELETE CASCADE`.
pub fn foreign_key_clause(field_name: &str, target: &str) -> String {
    format!(
        "FOREIGN KEY({}) REFERENCES {}({}) ON DELETE CASCADE",
        quote(&relation_column(field_name)),
        quote(target),
        ID_COLUMN
    )
}

/// INSERT of `columns`; `DEFAULT VALUES` when there are none.
pub fn insert(table: &str, columns: &[String]) -> String {
    if columns.is_empty() {
        return format!("INSERT INTO {} DEFAULT VALUES", quote(table));
    }
    let names: Vec<String> = columns.iter().map(|c| quote(c)).collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote(table),
        names.join(", "),
        placeholders.join(", ")
    )
}

/// UPDATE of `columns` by identity; the identity is the last parameter.
pub fn update(table: &str, columns: &[String]) -> String {
    let assignments: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{} = ?{}", quote(c), i + 1))
        .collect();
    format!(
        "UPDATE {} SET {} WHERE {} = ?{}",
        quote(table),
        assignments.join(", "),
        quote(ID_COLUMN),
        columns.len() + 1
    )
}

/// DELETE of one row by identity.
pub fn delete_by_identity(table: &str) -> String {
    format!("DELETE FROM {} WHERE {} = ?1", quote(table), quote(ID_COLUMN))
}

/// DELETE of every row.
pub fn delete_all(table: &str) -> String {
    format!("DELETE FROM {}", quote(table))
}

/// SELECT of one row by identity.
pub fn select_by_identity(table: &str) -> String {
    format!("SELECT * FROM {} WHERE {} = ?1", quote(table), quote(ID_COLUMN))
}

/// `ALTER TABLE ... ADD COLUMN`.
pub fn add_column(table: &str, column: &str, definition: &str) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN {} {}",
        quote(table),
        quote(column),
        definition
    )
}

/// Build a SELECT from query options:
/// `SELECT cols FROM t joins WHERE .. GROUP BY .. ORDER BY .. LIMIT ? OFFSET ?`.
pub fn select(table: &str, options: &QueryOptions) -> Result<(String, Vec<Value>), Error> {
    let columns = if options.columns.is_empty() {
        "*".to_string()
    } else {
        options
            .columns
            .iter()
            .map(|c| quote_column_ref(c))
            .collect::<Result<Vec<_>, _>>()?
            .join(", ")
    };

    let mut sql = format!("SELECT {columns} FROM {}", quote(table));
    let mut params = Vec::new();

    for join in &options.joins {
        sql.push(' ');
        sql.push_str(&join_fragment(join));
    }
    if let Some(filter) = options.filter.as_deref().filter(|f| !f.trim().is_empty()) {
        sql.push_str(" WHERE ");
        sql.push_str(filter);
        params.extend(options.params.iter().cloned());
    }
    if let Some(group) = &options.group_by {
        sql.push_str(" GROUP BY ");
        sql.push_str(group);
    }
    if let Some(order) = &options.order_by {
        sql.push_str(" ORDER BY ");
        sql.push_str(order);
    }
    if options.limit.is_some() || options.offset.is_some() {
        // SQLite needs a LIMIT before OFFSET; -1 means unbounded.
        sql.push_str(" LIMIT ?");
        params.push(Value::Integer(
            options.limit.map(clamp).unwrap_or(-1),
        ));
        if let Some(offset) = options.offset {
            sql.push_str(" OFFSET ?");
            params.push(Value::Integer(clamp(offset)));
        }
    }
    Ok((sql, params))
}

fn clamp(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn join_fragment(join: &str) -> String {
    let join = join.trim();
    let first = join
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    if JOIN_KEYWORDS.contains(&first.as_str()) {
        join.to_string()
    } else {
        format!("INNER JOIN {join}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldDef, RelationDef};

    #[test]
    fn test_create_table() {
        let def = EntityDef::new("book")
            .with_field(FieldDef::varchar("title", 80))
            .with_relation(RelationDef::foreign_key("author", "person"))
            .with_relation(RelationDef::many_to_many("tags", "tag"));
        assert_eq!(
            create_table(&def),
            "CREATE TABLE IF NOT EXISTS \"book\" (\"ID\" INTEGER PRIMARY KEY AUTOINCREMENT, \
             \"title\" VARCHAR(80) NOT NULL, \"IDauthor\" INTEGER NULL, \
             FOREIGN KEY(\"IDauthor\") REFERENCES \"person\"(ID) ON DELETE CASCADE)"
        );
    }

    #[test]
    fn test_insert_and_update() {
        let columns = vec!["name".to_string(), "age".to_string()];
        assert_eq!(
            insert("person", &columns),
            "INSERT INTO \"person\" (\"name\", \"age\") VALUES (?1, ?2)"
        );
        assert_eq!(insert("person", &[]), "INSERT INTO \"person\" DEFAULT VALUES");
        assert_eq!(
            update("person", &columns),
            "UPDATE \"person\" SET \"name\" = ?1, \"age\" = ?2 WHERE \"ID\" = ?3"
        );
    }

    #[test]
    fn test_select_all() {
        let (sql, params) = select("person", &QueryOptions::new()).unwrap();
        assert_eq!(sql, "SELECT * FROM \"person\"");
        assert!(params.is_empty());
    }

    #[test]
    fn test_select_full() {
        let options = QueryOptions::new()
            .columns(["person.name", "age"])
            .join("city ON city.ID = person.IDcity")
            .join("LEFT JOIN pet ON pet.IDowner = person.ID")
            .filter_with("age > ?", [18])
            .group_by("age")
            .order_by("age DESC")
            .limit(10)
            .offset(20);
        let (sql, params) = select("person", &options).unwrap();
        assert_eq!(
            sql,
            "SELECT \"person\".\"name\", \"age\" FROM \"person\" \
             INNER JOIN city ON city.ID = person.IDcity \
             LEFT JOIN pet ON pet.IDowner = person.ID \
             WHERE age > ? GROUP BY age ORDER BY age DESC LIMIT ? OFFSET ?"
        );
        assert_eq!(
            params,
            vec![Value::Integer(18), Value::Integer(10), Value::Integer(20)]
        );
    }

    #[test]
    fn test_select_offset_only() {
        let (sql, params) = select("person", &QueryOptions::new().offset(3)).unwrap();
        assert_eq!(sql, "SELECT * FROM \"person\" LIMIT ? OFFSET ?");
        assert_eq!(params, vec![Value::Integer(-1), Value::Integer(3)]);
    }

    #[test]
    fn test_select_rejects_bad_columns() {
        let options = QueryOptions::new().columns(["name; DROP TABLE person"]);
        assert!(select("person", &options).unwrap_err().is_configuration());
    }
}
