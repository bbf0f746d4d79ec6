//! Relation resolver: installs entity tables with their foreign keys and
//! locates or creates many-to-many junction tables.

use rusqlite::Connection;
use tracing::info;

use crate::catalog::{self, EntityDef, RelationDef};
use crate::error::Error;
use crate::ident::relation_column;
use crate::migration;
use crate::query::statement;
use crate::storage::{execute, query, table_exists};
use crate::value::Value;

/// A many-to-many junction table as seen from one side of the relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JunctionTable {
    /// Table name.
    pub name: String,
    /// Column referencing the owning entity.
    pub owner_column: String,
    /// Column referencing the target entity.
    pub target_column: String,
}

impl JunctionTable {
    fn new(name: String, owner: &str, relation: &RelationDef) -> Self {
        Self {
            name,
            owner_column: relation_column(owner),
            target_column: relation_column(target_key(owner, relation)),
        }
    }
}

// Self-referential relations name the second column after the field.
fn target_key<'a>(owner: &str, relation: &'a RelationDef) -> &'a str {
    if relation.target == owner {
        &relation.field_name
    } else {
        &relation.target
    }
}

/// Definition of the junction table created for `relation` on `owner`:
/// `<owner>_<field>` with a cascading foreign key to each side.
pub fn junction_def(owner: &str, relation: &RelationDef) -> EntityDef {
    EntityDef::new(format!("{owner}_{}", relation.field_name))
        .with_relation(RelationDef::foreign_key(owner, owner))
        .with_relation(RelationDef::foreign_key(
            target_key(owner, relation),
            relation.target.clone(),
        ))
}

/// Look up the junction of `relation` on `owner` under either name order,
/// `<owner>_<field>` or `<field>_<owner>`.
pub fn find_junction(
    connection: &Connection,
    owner: &str,
    relation: &RelationDef,
) -> Result<Option<JunctionTable>, Error> {
    let candidates = [
        format!("{owner}_{}", relation.field_name),
        format!("{}_{owner}", relation.field_name),
    ];
    for name in candidates {
        if table_exists(connection, &name)? {
            let junction = JunctionTable::new(name, owner, relation);
            check_junction_columns(connection, &junction)?;
            return Ok(Some(junction));
        }
    }
    Ok(None)
}

fn check_junction_columns(connection: &Connection, junction: &JunctionTable) -> Result<(), Error> {
    let rows = query(
        connection,
        "SELECT name FROM pragma_table_info(?1)",
        &[Value::from(junction.name.as_str())],
    )?;
    let has = |column: &str| {
        rows.iter()
            .any(|row| row.get("name").and_then(Value::as_str) == Some(column))
    };
    for column in [&junction.owner_column, &junction.target_column] {
        if !has(column) {
            return Err(Error::configuration(format!(
                "junction table `{}` has no column `{column}`",
                junction.name
            )));
        }
    }
    Ok(())
}

/// Find the junction of `relation` on `owner`, creating and registering it
/// when neither name order exists.
pub fn ensure_junction(
    connection: &Connection,
    owner: &str,
    relation: &RelationDef,
) -> Result<JunctionTable, Error> {
    if let Some(junction) = find_junction(connection, owner, relation)? {
        return Ok(junction);
    }
    let def = junction_def(owner, relation);
    def.validate()?;
    execute(connection, &statement::create_table(&def), &[])?;
    catalog::store_in(connection, &def)?;

    info!(table = %def.table_name, owner, target = %relation.target, "junction table created");
    Ok(JunctionTable::new(def.table_name, owner, relation))
}

/// Create the table of `def` (or add the columns an existing table lacks),
/// resolve its junction tables and register it in the catalog. Returns the
/// junctions by relation field.
pub fn install(
    connection: &Connection,
    def: &EntityDef,
) -> Result<Vec<(String, JunctionTable)>, Error> {
    catalog::ensure_in(connection)?;
    if table_exists(connection, &def.table_name)? {
        migration::sync_columns(connection, def)?;
    } else {
        execute(connection, &statement::create_table(def), &[])?;
        info!(table = %def.table_name, columns = def.columns().len(), "table created");
    }

    let mut junctions = Vec::new();
    for relation in def.many_to_many() {
        let junction = ensure_junction(connection, &def.table_name, relation)?;
        junctions.push((relation.field_name.clone(), junction));
    }
    catalog::store_in(connection, def)?;
    Ok(junctions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FieldDef;
    use crate::storage::{Store, StoreConfig};

    fn test_store(dir: &tempfile::TempDir) -> Store {
        Store::open(StoreConfig::in_directory(dir.path(), "relation.sqlite3")).unwrap()
    }

    #[test]
    fn test_junction_def() {
        let def = junction_def("student", &RelationDef::many_to_many("courses", "course"));
        assert_eq!(def.table_name, "student_courses");
        assert_eq!(def.columns(), vec!["IDstudent", "IDcourse"]);

        let own = junction_def("person", &RelationDef::many_to_many("friends", "person"));
        assert_eq!(own.columns(), vec!["IDperson", "IDfriends"]);
    }

    #[test]
    fn test_install_creates_junction_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir);

        let student = EntityDef::new("student")
            .with_field(FieldDef::text("name"))
            .with_relation(RelationDef::many_to_many("course", "course"));
        let course = EntityDef::new("course")
            .with_field(FieldDef::text("title"))
            .with_relation(RelationDef::many_to_many("student", "student"));

        let from_student = store.transaction(|conn| install(conn, &student)).unwrap();
        let from_course = store.transaction(|conn| install(conn, &course)).unwrap();

        assert_eq!(from_student[0].1.name, "student_course");
        assert_eq!(from_course[0].1.name, "student_course");
        assert_eq!(from_course[0].1.owner_column, "IDcourse");
        assert_eq!(from_course[0].1.target_column, "IDstudent");
        assert!(!store.table_exists("course_student").unwrap());

        let catalog = catalog::SchemaCatalog::open(&store).unwrap();
        assert_eq!(
            catalog.tables().unwrap(),
            vec!["course", "student", "student_course"]
        );
    }

    #[test]
    fn test_install_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir);
        let def = EntityDef::new("tag").with_field(FieldDef::text("label"));

        store.transaction(|conn| install(conn, &def)).unwrap();
        store.transaction(|conn| install(conn, &def)).unwrap();
        assert_eq!(store.tables().unwrap(), vec!["models_db", "tag"]);
    }

    #[test]
    fn test_find_junction_checks_columns() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir);
        store
            .execute("CREATE TABLE \"a_b\" (ID INTEGER PRIMARY KEY, x INTEGER)", &[])
            .unwrap();

        let connection = store.connection().unwrap();
        let err = find_junction(&connection, "a", &RelationDef::many_to_many("b", "b")).unwrap_err();
        assert!(err.is_configuration());
    }
}
