//! Integration tests for the embedded database handle.

use catalorm::{
    Database, Entity, EntityDef, FieldDef, QueryOptions, RelationDef, StoreConfig, Value,
};

struct TestContext {
    db: Database,
    dir: tempfile::TempDir,
}

impl TestContext {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(StoreConfig::new(dir.path().join("app.sqlite3"))).unwrap();
        Self { db, dir }
    }
}

struct Author;

impl Entity for Author {
    fn schema(def: EntityDef) -> EntityDef {
        def.with_field(FieldDef::varchar("name", 60))
            .with_field(FieldDef::email("email").nullable(true))
    }
}

struct Book;

impl Entity for Book {
    fn table_name() -> String {
        "books".to_string()
    }

    fn schema(def: EntityDef) -> EntityDef {
        def.with_field(FieldDef::varchar("title", 120))
            .with_field(FieldDef::decimal("price", 6, 2).nullable(true))
            .with_relation(RelationDef::foreign_key("author", "author"))
    }
}

#[test]
fn test_open_creates_catalog() {
    let ctx = TestContext::new();
    assert!(ctx.db.table_exists("models_db").unwrap());
    assert!(ctx.db.catalog().tables().unwrap().is_empty());
    assert_eq!(ctx.db.store().name(), "app.sqlite3");
    assert!(ctx.dir.path().join("app.sqlite3").exists());
}

#[test]
fn test_declare_and_query() {
    let ctx = TestContext::new();
    let mut author = ctx.db.declare_entity::<Author>().unwrap();
    author
        .save_with([("name", "Ursula"), ("email", "ursula@example.com")])
        .unwrap();

    let mut book = ctx.db.declare_entity::<Book>().unwrap();
    assert_eq!(book.table_name(), "books");
    book.set("title", "The Dispossessed").unwrap();
    book.set("price", 9.5).unwrap();
    book.set_related("author", &author).unwrap();
    book.save().unwrap();

    let books = ctx
        .db
        .model("books")
        .unwrap()
        .find_all(&QueryOptions::new().filter_with("price < ?", [10]))
        .unwrap();
    assert_eq!(books.len(), 1);
    let writer = books[0].related("author").unwrap().unwrap();
    assert_eq!(writer.get("name").unwrap(), Value::from("Ursula"));
}

#[test]
fn test_schema_survives_reopen() {
    let ctx = TestContext::new();
    ctx.db.declare_entity::<Author>().unwrap();
    let expected = Author::definition();

    let reopened = Database::open(StoreConfig::new(ctx.dir.path().join("app.sqlite3"))).unwrap();
    assert_eq!(reopened.schema("author").unwrap(), Some(expected));
    assert!(reopened.schema("missing").unwrap().is_none());
}

#[test]
fn test_transport_between_stores() {
    let ctx = TestContext::new();
    let mut author = ctx.db.declare_entity::<Author>().unwrap();
    author.save_with([("name", "Ursula")]).unwrap();

    let other = Database::open(StoreConfig::new(ctx.dir.path().join("other.sqlite3"))).unwrap();
    let mut tag = other
        .declare(EntityDef::new("tag").with_field(FieldDef::text("label")))
        .unwrap();
    tag.save_with([("label", "scifi")]).unwrap();

    let json = ctx.db.serialize(&[author, tag]).unwrap();
    let models = ctx.db.deserialize(&json).unwrap();
    assert_eq!(models.len(), 2);
    assert_eq!(models[0].store().name(), "app.sqlite3");
    assert_eq!(models[1].store().name(), "other.sqlite3");
    assert_eq!(models[1].get("label").unwrap(), Value::from("scifi"));
    assert!(models[1].schema().is_some());
}

#[test]
fn test_drop_all() {
    let ctx = TestContext::new();
    ctx.db.declare_entity::<Author>().unwrap();
    ctx.db.declare_entity::<Book>().unwrap();

    assert_eq!(ctx.db.drop_all().unwrap(), 3);
    assert!(!ctx.db.table_exists("author").unwrap());
    assert!(ctx.db.table_exists("models_db").unwrap());
    assert!(ctx.db.catalog().tables().unwrap().is_empty());
}

#[test]
fn test_serialized_records() {
    let ctx = TestContext::new();
    let mut author = ctx.db.declare_entity::<Author>().unwrap();
    author.save_with([("name", "Ursula")]).unwrap();

    let json = ctx.db.serialize(&[author]).unwrap();
    let records: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(records[0]["table_name"], "author");
    assert_eq!(records[0]["store_name"], "app.sqlite3");
    assert_eq!(records[0]["datos"]["name"], "Ursula");
    assert_eq!(records[0]["datos"]["ID"], 1);
}
