//! End-to-end tests: the alteration engine driving a real SQLite database.

use serde_json::json;
use table_alter_core::{
    AlterTableHandler, ChangeAction, ExecutionArguments, Field, FieldType, Requirements,
    SchemaConnection, TableSchema,
};
use table_alter_sqlite::SqliteBackend;

fn backend() -> SqliteBackend {
    let mut backend = SqliteBackend::open_in_memory("ta_").unwrap();
    backend.init_catalog().unwrap();
    backend
}

fn create_cars(backend: &mut SqliteBackend) {
    let mut cars = TableSchema::new("cars")
        .with_field(
            Field::new("id", FieldType::Integer)
                .primary_key()
                .auto_increment(),
        )
        .with_field(Field::new("model", FieldType::Text).with_max_length(200))
        .with_field(Field::new("owner", FieldType::Integer));
    backend.create_table(&mut cars, false).unwrap();
}

fn change(field: &str, property: &str, value: serde_json::Value) -> ChangeAction {
    ChangeAction::ChangeFieldProperty {
        field: field.to_string(),
        property: property.to_string(),
        value,
    }
}

fn physical_columns(backend: &SqliteBackend, table: &str) -> Vec<String> {
    let mut stmt = backend
        .connection()
        .prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")
        .unwrap();
    stmt.query_map([table], |row| row.get::<_, String>(0))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

#[test]
fn rename_round_trips_without_rebuild() {
    let mut backend = backend();
    create_cars(&mut backend);

    let mut handler = AlterTableHandler::new(&mut backend);
    handler.add_action(change("model", "name", json!("model_name")));
    let outcome = handler
        .execute("cars", &ExecutionArguments::default())
        .unwrap();
    assert_eq!(outcome.requirements, Requirements::MAIN_SCHEMA);

    // both catalog and physical table follow the rename
    let loaded = backend.table_schema("cars").unwrap().unwrap();
    assert!(loaded.field("model_name").is_some());
    assert!(loaded.field("model").is_none());
    assert_eq!(
        physical_columns(&backend, "cars"),
        vec!["id", "model_name", "owner"]
    );
}

#[test]
fn extended_only_plan_skips_physical_work() {
    let mut backend = backend();
    create_cars(&mut backend);

    // rows in the physical table must survive an extended-only alteration
    backend
        .connection()
        .execute("INSERT INTO cars (model, owner) VALUES ('corolla', 1)", [])
        .unwrap();

    let mut handler = AlterTableHandler::new(&mut backend);
    handler
        .add_action(change("owner", "rowSource", json!("persons")))
        .add_action(change("owner", "rowSourceType", json!("table")))
        .add_action(change("owner", "boundColumn", json!(0)))
        .add_action(change("owner", "visibleColumn", json!(1)));
    let outcome = handler
        .execute("cars", &ExecutionArguments::default())
        .unwrap();
    assert_eq!(outcome.requirements, Requirements::EXTENDED_SCHEMA);

    let loaded = backend.table_schema("cars").unwrap().unwrap();
    assert_eq!(
        loaded.field("owner").unwrap().extended.get("rowSource"),
        Some(&json!("persons"))
    );
    let rows: i64 = backend
        .connection()
        .query_row("SELECT count(*) FROM cars", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn physical_rebuild_replaces_table() {
    let mut backend = backend();
    create_cars(&mut backend);

    let mut handler = AlterTableHandler::new(&mut backend);
    handler
        .add_action(ChangeAction::RemoveField {
            field: "owner".to_string(),
        })
        .add_action(ChangeAction::InsertField {
            index: 2,
            field: Field::new("year", FieldType::Integer),
        });
    let outcome = handler
        .execute("cars", &ExecutionArguments::default())
        .unwrap();
    assert!(outcome.requirements.contains(Requirements::PHYSICAL));
    assert_eq!(outcome.table.name, "cars");

    let loaded = backend.table_schema("cars").unwrap().unwrap();
    assert!(loaded.field("year").is_some());
    assert!(loaded.field("owner").is_none());
    assert_eq!(physical_columns(&backend, "cars"), vec!["id", "model", "year"]);

    // no temp table left behind
    assert_eq!(backend.table_names().unwrap(), vec!["cars"]);
    let temps: i64 = backend
        .connection()
        .query_row(
            "SELECT count(*) FROM sqlite_master WHERE name LIKE '__temp%'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(temps, 0);
}

#[test]
fn simulate_leaves_database_untouched() {
    let mut backend = backend();
    create_cars(&mut backend);

    let mut handler = AlterTableHandler::new(&mut backend);
    handler.add_action(ChangeAction::RemoveField {
        field: "owner".to_string(),
    });
    let outcome = handler
        .execute(
            "cars",
            &ExecutionArguments {
                simulate: true,
                ..Default::default()
            },
        )
        .unwrap();
    assert!(outcome.requirements.contains(Requirements::PHYSICAL));
    assert_eq!(outcome.table.field_count(), 3);

    assert_eq!(physical_columns(&backend, "cars"), vec!["id", "model", "owner"]);
}

#[test]
fn failed_rebuild_rolls_back() {
    let mut backend = backend();
    create_cars(&mut backend);

    // an object default value cannot be rendered as a DDL literal, so the
    // rebuild fails after the transaction has begun
    let mut bad = Field::new("config", FieldType::Text);
    bad.default_value = Some(json!({"nested": true}));
    let mut handler = AlterTableHandler::new(&mut backend);
    handler.add_action(ChangeAction::InsertField {
        index: 3,
        field: bad,
    });
    assert!(
        handler
            .execute("cars", &ExecutionArguments::default())
            .is_err()
    );

    let loaded = backend.table_schema("cars").unwrap().unwrap();
    assert_eq!(loaded.field_count(), 3);
    assert_eq!(physical_columns(&backend, "cars"), vec!["id", "model", "owner"]);
    assert_eq!(backend.table_names().unwrap(), vec!["cars"]);
}

#[test]
fn repeated_rebuilds_of_indexed_table_succeed() {
    let mut backend = backend();
    let mut cars = TableSchema::new("cars")
        .with_field(
            Field::new("id", FieldType::Integer)
                .primary_key()
                .auto_increment(),
        )
        .with_field(Field::new("model", FieldType::Text))
        .with_field(Field::new("owner", FieldType::Integer).indexed());
    backend.create_table(&mut cars, false).unwrap();

    // first rebuild: the temp table reuses __temp1__cars
    let mut handler = AlterTableHandler::new(&mut backend);
    handler.add_action(ChangeAction::InsertField {
        index: 3,
        field: Field::new("year", FieldType::Integer),
    });
    handler
        .execute("cars", &ExecutionArguments::default())
        .unwrap();

    // second rebuild reuses the same temp name; the surviving index must
    // not carry it
    let mut handler = AlterTableHandler::new(&mut backend);
    handler.add_action(ChangeAction::RemoveField {
        field: "year".to_string(),
    });
    handler
        .execute("cars", &ExecutionArguments::default())
        .unwrap();

    let mut stmt = backend
        .connection()
        .prepare(
            "SELECT name FROM sqlite_master \
             WHERE type = 'index' AND tbl_name = 'cars' AND name LIKE 'idx%' \
             ORDER BY name",
        )
        .unwrap();
    let indexes: Vec<String> = stmt
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(indexes, vec!["idx_cars_owner"]);
}

#[test]
fn read_only_connection_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("alter.db");

    {
        let mut backend = SqliteBackend::open(&path, "ta_").unwrap();
        backend.init_catalog().unwrap();
        create_cars(&mut backend);
    }

    let conn = rusqlite::Connection::open_with_flags(
        &path,
        rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
    )
    .unwrap();
    let mut backend = SqliteBackend::new(conn, "ta_").unwrap();
    assert!(backend.is_read_only());

    let mut handler = AlterTableHandler::new(&mut backend);
    handler.add_action(change("model", "caption", json!("Model")));
    let err = handler
        .execute("cars", &ExecutionArguments::default())
        .unwrap_err();
    assert_eq!(err, table_alter_core::AlterError::ConnectionReadOnly);
}

#[test]
fn catalog_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("alter.db");

    {
        let mut backend = SqliteBackend::open(&path, "ta_").unwrap();
        backend.init_catalog().unwrap();
        create_cars(&mut backend);

        let mut handler = AlterTableHandler::new(&mut backend);
        handler.add_action(change("model", "caption", json!("Model")));
        handler
            .execute("cars", &ExecutionArguments::default())
            .unwrap();
    }

    let mut reopened = SqliteBackend::open(&path, "ta_").unwrap();
    let loaded = reopened.table_schema("cars").unwrap().unwrap();
    assert_eq!(loaded.field("model").unwrap().caption.as_deref(), Some("Model"));
}
