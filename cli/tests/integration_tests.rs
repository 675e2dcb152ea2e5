use std::fs;
use std::path::PathBuf;
use std::process::Output;

/// Helper to create a temp directory that is cleaned up on drop.
struct TempDir {
    path: PathBuf,
}

impl TempDir {
    fn new(name: &str) -> Self {
        let path =
            std::env::temp_dir().join(format!("table_alter_test_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&path);
        fs::create_dir_all(&path).expect("failed to create temp dir");
        Self { path }
    }

    fn join(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn run(args: &[&str]) -> Output {
    std::process::Command::new(env!("CARGO_BIN_EXE_table-alter"))
        .args(args)
        .output()
        .expect("failed to run table-alter")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// A small cars schema JSON file.
fn write_cars_schema(dir: &TempDir) -> PathBuf {
    let json = serde_json::json!({
        "name": "cars",
        "fields": [
            {"name": "id", "type": "integer", "primaryKey": true, "unique": true,
             "notNull": true, "allowEmpty": false, "autoIncrement": true},
            {"name": "model", "type": "text", "maxLength": 200},
            {"name": "owner", "type": "integer"}
        ]
    });
    let path = dir.join("cars.json");
    fs::write(&path, serde_json::to_string_pretty(&json).unwrap())
        .expect("failed to write schema");
    path
}

fn write_plan(dir: &TempDir, name: &str, plan: serde_json::Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_string_pretty(&plan).unwrap()).expect("failed to write plan");
    path
}

/// Initializes a database with the cars table and returns its path.
fn setup_cars_db(dir: &TempDir) -> PathBuf {
    let db = dir.join("alter.db");
    let schema = write_cars_schema(dir);

    let output = run(&["init", "--db", db.to_str().unwrap()]);
    assert!(output.status.success(), "init should succeed");

    let output = run(&[
        "create",
        "--db",
        db.to_str().unwrap(),
        "--schema",
        schema.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "create should succeed");
    db
}

#[test]
fn init_create_show_round_trip() {
    let dir = TempDir::new("round_trip");
    let db = setup_cars_db(&dir);

    let output = run(&[
        "show",
        "--db",
        db.to_str().unwrap(),
        "--table",
        "cars",
    ]);
    assert!(output.status.success());
    let shown: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(shown["name"], "cars");
    assert_eq!(shown["fields"].as_array().unwrap().len(), 3);
}

#[test]
fn show_without_table_lists_names() {
    let dir = TempDir::new("list_names");
    let db = setup_cars_db(&dir);

    let output = run(&["show", "--db", db.to_str().unwrap()]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "cars");
}

#[test]
fn apply_rename_plan_updates_schema() {
    let dir = TempDir::new("apply_rename");
    let db = setup_cars_db(&dir);
    let plan = write_plan(
        &dir,
        "rename.json",
        serde_json::json!([
            {"action": "changeFieldProperty", "field": "model",
             "property": "name", "value": "model_name"}
        ]),
    );

    let output = run(&[
        "apply",
        "--db",
        db.to_str().unwrap(),
        "--table",
        "cars",
        "--plan",
        plan.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "apply should succeed");
    let text = stdout(&output);
    assert!(text.contains("requirements: mainSchema"));
    assert!(text.contains("model_name"));

    let output = run(&[
        "show",
        "--db",
        db.to_str().unwrap(),
        "--table",
        "cars",
    ]);
    let shown: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(shown["fields"][1]["name"], "model_name");
}

#[test]
fn requirements_only_reports_without_changing() {
    let dir = TempDir::new("requirements_only");
    let db = setup_cars_db(&dir);
    let plan = write_plan(
        &dir,
        "remove.json",
        serde_json::json!([
            {"action": "removeField", "field": "owner"}
        ]),
    );

    let output = run(&[
        "apply",
        "--db",
        db.to_str().unwrap(),
        "--table",
        "cars",
        "--plan",
        plan.to_str().unwrap(),
        "--requirements-only",
    ]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("physical"));

    // the table still has all three fields
    let output = run(&[
        "show",
        "--db",
        db.to_str().unwrap(),
        "--table",
        "cars",
    ]);
    let shown: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(shown["fields"].as_array().unwrap().len(), 3);
}

#[test]
fn apply_fails_for_unknown_field() {
    let dir = TempDir::new("unknown_field");
    let db = setup_cars_db(&dir);
    let plan = write_plan(
        &dir,
        "bad.json",
        serde_json::json!([
            {"action": "removeField", "field": "no_such_field"}
        ]),
    );

    let output = run(&[
        "apply",
        "--db",
        db.to_str().unwrap(),
        "--table",
        "cars",
        "--plan",
        plan.to_str().unwrap(),
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    assert!(stderr.contains("no_such_field"));
}

#[test]
fn create_without_replace_rejects_existing() {
    let dir = TempDir::new("create_existing");
    let db = setup_cars_db(&dir);
    let schema = write_cars_schema(&dir);

    let output = run(&[
        "create",
        "--db",
        db.to_str().unwrap(),
        "--schema",
        schema.to_str().unwrap(),
    ]);
    assert!(!output.status.success());

    let output = run(&[
        "create",
        "--db",
        db.to_str().unwrap(),
        "--schema",
        schema.to_str().unwrap(),
        "--replace",
    ]);
    assert!(output.status.success());
}
