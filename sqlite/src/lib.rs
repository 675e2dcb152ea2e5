//! SQLite storage backend for the table-alter engine.
//!
//! Implements the engine's [`SchemaConnection`](table_alter_core::SchemaConnection)
//! capability over `rusqlite`. Table schemas are persisted in prefixed
//! catalog tables, physical tables are real SQLite tables generated from
//! the schema, and extended (driver-specific) field properties live in a
//! side table.
//!
//! # Architecture
//!
//! - **`catalog`** — catalog DDL generation with customizable table prefixes
//! - **`convert`** — field ↔ row and schema ↔ DDL transformations
//! - **`connection`** — the [`SqliteBackend`] connection type
//!
//! # Quick start
//!
//! ```no_run
//! use serde_json::json;
//! use table_alter_core::{AlterTableHandler, ChangeAction, ExecutionArguments};
//! use table_alter_sqlite::SqliteBackend;
//!
//! let mut backend = SqliteBackend::open("app.db", "ta_").unwrap();
//! backend.init_catalog().unwrap();
//!
//! let mut handler = AlterTableHandler::new(&mut backend);
//! handler.add_action(ChangeAction::ChangeFieldProperty {
//!     field: "model".into(),
//!     property: "maxLength".into(),
//!     value: json!(80),
//! });
//! let outcome = handler.execute("cars", &ExecutionArguments::default()).unwrap();
//! println!("applied with requirements: {}", outcome.requirements);
//! ```
//!
//! # Table prefix customization
//!
//! All catalog table and index names are prefixed with a configurable
//! string, allowing multiple isolated catalogs within the same SQLite
//! database. Prefixes must contain only alphanumeric characters and
//! underscores.
//!
//! SQLite supports transactional DDL, so the engine's rollback expectation
//! for failed physical rebuilds holds natively.

mod catalog;
mod connection;
mod convert;
mod error;

pub use catalog::generate_catalog_sql;
pub use connection::SqliteBackend;
pub use error::{Result, SqliteError};
