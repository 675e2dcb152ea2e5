//! Core types and planning engine for declarative table schema alteration.
//!
//! This crate captures a batch of schema changes as a plan of declarative
//! [`ChangeAction`]s, trial-applies them to an in-memory working copy of
//! the target table, diffs the result against the original schema to
//! compute the minimal set of [`Requirements`], and executes the cheapest
//! strategy — extended-metadata update, main-catalog rewrite, or full
//! physical rebuild — transactionally through a pluggable
//! [`SchemaConnection`] backend.
//!
//! - [`TableSchema`] / [`Field`] / [`FieldType`] — the schema data model.
//! - [`ChangeAction`] — change-property / remove / insert / move-position
//!   edits.
//! - [`classify_property`] — maps a property name to the requirement
//!   categories its change demands.
//! - [`AlteredTable`] — the working-copy workspace with origin tracking
//!   (rename is never conflated with remove-then-insert).
//! - [`AlterTableHandler`] — the plan front door with simulate and
//!   requirements-only modes.
//!
//! # Example
//!
//! ```no_run
//! use serde_json::json;
//! use table_alter_core::{
//!     AlterTableHandler, ChangeAction, ExecutionArguments, SchemaConnection,
//! };
//!
//! fn retype_year<C: SchemaConnection>(conn: &mut C) {
//!     let mut handler = AlterTableHandler::new(conn);
//!     handler.add_action(ChangeAction::ChangeFieldProperty {
//!         field: "year".into(),
//!         property: "type".into(),
//!         value: json!("bigInteger"),
//!     });
//!
//!     // dry run first: what would this cost?
//!     let preview = handler
//!         .execute("cars", &ExecutionArguments {
//!             simulate: true,
//!             ..Default::default()
//!         })
//!         .unwrap();
//!     println!("would require: {}", preview.requirements);
//!
//!     // the real thing, inside one transaction
//!     handler
//!         .execute("cars", &ExecutionArguments::default())
//!         .unwrap();
//! }
//! ```

mod actions;
mod connection;
mod error;
mod handler;
pub mod properties;
mod requirements;
mod types;
mod workspace;

pub use actions::ChangeAction;
pub use connection::{BackendError, SchemaConnection};
pub use error::AlterError;
pub use handler::{AlterOutcome, AlterTableHandler, ExecutionArguments};
pub use properties::{
    PropertyError, field_properties, is_extended_field_property, set_field_properties,
    set_field_property,
};
pub use requirements::{Requirements, classify_property};
pub use types::{Field, FieldType, SchemaError, TableSchema};
pub use workspace::AlteredTable;
