//! Catalog SQL generation with customizable table prefixes.
//!
//! Table schemas are persisted in three normalized catalog tables. All
//! names carry a configurable prefix so multiple isolated catalogs can
//! share one SQLite database:
//!
//! - `{prefix}tables` — one row per stored table
//! - `{prefix}fields` — one row per field, ordered by position, with every
//!   core property as a column (`default_value` as JSON text)
//! - `{prefix}extended_properties` — driver-specific field properties such
//!   as lookup metadata, one row per property, value as JSON text
//!
//! Prefixes must contain only alphanumeric characters and underscores.

use crate::error::{Result, SqliteError};

/// Validates that a table prefix contains only alphanumeric characters and
/// underscores.
pub(crate) fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.is_empty() {
        return Err(SqliteError::InvalidPrefix(prefix.to_string()));
    }
    if !prefix.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(SqliteError::InvalidPrefix(prefix.to_string()));
    }
    Ok(())
}

/// Generates the catalog schema for the given prefix.
///
/// # Errors
///
/// Returns [`SqliteError::InvalidPrefix`] if the prefix contains characters
/// other than alphanumerics and underscores, or if it is empty.
pub fn generate_catalog_sql(prefix: &str) -> Result<String> {
    validate_prefix(prefix)?;

    let sql = format!(
        r#"
CREATE TABLE IF NOT EXISTS {prefix}tables (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE COLLATE NOCASE
);

CREATE TABLE IF NOT EXISTS {prefix}fields (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    table_id INTEGER NOT NULL,
    position INTEGER NOT NULL,
    name TEXT NOT NULL COLLATE NOCASE,
    field_type TEXT NOT NULL,
    caption TEXT,
    description TEXT,
    max_length INTEGER,
    field_precision INTEGER,
    is_unsigned INTEGER NOT NULL DEFAULT 0,
    is_primary_key INTEGER NOT NULL DEFAULT 0,
    is_unique INTEGER NOT NULL DEFAULT 0,
    is_not_null INTEGER NOT NULL DEFAULT 0,
    allows_empty INTEGER NOT NULL DEFAULT 1,
    is_auto_increment INTEGER NOT NULL DEFAULT 0,
    is_indexed INTEGER NOT NULL DEFAULT 0,
    default_value TEXT,
    default_width INTEGER,
    visible_decimal_places INTEGER,
    UNIQUE (table_id, name),
    FOREIGN KEY (table_id) REFERENCES {prefix}tables(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS {prefix}extended_properties (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    table_id INTEGER NOT NULL,
    field_name TEXT NOT NULL COLLATE NOCASE,
    property TEXT NOT NULL,
    value TEXT NOT NULL,
    UNIQUE (table_id, field_name, property),
    FOREIGN KEY (table_id) REFERENCES {prefix}tables(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_{prefix}fields_table ON {prefix}fields(table_id);
CREATE INDEX IF NOT EXISTS idx_{prefix}extended_table ON {prefix}extended_properties(table_id);
"#,
        prefix = prefix
    );

    Ok(sql)
}
