//! The [`SqliteBackend`] storage connection.
//!
//! Implements [`SchemaConnection`] over `rusqlite`: table schemas live in
//! prefixed catalog tables, physical tables are real SQLite tables built
//! from generated DDL, and the engine's transaction boundary maps onto
//! SQLite transactions. SQLite DDL is transactional, so rollback undoes
//! partially built physical tables.

use std::path::Path;

use rusqlite::{Connection, params};
use table_alter_core::{BackendError, SchemaConnection, TableSchema};

use crate::catalog::{generate_catalog_sql, validate_prefix};
use crate::convert::{
    create_index_sql, create_table_sql, field_from_row, index_name, needs_index, quote_ident,
    text_to_value, value_to_text,
};
use crate::error::{Result, SqliteError};

/// SQLite-backed schema storage.
///
/// # Examples
///
/// ```no_run
/// use table_alter_sqlite::SqliteBackend;
/// use table_alter_core::{Field, FieldType, SchemaConnection, TableSchema};
///
/// let mut backend = SqliteBackend::open("app.db", "ta_").unwrap();
/// backend.init_catalog().unwrap();
///
/// let mut cars = TableSchema::new("cars")
///     .with_field(Field::new("id", FieldType::Integer).primary_key().auto_increment())
///     .with_field(Field::new("model", FieldType::Text));
/// backend.create_table(&mut cars, false).unwrap();
/// assert!(cars.id.is_some());
/// ```
pub struct SqliteBackend {
    conn: Connection,
    prefix: String,
}

impl SqliteBackend {
    /// Wraps an existing connection. The prefix must contain only
    /// alphanumeric characters and underscores.
    pub fn new(conn: Connection, prefix: &str) -> Result<Self> {
        validate_prefix(prefix)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self {
            conn,
            prefix: prefix.to_string(),
        })
    }

    /// Opens (or creates) a database file.
    pub fn open(path: impl AsRef<Path>, prefix: &str) -> Result<Self> {
        Self::new(Connection::open(path)?, prefix)
    }

    /// Opens an in-memory database.
    pub fn open_in_memory(prefix: &str) -> Result<Self> {
        Self::new(Connection::open_in_memory()?, prefix)
    }

    /// Creates the catalog tables if they do not exist.
    pub fn init_catalog(&mut self) -> Result<()> {
        self.conn.execute_batch(&generate_catalog_sql(&self.prefix)?)?;
        Ok(())
    }

    /// Raw access to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Names of all tables recorded in the catalog, sorted.
    pub fn table_names(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT name FROM {}tables ORDER BY name", self.prefix))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn catalog_id(&self, name: &str) -> Result<Option<i64>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT id FROM {}tables WHERE name = ?1", self.prefix))?;
        let mut rows = stmt.query(params![name])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    fn require_catalog_id(&self, name: &str) -> Result<i64> {
        self.catalog_id(name)?
            .ok_or_else(|| SqliteError::TableNotFound(name.to_string()))
    }

    fn physical_table_exists(&self, name: &str) -> Result<bool> {
        let mut stmt = self.conn.prepare(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
        )?;
        Ok(stmt.exists(params![name])?)
    }

    fn load_schema(&self, name: &str) -> Result<Option<TableSchema>> {
        let Some(table_id) = self.catalog_id(name)? else {
            return Ok(None);
        };
        // the catalog holds the canonical casing
        let stored_name: String = self.conn.query_row(
            &format!("SELECT name FROM {}tables WHERE id = ?1", self.prefix),
            params![table_id],
            |row| row.get(0),
        )?;

        let mut schema = TableSchema::new(&stored_name);
        schema.id = Some(table_id);

        let mut stmt = self.conn.prepare(&format!(
            "SELECT name, field_type, caption, description, max_length, field_precision, \
             is_unsigned, is_primary_key, is_unique, is_not_null, allows_empty, \
             is_auto_increment, is_indexed, default_value, default_width, \
             visible_decimal_places \
             FROM {}fields WHERE table_id = ?1 ORDER BY position",
            self.prefix
        ))?;
        let mut rows = stmt.query(params![table_id])?;
        while let Some(row) = rows.next()? {
            let field = field_from_row(row)?;
            schema
                .add_field(field)
                .map_err(|e| SqliteError::Conversion(e.to_string()))?;
        }

        let mut stmt = self.conn.prepare(&format!(
            "SELECT field_name, property, value FROM {}extended_properties WHERE table_id = ?1",
            self.prefix
        ))?;
        let mut rows = stmt.query(params![table_id])?;
        while let Some(row) = rows.next()? {
            let field_name: String = row.get(0)?;
            let property: String = row.get(1)?;
            let value_text: String = row.get(2)?;
            let value = text_to_value(&value_text)?;
            let field = schema.field_mut(&field_name).ok_or_else(|| {
                SqliteError::Conversion(format!(
                    "extended property '{property}' references unknown field '{field_name}'"
                ))
            })?;
            field.extended.insert(property, value);
        }

        Ok(Some(schema))
    }

    fn write_fields(&mut self, table_id: i64, schema: &TableSchema) -> Result<()> {
        self.conn.execute(
            &format!("DELETE FROM {}fields WHERE table_id = ?1", self.prefix),
            params![table_id],
        )?;
        let mut stmt = self.conn.prepare(&format!(
            "INSERT INTO {}fields (table_id, position, name, field_type, caption, \
             description, max_length, field_precision, is_unsigned, is_primary_key, \
             is_unique, is_not_null, allows_empty, is_auto_increment, is_indexed, \
             default_value, default_width, visible_decimal_places) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
            self.prefix
        ))?;
        for (position, field) in schema.fields().iter().enumerate() {
            let default_text = match &field.default_value {
                Some(value) => Some(value_to_text(value)?),
                None => None,
            };
            stmt.execute(params![
                table_id,
                position as i64,
                field.name,
                field.field_type.name(),
                field.caption,
                field.description,
                field.max_length,
                field.precision,
                field.unsigned,
                field.primary_key,
                field.unique,
                field.not_null,
                field.allow_empty,
                field.auto_increment,
                field.indexed,
                default_text,
                field.default_width,
                field.visible_decimal_places,
            ])?;
        }
        Ok(())
    }

    fn write_extended(&mut self, table_id: i64, schema: &TableSchema) -> Result<()> {
        self.conn.execute(
            &format!(
                "DELETE FROM {}extended_properties WHERE table_id = ?1",
                self.prefix
            ),
            params![table_id],
        )?;
        let mut stmt = self.conn.prepare(&format!(
            "INSERT INTO {}extended_properties (table_id, field_name, property, value) \
             VALUES (?1, ?2, ?3, ?4)",
            self.prefix
        ))?;
        for field in schema.fields() {
            for (property, value) in &field.extended {
                stmt.execute(params![table_id, field.name, property, value_to_text(value)?])?;
            }
        }
        Ok(())
    }

    fn drop_table(&mut self, name: &str) -> Result<()> {
        self.conn
            .execute_batch(&format!("DROP TABLE IF EXISTS {}", quote_ident(name)))?;
        self.conn.execute(
            &format!("DELETE FROM {}tables WHERE name = ?1", self.prefix),
            params![name],
        )?;
        Ok(())
    }

    fn stored_field_names(&self, table_id: i64) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT name FROM {}fields WHERE table_id = ?1 ORDER BY position",
            self.prefix
        ))?;
        let names = stmt
            .query_map(params![table_id], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn create_table_inner(
        &mut self,
        schema: &mut TableSchema,
        replace_existing: bool,
    ) -> Result<()> {
        if self.catalog_id(&schema.name)?.is_some() || self.physical_table_exists(&schema.name)? {
            if !replace_existing {
                return Err(SqliteError::Conversion(format!(
                    "table already exists: {}",
                    schema.name
                )));
            }
            self.drop_table(&schema.name)?;
        }

        self.conn.execute_batch(&create_table_sql(schema)?)?;
        for stmt in create_index_sql(schema) {
            self.conn.execute_batch(&stmt)?;
        }

        self.conn.execute(
            &format!("INSERT INTO {}tables (name) VALUES (?1)", self.prefix),
            params![schema.name],
        )?;
        let table_id = self.conn.last_insert_rowid();
        schema.id = Some(table_id);

        self.write_fields(table_id, schema)?;
        self.write_extended(table_id, schema)?;
        Ok(())
    }

    fn alter_table_name_inner(
        &mut self,
        schema: &mut TableSchema,
        new_name: &str,
        replace_existing: bool,
    ) -> Result<()> {
        let table_id = self.require_catalog_id(&schema.name)?;

        let displaced = self.catalog_id(new_name)?.filter(|id| *id != table_id);
        if let Some(displaced_id) = displaced {
            if !replace_existing {
                return Err(SqliteError::Conversion(format!(
                    "table already exists: {new_name}"
                )));
            }
            // resolve the displaced table's stored name before dropping
            let displaced_name: String = self.conn.query_row(
                &format!("SELECT name FROM {}tables WHERE id = ?1", self.prefix),
                params![displaced_id],
                |row| row.get(0),
            )?;
            self.drop_table(&displaced_name)?;
        }

        self.conn.execute_batch(&format!(
            "ALTER TABLE {} RENAME TO {}",
            quote_ident(&schema.name),
            quote_ident(new_name)
        ))?;
        self.conn.execute(
            &format!("UPDATE {}tables SET name = ?1 WHERE id = ?2", self.prefix),
            params![new_name, table_id],
        )?;

        // indexes keep their names through a table rename; rebuild them
        // under the final table name so a later rebuild of the same table
        // never collides with a leftover temp-named index
        for field in schema.fields() {
            if needs_index(field) {
                self.conn.execute_batch(&format!(
                    "DROP INDEX IF EXISTS {}",
                    quote_ident(&index_name(&schema.name, &field.name))
                ))?;
                self.conn.execute_batch(&format!(
                    "DROP INDEX IF EXISTS {}",
                    quote_ident(&index_name(new_name, &field.name))
                ))?;
                self.conn.execute_batch(&format!(
                    "CREATE INDEX {} ON {} ({})",
                    quote_ident(&index_name(new_name, &field.name)),
                    quote_ident(new_name),
                    quote_ident(&field.name)
                ))?;
            }
        }

        schema
            .set_name(new_name)
            .map_err(|e| SqliteError::Conversion(e.to_string()))?;
        Ok(())
    }

    fn store_table_schema_inner(&mut self, schema: &TableSchema) -> Result<()> {
        let table_id = self.require_catalog_id(&schema.name)?;

        // field renames show up as position-wise name differences against
        // the stored layout; the physical column is renamed in place
        let stored = self.stored_field_names(table_id)?;
        if stored.len() != schema.field_count() {
            return Err(SqliteError::Conversion(format!(
                "field count changed for '{}': {} stored, {} given",
                schema.name,
                stored.len(),
                schema.field_count()
            )));
        }
        for (old_name, field) in stored.iter().zip(schema.fields()) {
            if !old_name.eq_ignore_ascii_case(&field.name) {
                self.conn.execute_batch(&format!(
                    "ALTER TABLE {} RENAME COLUMN {} TO {}",
                    quote_ident(&schema.name),
                    quote_ident(old_name),
                    quote_ident(&field.name)
                ))?;
                self.conn.execute(
                    &format!(
                        "UPDATE {}extended_properties SET field_name = ?1 \
                         WHERE table_id = ?2 AND field_name = ?3",
                        self.prefix
                    ),
                    params![field.name, table_id, old_name],
                )?;
            }
        }

        self.write_fields(table_id, schema)
    }

    fn store_extended_inner(&mut self, schema: &TableSchema) -> Result<()> {
        let table_id = self.require_catalog_id(&schema.name)?;

        // defaultWidth / visibleDecimalPlaces are presentation metadata and
        // are persisted on this path, not the main-catalog one
        let mut stmt = self.conn.prepare(&format!(
            "UPDATE {}fields SET default_width = ?1, visible_decimal_places = ?2 \
             WHERE table_id = ?3 AND name = ?4",
            self.prefix
        ))?;
        for field in schema.fields() {
            stmt.execute(params![
                field.default_width,
                field.visible_decimal_places,
                table_id,
                field.name,
            ])?;
        }
        drop(stmt);

        self.write_extended(table_id, schema)
    }
}

impl SchemaConnection for SqliteBackend {
    fn is_read_only(&self) -> bool {
        self.conn.is_readonly(c"main").unwrap_or(false)
    }

    fn is_database_used(&self) -> bool {
        true
    }

    fn table_schema(&mut self, name: &str) -> std::result::Result<Option<TableSchema>, BackendError> {
        Ok(self.load_schema(name)?)
    }

    fn begin_transaction(&mut self) -> std::result::Result<(), BackendError> {
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(SqliteError::from)?;
        Ok(())
    }

    fn commit_transaction(&mut self) -> std::result::Result<(), BackendError> {
        self.conn
            .execute_batch("COMMIT")
            .map_err(SqliteError::from)?;
        Ok(())
    }

    fn rollback_transaction(&mut self) -> std::result::Result<(), BackendError> {
        self.conn
            .execute_batch("ROLLBACK")
            .map_err(SqliteError::from)?;
        Ok(())
    }

    fn create_table(
        &mut self,
        schema: &mut TableSchema,
        replace_existing: bool,
    ) -> std::result::Result<(), BackendError> {
        Ok(self.create_table_inner(schema, replace_existing)?)
    }

    fn alter_table_name(
        &mut self,
        schema: &mut TableSchema,
        new_name: &str,
        replace_existing: bool,
    ) -> std::result::Result<(), BackendError> {
        Ok(self.alter_table_name_inner(schema, new_name, replace_existing)?)
    }

    fn store_table_schema(&mut self, schema: &TableSchema) -> std::result::Result<(), BackendError> {
        Ok(self.store_table_schema_inner(schema)?)
    }

    fn store_extended_table_schema_data(
        &mut self,
        schema: &TableSchema,
    ) -> std::result::Result<(), BackendError> {
        Ok(self.store_extended_inner(schema)?)
    }

    fn temporary_table_name(&mut self, base: &str) -> std::result::Result<String, BackendError> {
        // probe both the catalog and sqlite_master: a physical table may
        // exist outside the catalog
        for n in 1.. {
            let candidate = format!("__temp{n}__{base}");
            let in_catalog = self.catalog_id(&candidate).map_err(BackendError::from)?;
            let physical = self
                .physical_table_exists(&candidate)
                .map_err(BackendError::from)?;
            if in_catalog.is_none() && !physical {
                return Ok(candidate);
            }
        }
        unreachable!()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use table_alter_core::{Field, FieldType};

    fn backend() -> SqliteBackend {
        let mut backend = SqliteBackend::open_in_memory("ta_").unwrap();
        backend.init_catalog().unwrap();
        backend
    }

    fn cars() -> TableSchema {
        TableSchema::new("cars")
            .with_field(
                Field::new("id", FieldType::Integer)
                    .primary_key()
                    .auto_increment(),
            )
            .with_field(Field::new("model", FieldType::Text).with_max_length(200))
    }

    #[test]
    fn test_invalid_prefix_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(SqliteBackend::new(conn, "bad prefix").is_err());
    }

    #[test]
    fn test_create_and_load_round_trip() {
        let mut backend = backend();
        let mut schema = cars();
        backend.create_table(&mut schema, false).unwrap();
        assert!(schema.id.is_some());

        let loaded = backend.table_schema("cars").unwrap().unwrap();
        assert_eq!(loaded, schema);
        // physical table exists too
        assert!(backend.physical_table_exists("cars").unwrap());
    }

    #[test]
    fn test_create_existing_without_replace_fails() {
        let mut backend = backend();
        backend.create_table(&mut cars(), false).unwrap();
        assert!(backend.create_table(&mut cars(), false).is_err());
        assert!(backend.create_table(&mut cars(), true).is_ok());
    }

    #[test]
    fn test_alter_table_name_replaces_displaced() {
        let mut backend = backend();
        let mut schema = cars();
        backend.create_table(&mut schema, false).unwrap();
        let mut other = TableSchema::new("old_cars")
            .with_field(Field::new("id", FieldType::Integer).primary_key());
        backend.create_table(&mut other, false).unwrap();

        backend
            .alter_table_name(&mut schema, "old_cars", true)
            .unwrap();
        assert_eq!(schema.name, "old_cars");
        assert!(backend.table_schema("cars").unwrap().is_none());
        let loaded = backend.table_schema("old_cars").unwrap().unwrap();
        assert_eq!(loaded.field_count(), 2);
    }

    #[test]
    fn test_store_table_schema_renames_column() {
        let mut backend = backend();
        let mut schema = cars();
        backend.create_table(&mut schema, false).unwrap();

        schema.field_mut("model").unwrap().name = "model_name".to_string();
        backend.store_table_schema(&schema).unwrap();

        let loaded = backend.table_schema("cars").unwrap().unwrap();
        assert!(loaded.field("model_name").is_some());
        // physical column followed the rename
        let count: i64 = backend
            .connection()
            .query_row(
                "SELECT count(*) FROM pragma_table_info('cars') WHERE name = 'model_name'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_temporary_table_name_skips_taken() {
        let mut backend = backend();
        let mut taken = TableSchema::new("__temp1__cars")
            .with_field(Field::new("id", FieldType::Integer));
        backend.create_table(&mut taken, false).unwrap();
        let name = backend.temporary_table_name("cars").unwrap();
        assert_eq!(name, "__temp2__cars");
    }
}
