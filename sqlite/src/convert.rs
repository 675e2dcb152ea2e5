//! Field-to-row and schema-to-DDL conversion.
//!
//! Catalog rows store every core field property as a column; `default_value`
//! and extended property values are JSON text. Physical DDL maps the
//! engine's field types onto SQLite's storage classes.

use rusqlite::Row;
use serde_json::Value;
use table_alter_core::{Field, FieldType, TableSchema};

use crate::error::{Result, SqliteError};

/// SQLite column type for a field type.
pub(crate) fn sql_type(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::Byte
        | FieldType::ShortInteger
        | FieldType::Integer
        | FieldType::BigInteger
        | FieldType::Boolean => "INTEGER",
        FieldType::Float | FieldType::Double => "REAL",
        FieldType::Date | FieldType::DateTime | FieldType::Time => "TEXT",
        FieldType::Text | FieldType::LongText => "TEXT",
        FieldType::Blob => "BLOB",
    }
}

/// Double-quotes an identifier for use in generated SQL.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn default_literal(value: &Value) -> Result<String> {
    match value {
        Value::Null => Ok("NULL".to_string()),
        Value::Bool(b) => Ok(if *b { "1" } else { "0" }.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(format!("'{}'", s.replace('\'', "''"))),
        Value::Array(_) | Value::Object(_) => Err(SqliteError::Conversion(format!(
            "default value must be scalar, got: {value}"
        ))),
    }
}

fn column_def(field: &Field) -> Result<String> {
    // the rowid alias form is required for AUTOINCREMENT
    if field.primary_key && field.auto_increment && field.field_type.is_numeric() {
        return Ok(format!(
            "{} INTEGER PRIMARY KEY AUTOINCREMENT",
            quote_ident(&field.name)
        ));
    }

    let mut def = format!("{} {}", quote_ident(&field.name), sql_type(field.field_type));
    if field.not_null {
        def.push_str(" NOT NULL");
    }
    if field.unique && !field.primary_key {
        def.push_str(" UNIQUE");
    }
    if let Some(value) = &field.default_value {
        def.push_str(" DEFAULT ");
        def.push_str(&default_literal(value)?);
    }
    Ok(def)
}

/// Generates `CREATE TABLE` DDL for the physical table behind `schema`.
///
/// # Errors
///
/// Returns [`SqliteError::Conversion`] for a schema with no fields or a
/// non-scalar default value.
pub(crate) fn create_table_sql(schema: &TableSchema) -> Result<String> {
    if schema.fields().is_empty() {
        return Err(SqliteError::Conversion(format!(
            "table '{}' has no fields",
            schema.name
        )));
    }

    let mut parts: Vec<String> = Vec::with_capacity(schema.field_count() + 1);
    for field in schema.fields() {
        parts.push(column_def(field)?);
    }

    let pk_names: Vec<String> = schema
        .fields()
        .iter()
        .filter(|f| f.primary_key && !f.auto_increment)
        .map(|f| quote_ident(&f.name))
        .collect();
    if !pk_names.is_empty() {
        parts.push(format!("PRIMARY KEY ({})", pk_names.join(", ")));
    }

    Ok(format!(
        "CREATE TABLE {} (\n    {}\n)",
        quote_ident(&schema.name),
        parts.join(",\n    ")
    ))
}

/// Whether a field gets its own secondary index (unique and primary-key
/// fields are already indexed by their constraints).
pub(crate) fn needs_index(field: &Field) -> bool {
    field.indexed && !field.unique && !field.primary_key
}

/// Index name for an indexed field of the named table.
pub(crate) fn index_name(table: &str, field: &str) -> String {
    format!("idx_{table}_{field}")
}

/// Generates `CREATE INDEX` statements for indexed non-unique fields.
pub(crate) fn create_index_sql(schema: &TableSchema) -> Vec<String> {
    schema
        .fields()
        .iter()
        .filter(|f| needs_index(f))
        .map(|f| {
            format!(
                "CREATE INDEX {} ON {} ({})",
                quote_ident(&index_name(&schema.name, &f.name)),
                quote_ident(&schema.name),
                quote_ident(&f.name)
            )
        })
        .collect()
}

/// Serializes a JSON value to its catalog text form.
pub(crate) fn value_to_text(value: &Value) -> Result<String> {
    serde_json::to_string(value).map_err(|e| SqliteError::Conversion(e.to_string()))
}

/// Parses catalog JSON text back into a value.
pub(crate) fn text_to_value(text: &str) -> Result<Value> {
    serde_json::from_str(text).map_err(|e| {
        SqliteError::Conversion(format!("invalid JSON in catalog: {text}: {e}"))
    })
}

/// Reconstructs a [`Field`] from a `{prefix}fields` row.
///
/// Column order must match the SELECT in the connection module.
pub(crate) fn field_from_row(row: &Row<'_>) -> Result<Field> {
    let name: String = row.get(0)?;
    let type_name: String = row.get(1)?;
    let field_type: FieldType = type_name
        .parse()
        .map_err(|e: table_alter_core::SchemaError| SqliteError::Conversion(e.to_string()))?;

    let mut field = Field::new(&name, field_type);
    field.caption = row.get(2)?;
    field.description = row.get(3)?;
    field.max_length = row.get(4)?;
    field.precision = row.get(5)?;
    field.unsigned = row.get(6)?;
    field.primary_key = row.get(7)?;
    field.unique = row.get(8)?;
    field.not_null = row.get(9)?;
    field.allow_empty = row.get(10)?;
    field.auto_increment = row.get(11)?;
    field.indexed = row.get(12)?;
    let default_text: Option<String> = row.get(13)?;
    field.default_value = match default_text {
        Some(text) => Some(text_to_value(&text)?),
        None => None,
    };
    field.default_width = row.get(14)?;
    field.visible_decimal_places = row.get(15)?;
    Ok(field)
}
