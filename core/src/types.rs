//! Field and table schema type definitions.
//!
//! This module defines the core data model for table schemas: a
//! [`TableSchema`] is an ordered sequence of typed, named [`Field`]s. The
//! types are designed for serialization with [`serde`] and round-trip
//! through JSON and SQL catalog backends.
//!
//! Field names are unique within a schema (case-insensitive) and field
//! order is significant: it determines physical column order and the
//! semantics of position-based alteration actions.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Structural errors raised by schema mutation.
///
/// Each variant describes a specific violation of the schema invariants:
/// unique field names, valid positions, and non-empty identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A field with the same name (case-insensitive) already exists.
    #[error("duplicate field name: {0}")]
    DuplicateField(String),
    /// The named field does not exist in the schema.
    #[error("field not found: {0}")]
    FieldNotFound(String),
    /// A position is outside the valid range for the operation.
    #[error("index {index} out of range for {len} field(s)")]
    IndexOutOfRange {
        /// The requested position.
        index: usize,
        /// The current field count.
        len: usize,
    },
    /// A field or table name is empty or whitespace-only.
    #[error("name cannot be empty")]
    EmptyName,
    /// A string does not name a known field type.
    #[error("unknown field type: {0}")]
    UnknownFieldType(String),
}

/// Column data type.
///
/// A closed set of storage types. The string form (used in property maps,
/// serialization, and DDL generation) is the lower-camel name produced by
/// [`FieldType::name`].
///
/// # Examples
///
/// ```
/// use table_alter_core::FieldType;
///
/// assert_eq!(FieldType::Integer.name(), "integer");
/// assert_eq!("bigInteger".parse::<FieldType>().unwrap(), FieldType::BigInteger);
/// assert!(FieldType::Double.is_numeric());
/// assert!(FieldType::LongText.is_text());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    /// 8-bit integer.
    Byte,
    /// 16-bit integer.
    ShortInteger,
    /// 32-bit integer.
    Integer,
    /// 64-bit integer.
    BigInteger,
    /// Boolean.
    Boolean,
    /// Calendar date.
    Date,
    /// Date and time.
    DateTime,
    /// Time of day.
    Time,
    /// Single-precision floating point.
    Float,
    /// Double-precision floating point.
    Double,
    /// Short text (the default).
    #[default]
    Text,
    /// Unlimited-length text.
    LongText,
    /// Binary large object.
    Blob,
}

impl FieldType {
    /// All field types, in declaration order.
    pub const ALL: [FieldType; 13] = [
        FieldType::Byte,
        FieldType::ShortInteger,
        FieldType::Integer,
        FieldType::BigInteger,
        FieldType::Boolean,
        FieldType::Date,
        FieldType::DateTime,
        FieldType::Time,
        FieldType::Float,
        FieldType::Double,
        FieldType::Text,
        FieldType::LongText,
        FieldType::Blob,
    ];

    /// Returns the stable string form of this type.
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Byte => "byte",
            FieldType::ShortInteger => "shortInteger",
            FieldType::Integer => "integer",
            FieldType::BigInteger => "bigInteger",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::DateTime => "dateTime",
            FieldType::Time => "time",
            FieldType::Float => "float",
            FieldType::Double => "double",
            FieldType::Text => "text",
            FieldType::LongText => "longText",
            FieldType::Blob => "blob",
        }
    }

    /// Whether this is an integer or floating-point type.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldType::Byte
                | FieldType::ShortInteger
                | FieldType::Integer
                | FieldType::BigInteger
                | FieldType::Float
                | FieldType::Double
        )
    }

    /// Whether this is a text type.
    pub fn is_text(&self) -> bool {
        matches!(self, FieldType::Text | FieldType::LongText)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for FieldType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldType::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| SchemaError::UnknownFieldType(s.to_string()))
    }
}

/// One column definition: name, type, and property bag.
///
/// Core properties (caption, constraints, length/precision, default value)
/// are plain struct fields. Driver-specific "extended" properties — stored
/// outside the main catalog, e.g. lookup-column metadata — live in the
/// ordered [`extended`](Field::extended) map.
///
/// Use [`Field::new`] and the builder methods to construct fields:
///
/// ```
/// use table_alter_core::{Field, FieldType};
///
/// let id = Field::new("id", FieldType::Integer)
///     .primary_key()
///     .auto_increment();
/// assert!(id.primary_key);
///
/// let name = Field::new("name", FieldType::Text)
///     .with_caption("Name")
///     .with_max_length(200)
///     .not_null();
/// assert_eq!(name.max_length, Some(200));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    /// Field name, unique within a schema (case-insensitive).
    pub name: String,
    /// Column data type.
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Human-readable caption.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    /// Longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Maximum length for text types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    /// Decimal precision for floating-point types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    /// Unsigned flag for numeric types.
    #[serde(default)]
    pub unsigned: bool,
    /// Primary key membership.
    #[serde(default)]
    pub primary_key: bool,
    /// Uniqueness constraint.
    #[serde(default)]
    pub unique: bool,
    /// NOT NULL constraint.
    #[serde(default)]
    pub not_null: bool,
    /// Whether empty (zero-length) values are allowed.
    #[serde(default = "default_true")]
    pub allow_empty: bool,
    /// Auto-increment flag.
    #[serde(default)]
    pub auto_increment: bool,
    /// Secondary index flag.
    #[serde(default)]
    pub indexed: bool,
    /// Default value, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    /// Default display width (presentation metadata).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_width: Option<u32>,
    /// Visible decimal places (presentation metadata).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_decimal_places: Option<u32>,
    /// Driver-specific extended properties, ordered by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extended: BTreeMap<String, Value>,
}

fn default_true() -> bool {
    true
}

impl Field {
    /// Creates a field with the given name and type.
    ///
    /// All constraints default to off except `allow_empty`, which is on.
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            caption: None,
            description: None,
            max_length: None,
            precision: None,
            unsigned: false,
            primary_key: false,
            unique: false,
            not_null: false,
            allow_empty: true,
            auto_increment: false,
            indexed: false,
            default_value: None,
            default_width: None,
            visible_decimal_places: None,
            extended: BTreeMap::new(),
        }
    }

    /// Sets the caption.
    pub fn with_caption(mut self, caption: &str) -> Self {
        self.caption = Some(caption.to_string());
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Sets the maximum length.
    pub fn with_max_length(mut self, max_length: u32) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Sets the decimal precision.
    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = Some(precision);
        self
    }

    /// Sets the default value.
    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Marks as primary key (implies unique and not-null).
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.unique = true;
        self.not_null = true;
        self.allow_empty = false;
        self
    }

    /// Marks as unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Marks as NOT NULL.
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Marks as auto-incrementing.
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Marks as indexed.
    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    /// Sets an extended (driver-specific) property.
    pub fn with_extended(mut self, name: &str, value: Value) -> Self {
        self.extended.insert(name.to_string(), value);
        self
    }

    /// Checks whether this field's name matches `name` (case-insensitive).
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Ordered sequence of typed, named fields plus a table name and an
/// opaque identity.
///
/// Field order is significant: it determines physical column order. Field
/// names are unique within a schema, compared case-insensitively. All
/// mutating operations enforce both invariants.
///
/// # Examples
///
/// ```
/// use table_alter_core::{Field, FieldType, TableSchema};
///
/// let mut table = TableSchema::new("cars")
///     .with_field(Field::new("id", FieldType::Integer).primary_key())
///     .with_field(Field::new("model", FieldType::Text));
///
/// assert_eq!(table.field_count(), 2);
/// assert!(table.field("MODEL").is_some()); // case-insensitive
/// assert_eq!(table.index_of("model"), Some(1));
///
/// table.move_field("model", 0).unwrap();
/// assert_eq!(table.index_of("model"), Some(0));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSchema {
    /// Table name.
    pub name: String,
    /// Opaque catalog identity, assigned by the storage backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    fields: Vec<Field>,
}

impl TableSchema {
    /// Creates an empty schema with the given table name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            id: None,
            fields: Vec::new(),
        }
    }

    /// Appends a field, builder-style.
    ///
    /// # Panics
    ///
    /// Panics if a field with the same name already exists. Use
    /// [`add_field`](TableSchema::add_field) for fallible insertion.
    pub fn with_field(mut self, field: Field) -> Self {
        if let Err(e) = self.add_field(field) {
            panic!("with_field: {e}");
        }
        self
    }

    /// Read-only view of the fields, in order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Number of fields.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Finds a field by name (case-insensitive).
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.is_named(name))
    }

    /// Finds a field by name (case-insensitive), mutable.
    pub fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.is_named(name))
    }

    /// Returns the position of the named field, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.is_named(name))
    }

    /// Appends a field at the end.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateField`] if a field with the same
    /// name already exists, or [`SchemaError::EmptyName`] for an empty
    /// field name.
    pub fn add_field(&mut self, field: Field) -> Result<(), SchemaError> {
        let index = self.fields.len();
        self.insert_field(index, field)
    }

    /// Inserts a field at `index`, shifting later fields right.
    ///
    /// `index == field_count()` appends. An out-of-range index is an error,
    /// not a clamp.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::IndexOutOfRange`] when `index > field_count()`,
    /// [`SchemaError::DuplicateField`] on a name collision, or
    /// [`SchemaError::EmptyName`] for an empty field name.
    pub fn insert_field(&mut self, index: usize, field: Field) -> Result<(), SchemaError> {
        if field.name.trim().is_empty() {
            return Err(SchemaError::EmptyName);
        }
        if index > self.fields.len() {
            return Err(SchemaError::IndexOutOfRange {
                index,
                len: self.fields.len(),
            });
        }
        if self.field(&field.name).is_some() {
            return Err(SchemaError::DuplicateField(field.name.clone()));
        }
        self.fields.insert(index, field);
        Ok(())
    }

    /// Removes the named field and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::FieldNotFound`] if no field matches.
    pub fn remove_field(&mut self, name: &str) -> Result<Field, SchemaError> {
        let index = self
            .index_of(name)
            .ok_or_else(|| SchemaError::FieldNotFound(name.to_string()))?;
        Ok(self.fields.remove(index))
    }

    /// Moves the named field to `index`, preserving the relative order of
    /// all other fields.
    ///
    /// `index` is the field's final position and must be less than
    /// `field_count()`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::FieldNotFound`] if no field matches, or
    /// [`SchemaError::IndexOutOfRange`] for an invalid target position.
    pub fn move_field(&mut self, name: &str, index: usize) -> Result<(), SchemaError> {
        let from = self
            .index_of(name)
            .ok_or_else(|| SchemaError::FieldNotFound(name.to_string()))?;
        if index >= self.fields.len() {
            return Err(SchemaError::IndexOutOfRange {
                index,
                len: self.fields.len(),
            });
        }
        let field = self.fields.remove(from);
        self.fields.insert(index, field);
        Ok(())
    }

    /// Renames the table.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::EmptyName`] for an empty name.
    pub fn set_name(&mut self, name: &str) -> Result<(), SchemaError> {
        if name.trim().is_empty() {
            return Err(SchemaError::EmptyName);
        }
        self.name = name.to_string();
        Ok(())
    }

    /// Creates a working copy of this schema without the catalog identity.
    pub fn clone_without_id(&self) -> Self {
        let mut copy = self.clone();
        copy.id = None;
        copy
    }
}
