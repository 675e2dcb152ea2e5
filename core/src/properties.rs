//! Field property enumeration and assignment.
//!
//! Alteration planning treats a [`Field`] as an ordered bag of named
//! properties. [`field_properties`] flattens a field into that bag;
//! [`set_field_property`] applies one named property back onto a field with
//! type checking. Both sides of a schema diff enumerate the same key
//! sequence — core properties in fixed declaration order, then the known
//! extended property names, then any remaining custom entries in name
//! order — so the requirement computation can walk two property lists in
//! lockstep.
//!
//! Extended properties are driver-specific metadata stored outside the main
//! catalog (lookup-column configuration and similar).
//! [`is_extended_field_property`] recognizes their names.

use serde_json::Value;
use thiserror::Error;

use crate::{Field, FieldType};

/// Core property names, in enumeration order.
pub const CORE_PROPERTIES: [&str; 16] = [
    "name",
    "type",
    "caption",
    "description",
    "maxLength",
    "precision",
    "unsigned",
    "primaryKey",
    "unique",
    "notNull",
    "allowEmpty",
    "autoIncrement",
    "indexed",
    "defaultValue",
    "defaultWidth",
    "visibleDecimalPlaces",
];

/// Known extended (driver-specific) property names, in enumeration order.
///
/// These cover lookup-column metadata; they are always enumerated (as null
/// when unset) so that setting one on a working copy never changes the
/// property-list shape relative to the original field.
pub const EXTENDED_PROPERTIES: [&str; 10] = [
    "boundColumn",
    "columnWidths",
    "displayWidget",
    "limitToList",
    "listRows",
    "rowSource",
    "rowSourceType",
    "rowSourceValues",
    "showColumnHeaders",
    "visibleColumn",
];

/// Errors raised when assigning a field property.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyError {
    /// The property name is neither a core nor an extended property.
    #[error("unknown field property: {0}")]
    UnknownProperty(String),
    /// The value has the wrong type for the property.
    #[error("invalid value for property \"{property}\": expected {expected}")]
    InvalidValue {
        /// The property being assigned.
        property: String,
        /// Human-readable description of the expected value shape.
        expected: &'static str,
    },
}

/// Checks whether `name` is a driver-specific extended property.
///
/// Extended properties are persisted through a side channel
/// ([`SchemaConnection::store_extended_table_schema_data`](crate::SchemaConnection::store_extended_table_schema_data))
/// rather than the main catalog. The comparison is case-insensitive.
pub fn is_extended_field_property(name: &str) -> bool {
    EXTENDED_PROPERTIES
        .iter()
        .any(|p| p.eq_ignore_ascii_case(name))
}

fn opt_string(value: &Option<String>) -> Value {
    value.as_ref().map_or(Value::Null, |s| Value::from(s.clone()))
}

fn opt_u32(value: &Option<u32>) -> Value {
    value.map_or(Value::Null, Value::from)
}

/// Returns the full ordered property list of a field.
///
/// Core properties come first in [`CORE_PROPERTIES`] order, then the known
/// extended names ([`EXTENDED_PROPERTIES`], null when unset), then any
/// custom extended entries in name order. Unset optional properties
/// enumerate as [`Value::Null`], never disappear — two fields that differ
/// only in values always produce lists with identical key sequences.
pub fn field_properties(field: &Field) -> Vec<(String, Value)> {
    let mut props: Vec<(String, Value)> = vec![
        ("name".into(), Value::from(field.name.clone())),
        ("type".into(), Value::from(field.field_type.name())),
        ("caption".into(), opt_string(&field.caption)),
        ("description".into(), opt_string(&field.description)),
        ("maxLength".into(), opt_u32(&field.max_length)),
        ("precision".into(), opt_u32(&field.precision)),
        ("unsigned".into(), Value::from(field.unsigned)),
        ("primaryKey".into(), Value::from(field.primary_key)),
        ("unique".into(), Value::from(field.unique)),
        ("notNull".into(), Value::from(field.not_null)),
        ("allowEmpty".into(), Value::from(field.allow_empty)),
        ("autoIncrement".into(), Value::from(field.auto_increment)),
        ("indexed".into(), Value::from(field.indexed)),
        (
            "defaultValue".into(),
            field.default_value.clone().unwrap_or(Value::Null),
        ),
        ("defaultWidth".into(), opt_u32(&field.default_width)),
        (
            "visibleDecimalPlaces".into(),
            opt_u32(&field.visible_decimal_places),
        ),
    ];
    for name in EXTENDED_PROPERTIES {
        props.push((
            name.to_string(),
            field.extended.get(name).cloned().unwrap_or(Value::Null),
        ));
    }
    for (name, value) in &field.extended {
        if !is_extended_field_property(name) {
            props.push((name.clone(), value.clone()));
        }
    }
    props
}

fn expect_string(property: &str, value: &Value) -> Result<String, PropertyError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| PropertyError::InvalidValue {
            property: property.to_string(),
            expected: "string",
        })
}

fn expect_opt_string(property: &str, value: &Value) -> Result<Option<String>, PropertyError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        _ => Err(PropertyError::InvalidValue {
            property: property.to_string(),
            expected: "string or null",
        }),
    }
}

fn expect_opt_u32(property: &str, value: &Value) -> Result<Option<u32>, PropertyError> {
    match value {
        Value::Null => Ok(None),
        _ => value
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| PropertyError::InvalidValue {
                property: property.to_string(),
                expected: "unsigned integer or null",
            }),
    }
}

fn expect_bool(property: &str, value: &Value) -> Result<bool, PropertyError> {
    value.as_bool().ok_or_else(|| PropertyError::InvalidValue {
        property: property.to_string(),
        expected: "boolean",
    })
}

/// Assigns one named property on a field.
///
/// Property names are matched case-insensitively. Core properties are type
/// checked against the field's struct shape; extended properties accept any
/// value and land in the [`extended`](Field::extended) bag (null removes
/// the entry).
///
/// # Errors
///
/// Returns [`PropertyError::UnknownProperty`] for a name that is neither a
/// core nor an extended property, or [`PropertyError::InvalidValue`] when
/// the value shape does not fit.
pub fn set_field_property(
    field: &mut Field,
    property: &str,
    value: &Value,
) -> Result<(), PropertyError> {
    match property.to_ascii_lowercase().as_str() {
        "name" => {
            let name = expect_string(property, value)?;
            if name.trim().is_empty() {
                return Err(PropertyError::InvalidValue {
                    property: property.to_string(),
                    expected: "non-empty string",
                });
            }
            field.name = name;
        }
        "type" => {
            let s = expect_string(property, value)?;
            field.field_type =
                s.parse::<FieldType>()
                    .map_err(|_| PropertyError::InvalidValue {
                        property: property.to_string(),
                        expected: "field type name",
                    })?;
        }
        "caption" => field.caption = expect_opt_string(property, value)?,
        "description" => field.description = expect_opt_string(property, value)?,
        "maxlength" => field.max_length = expect_opt_u32(property, value)?,
        "precision" => field.precision = expect_opt_u32(property, value)?,
        "unsigned" => field.unsigned = expect_bool(property, value)?,
        "primarykey" => field.primary_key = expect_bool(property, value)?,
        "unique" => field.unique = expect_bool(property, value)?,
        "notnull" => field.not_null = expect_bool(property, value)?,
        "allowempty" => field.allow_empty = expect_bool(property, value)?,
        "autoincrement" => field.auto_increment = expect_bool(property, value)?,
        "indexed" => field.indexed = expect_bool(property, value)?,
        "defaultvalue" => {
            field.default_value = if value.is_null() {
                None
            } else {
                Some(value.clone())
            };
        }
        "defaultwidth" => field.default_width = expect_opt_u32(property, value)?,
        "visibledecimalplaces" => field.visible_decimal_places = expect_opt_u32(property, value)?,
        _ => {
            if !is_extended_field_property(property) {
                return Err(PropertyError::UnknownProperty(property.to_string()));
            }
            // canonicalize the key so diffs line up regardless of input case
            let key = EXTENDED_PROPERTIES
                .iter()
                .find(|p| p.eq_ignore_ascii_case(property))
                .copied()
                .unwrap_or(property);
            if value.is_null() {
                field.extended.remove(key);
            } else {
                field.extended.insert(key.to_string(), value.clone());
            }
        }
    }
    Ok(())
}

/// Assigns a batch of properties on a field, in iteration order.
///
/// Stops at the first failure.
pub fn set_field_properties<'a, I>(field: &mut Field, properties: I) -> Result<(), PropertyError>
where
    I: IntoIterator<Item = (&'a str, &'a Value)>,
{
    for (name, value) in properties {
        set_field_property(field, name, value)?;
    }
    Ok(())
}
