//! Declarative schema-change actions.
//!
//! A [`ChangeAction`] is one atomic, declarative schema edit. Actions are
//! immutable once constructed; an ordered list of them forms an alteration
//! plan (see [`AlterTableHandler`](crate::AlterTableHandler)), applied
//! strictly left-to-right to a working copy of the target schema.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Field, Requirements, classify_property};

/// One atomic, declarative schema edit.
///
/// Plans serialize naturally to JSON:
///
/// ```
/// use table_alter_core::ChangeAction;
///
/// let plan: Vec<ChangeAction> = serde_json::from_str(
///     r#"[
///         {"action": "changeFieldProperty",
///          "field": "model", "property": "caption", "value": "Model"},
///         {"action": "removeField", "field": "year"}
///     ]"#,
/// ).unwrap();
/// assert_eq!(plan.len(), 2);
/// assert_eq!(plan[1].field_name(), "year");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ChangeAction {
    /// Set one named property of an existing field to a new value.
    #[serde(rename_all = "camelCase")]
    ChangeFieldProperty {
        /// Target field name.
        field: String,
        /// Property to change.
        property: String,
        /// New value.
        value: Value,
    },
    /// Remove an existing field.
    #[serde(rename_all = "camelCase")]
    RemoveField {
        /// Target field name.
        field: String,
    },
    /// Insert a new field at a position. Owns the full field definition.
    #[serde(rename_all = "camelCase")]
    InsertField {
        /// Position to insert at; `field_count()` appends.
        index: usize,
        /// The field to insert.
        field: Field,
    },
    /// Move an existing field to a new position, preserving the relative
    /// order of all other fields.
    #[serde(rename_all = "camelCase")]
    MoveFieldPosition {
        /// Target field name.
        field: String,
        /// The field's final position.
        index: usize,
    },
}

impl ChangeAction {
    /// The name of the field this action targets.
    ///
    /// For [`InsertField`](ChangeAction::InsertField) this is the inserted
    /// field's own name.
    pub fn field_name(&self) -> &str {
        match self {
            ChangeAction::ChangeFieldProperty { field, .. } => field,
            ChangeAction::RemoveField { field } => field,
            ChangeAction::InsertField { field, .. } => &field.name,
            ChangeAction::MoveFieldPosition { field, .. } => field,
        }
    }

    /// The requirement categories this action individually demands.
    ///
    /// Property changes delegate to [`classify_property`]. Inserting or
    /// removing a column always forces a physical rebuild. A move declares
    /// only catalog metadata here; the workspace diff escalates reorders to
    /// a rebuild when column order actually changes.
    pub fn requirements(&self) -> Requirements {
        match self {
            ChangeAction::ChangeFieldProperty { property, .. } => classify_property(property),
            ChangeAction::RemoveField { .. } => Requirements::PHYSICAL,
            ChangeAction::InsertField { .. } => Requirements::PHYSICAL,
            ChangeAction::MoveFieldPosition { .. } => Requirements::MAIN_SCHEMA,
        }
    }

    /// Human-readable one-line description for diagnostics.
    pub fn describe(&self) -> String {
        match self {
            ChangeAction::ChangeFieldProperty {
                field,
                property,
                value,
            } => {
                format!("Set \"{property}\" property for table field \"{field}\" to \"{value}\"")
            }
            ChangeAction::RemoveField { field } => {
                format!("Remove table field \"{field}\"")
            }
            ChangeAction::InsertField { index, field } => {
                format!("Insert table field \"{}\" at position {index}", field.name)
            }
            ChangeAction::MoveFieldPosition { field, index } => {
                format!("Move table field \"{field}\" to position {index}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::FieldType;

    use super::*;

    #[test]
    fn test_remove_and_insert_force_physical() {
        let remove = ChangeAction::RemoveField {
            field: "age".to_string(),
        };
        assert_eq!(remove.requirements(), Requirements::PHYSICAL);

        let insert = ChangeAction::InsertField {
            index: 0,
            field: Field::new("age", FieldType::Integer),
        };
        assert_eq!(insert.requirements(), Requirements::PHYSICAL);
    }

    #[test]
    fn test_move_is_main_schema_only() {
        let action = ChangeAction::MoveFieldPosition {
            field: "age".to_string(),
            index: 2,
        };
        assert_eq!(action.requirements(), Requirements::MAIN_SCHEMA);
    }

    #[test]
    fn test_change_property_delegates_to_classifier() {
        let action = ChangeAction::ChangeFieldProperty {
            field: "age".to_string(),
            property: "caption".to_string(),
            value: json!("Age"),
        };
        assert_eq!(action.requirements(), Requirements::MAIN_SCHEMA);

        let action = ChangeAction::ChangeFieldProperty {
            field: "age".to_string(),
            property: "type".to_string(),
            value: json!("bigInteger"),
        };
        assert!(action
            .requirements()
            .contains(Requirements::PHYSICAL | Requirements::DATA_CONVERSION));
    }

    #[test]
    fn test_field_name_of_insert_is_the_new_fields_name() {
        let action = ChangeAction::InsertField {
            index: 1,
            field: Field::new("age", FieldType::Integer),
        };
        assert_eq!(action.field_name(), "age");
    }

    #[test]
    fn test_describe_wording() {
        let action = ChangeAction::RemoveField {
            field: "age".to_string(),
        };
        assert_eq!(action.describe(), "Remove table field \"age\"");

        let action = ChangeAction::MoveFieldPosition {
            field: "age".to_string(),
            index: 2,
        };
        assert_eq!(action.describe(), "Move table field \"age\" to position 2");
    }

    #[test]
    fn test_action_serde_round_trip() {
        let actions = vec![
            ChangeAction::ChangeFieldProperty {
                field: "model".to_string(),
                property: "maxLength".to_string(),
                value: json!(100),
            },
            ChangeAction::InsertField {
                index: 2,
                field: Field::new("year", FieldType::Integer),
            },
        ];
        let json = serde_json::to_string(&actions).unwrap();
        let back: Vec<ChangeAction> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, actions);
    }
}
