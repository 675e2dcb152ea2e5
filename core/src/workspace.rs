//! Altered-table workspace: trial-apply actions, diff, execute.
//!
//! An [`AlteredTable`] owns a working copy of a table schema. Actions are
//! applied to the working copy only; nothing outside the workspace is
//! touched until [`AlteredTable::execute`] runs, and that runs inside the
//! backend's transaction boundary. After all actions are applied the
//! working copy is diffed field-by-field and property-by-property against
//! the original to compute the aggregate requirement set.
//!
//! Each working-copy field carries an origin index pointing at the original
//! field it was cloned from. Origins survive renames but not
//! remove-then-insert, which is what distinguishes "field X renamed" from
//! "a brand-new field that happens to reuse a removed field's name".

use tracing::debug;

use crate::properties::{field_properties, set_field_properties, set_field_property};
use crate::{
    AlterError, ChangeAction, ExecutionArguments, Requirements, SchemaConnection, SchemaError,
    TableSchema,
};

/// Working copy of a table schema with origin tracking.
///
/// Two states: *open* (working copy present, actions may be applied) and
/// *detached* (working copy handed off via
/// [`detach_new_table`](AlteredTable::detach_new_table) or discarded after a
/// metadata-only execution). Applying an action while detached is an error.
pub struct AlteredTable {
    original: TableSchema,
    working: Option<TableSchema>,
    /// For each working-copy position, the original field index it was
    /// cloned from; `None` for fields inserted by an action.
    origin: Vec<Option<usize>>,
}

impl AlteredTable {
    /// Creates a workspace over a deep copy of `original`.
    pub fn new(original: &TableSchema) -> Self {
        let working = original.clone_without_id();
        let origin = (0..original.field_count()).map(Some).collect();
        Self {
            original: original.clone(),
            working: Some(working),
            origin,
        }
    }

    /// The original schema the workspace was built from.
    pub fn original(&self) -> &TableSchema {
        &self.original
    }

    /// The working copy, if not yet detached.
    pub fn working(&self) -> Option<&TableSchema> {
        self.working.as_ref()
    }

    /// The original field index the working-copy field at `index` descends
    /// from, or `None` for inserted fields.
    pub fn origin_of(&self, index: usize) -> Option<usize> {
        self.origin.get(index).copied().flatten()
    }

    /// Applies one action to the working copy.
    ///
    /// # Errors
    ///
    /// Fails when the workspace is detached, the action targets a missing
    /// field, an index is out of range, or a property value is invalid. The
    /// working copy is left unchanged on failure.
    pub fn apply_action(&mut self, action: &ChangeAction) -> Result<(), AlterError> {
        let working = self.working.as_mut().ok_or(AlterError::Detached)?;
        debug!(action = %action.describe(), "applying");
        match action {
            ChangeAction::ChangeFieldProperty {
                field,
                property,
                value,
            } => {
                let index =
                    working
                        .index_of(field)
                        .ok_or_else(|| AlterError::UnknownActionField {
                            field: field.clone(),
                            action: action.describe(),
                        })?;
                // renames must not collide with another field
                if property.eq_ignore_ascii_case("name") {
                    if let Some(new_name) = value.as_str() {
                        if working.index_of(new_name).is_some_and(|i| i != index) {
                            return Err(SchemaError::DuplicateField(new_name.to_string()).into());
                        }
                    }
                }
                let target = working
                    .field_mut(field)
                    .ok_or_else(|| SchemaError::FieldNotFound(field.clone()))?;
                set_field_property(target, property, value)?;
            }
            ChangeAction::RemoveField { field } => {
                let index =
                    working
                        .index_of(field)
                        .ok_or_else(|| AlterError::UnknownActionField {
                            field: field.clone(),
                            action: action.describe(),
                        })?;
                working.remove_field(field)?;
                self.origin.remove(index);
            }
            ChangeAction::InsertField { index, field } => {
                working.insert_field(*index, field.clone())?;
                self.origin.insert(*index, None);
            }
            ChangeAction::MoveFieldPosition { field, index } => {
                let from =
                    working
                        .index_of(field)
                        .ok_or_else(|| AlterError::UnknownActionField {
                            field: field.clone(),
                            action: action.describe(),
                        })?;
                working.move_field(field, *index)?;
                let entry = self.origin.remove(from);
                self.origin.insert(*index, entry);
            }
        }
        Ok(())
    }

    /// Diffs the working copy against the original and returns the
    /// aggregate requirement set.
    ///
    /// Short-circuits to physical-rebuild when the field counts differ or
    /// when any position's origin no longer matches (reorder, or
    /// remove-then-insert identity change). Otherwise ORs the classifier's
    /// verdict for every property whose value changed.
    ///
    /// # Errors
    ///
    /// [`AlterError::InconsistentProperties`] when two same-origin fields
    /// enumerate different property lists — an internal-consistency
    /// violation, never a zero requirement.
    pub fn compute_requirements(&self) -> Result<Requirements, AlterError> {
        let working = self.working.as_ref().ok_or(AlterError::Detached)?;

        if working.field_count() != self.original.field_count() {
            debug!(
                original = self.original.field_count(),
                working = working.field_count(),
                "field counts differ, physical rebuild required"
            );
            return Ok(Requirements::PHYSICAL);
        }

        let mut requirements = Requirements::NONE;
        for (index, field) in working.fields().iter().enumerate() {
            if self.origin_of(index) != Some(index) {
                debug!(
                    field = %field.name,
                    index,
                    "origin mismatch, physical rebuild required"
                );
                return Ok(Requirements::PHYSICAL);
            }
            let orig_props = field_properties(&self.original.fields()[index]);
            let new_props = field_properties(field);
            if orig_props.len() != new_props.len() {
                return Err(AlterError::InconsistentProperties {
                    field: field.name.clone(),
                    detail: format!(
                        "property count {} differs from original {}",
                        new_props.len(),
                        orig_props.len()
                    ),
                });
            }
            for ((orig_name, orig_value), (new_name, new_value)) in
                orig_props.iter().zip(new_props.iter())
            {
                if orig_name != new_name {
                    return Err(AlterError::InconsistentProperties {
                        field: field.name.clone(),
                        detail: format!(
                            "property \"{new_name}\" where original has \"{orig_name}\""
                        ),
                    });
                }
                if orig_value != new_value {
                    let classified = crate::classify_property(orig_name);
                    debug!(
                        field = %field.name,
                        property = %orig_name,
                        requirements = %classified,
                        "property changed"
                    );
                    requirements |= classified;
                }
            }
        }
        Ok(requirements)
    }

    /// Copies every changed property from the working copy onto the
    /// original schema, in place. Metadata-only fast path; fields are
    /// matched through their origins, so renames land on the right field.
    fn copy_properties_to_original(&mut self) -> Result<(), AlterError> {
        let working = self.working.as_ref().ok_or(AlterError::Detached)?;
        if working.field_count() != self.original.field_count() {
            return Err(AlterError::InconsistentProperties {
                field: working.name.clone(),
                detail: "field counts differ, cannot copy properties in place".to_string(),
            });
        }

        let mut per_field_changes: Vec<Vec<(String, serde_json::Value)>> = Vec::new();
        for (index, field) in working.fields().iter().enumerate() {
            if self.origin_of(index) != Some(index) {
                return Err(AlterError::InconsistentProperties {
                    field: field.name.clone(),
                    detail: "origin mismatch, cannot copy properties in place".to_string(),
                });
            }
            let orig_props = field_properties(&self.original.fields()[index]);
            let new_props = field_properties(field);
            if orig_props.len() != new_props.len() {
                return Err(AlterError::InconsistentProperties {
                    field: field.name.clone(),
                    detail: format!(
                        "property count {} differs from original {}",
                        new_props.len(),
                        orig_props.len()
                    ),
                });
            }
            let mut changes = Vec::new();
            for ((orig_name, orig_value), (new_name, new_value)) in
                orig_props.iter().zip(new_props.iter())
            {
                if orig_name != new_name {
                    return Err(AlterError::InconsistentProperties {
                        field: field.name.clone(),
                        detail: format!(
                            "property \"{new_name}\" where original has \"{orig_name}\""
                        ),
                    });
                }
                if orig_value != new_value {
                    changes.push((new_name.clone(), new_value.clone()));
                }
            }
            per_field_changes.push(changes);
        }

        for (index, changes) in per_field_changes.iter().enumerate() {
            if changes.is_empty() {
                continue;
            }
            let name = self.original.fields()[index].name.clone();
            let target = self
                .original
                .field_mut(&name)
                .ok_or_else(|| SchemaError::FieldNotFound(name.clone()))?;
            set_field_properties(target, changes.iter().map(|(n, v)| (n.as_str(), v)))?;
        }
        Ok(())
    }

    /// Takes ownership of the working copy, leaving the workspace detached.
    pub fn detach_new_table(&mut self) -> Option<TableSchema> {
        self.origin.clear();
        self.working.take()
    }

    /// Consumes the workspace, returning the table the caller should see:
    /// the working copy if still attached (physical rebuild), otherwise the
    /// original (possibly updated in place by a metadata-only run).
    pub fn into_table(mut self) -> TableSchema {
        self.detach_new_table().unwrap_or(self.original)
    }

    /// Executes the cheapest strategy for the accumulated changes against
    /// the backend and returns the requirement set acted upon.
    ///
    /// Strategy selection:
    /// - physical bit set: materialize the working copy under a temporary
    ///   name, then rename it over the original table;
    /// - any other non-empty set: copy changed properties onto the original
    ///   schema, then rewrite the main catalog and/or the extended side
    ///   data as flagged, discarding the working copy;
    /// - empty set: no-op.
    ///
    /// With `args.within_transaction`, the whole sequence runs inside one
    /// backend transaction: committed on success, rolled back on any
    /// failure.
    pub fn execute<C: SchemaConnection>(
        &mut self,
        conn: &mut C,
        args: &ExecutionArguments,
    ) -> Result<Requirements, AlterError> {
        if args.within_transaction {
            conn.begin_transaction()?;
        }
        match self.execute_inner(conn) {
            Ok(requirements) => {
                if args.within_transaction {
                    if let Err(e) = conn.commit_transaction() {
                        let _ = conn.rollback_transaction();
                        return Err(e.into());
                    }
                }
                Ok(requirements)
            }
            Err(e) => {
                if args.within_transaction {
                    let _ = conn.rollback_transaction();
                }
                Err(e)
            }
        }
    }

    fn execute_inner<C: SchemaConnection>(
        &mut self,
        conn: &mut C,
    ) -> Result<Requirements, AlterError> {
        let requirements = self.compute_requirements()?;
        debug!(%requirements, "altering requirements");

        if requirements.contains(Requirements::PHYSICAL) {
            let working = self.working.as_mut().ok_or(AlterError::Detached)?;
            let original_name = self.original.name.clone();
            let temporary = conn.temporary_table_name(&original_name)?;
            working.set_name(&temporary)?;
            conn.create_table(working, false)?;
            conn.alter_table_name(working, &original_name, true)?;
            // the new table is the table now; origins are moot
            self.origin.clear();
        } else if !requirements.is_empty() {
            self.copy_properties_to_original()?;
            if requirements.contains(Requirements::MAIN_SCHEMA) {
                conn.store_table_schema(&self.original)?;
            }
            if requirements.contains(Requirements::EXTENDED_SCHEMA) {
                conn.store_extended_table_schema_data(&self.original)?;
            }
            self.working = None;
            self.origin.clear();
        } else {
            // no-op plan: the caller gets the untouched original back
            self.working = None;
            self.origin.clear();
        }

        Ok(requirements)
    }
}
