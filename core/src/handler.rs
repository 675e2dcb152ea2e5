//! The alteration plan front door.
//!
//! An [`AlterTableHandler`] owns an ordered action list and a borrowed
//! storage connection. [`execute`](AlterTableHandler::execute) validates
//! preconditions, trial-applies the plan to a working copy, and — unless a
//! read-only mode is requested — hands the workspace to the backend for
//! transactional execution.

use tracing::debug;

use crate::{
    AlterError, AlteredTable, ChangeAction, Requirements, SchemaConnection, TableSchema,
};

/// Execution configuration for one [`AlterTableHandler::execute`] call.
///
/// `simulate` and `only_compute_requirements` are read-only modes: the plan
/// is applied to the working copy and requirements are computed, but no
/// externally visible change is made and the original table is returned
/// untouched.
#[derive(Debug, Clone)]
pub struct ExecutionArguments {
    /// Apply the plan and compute requirements, but change nothing.
    pub simulate: bool,
    /// Stop after computing the requirement set.
    pub only_compute_requirements: bool,
    /// Wrap execution in a backend transaction (default: true).
    pub within_transaction: bool,
}

impl Default for ExecutionArguments {
    fn default() -> Self {
        Self {
            simulate: false,
            only_compute_requirements: false,
            within_transaction: true,
        }
    }
}

/// Result of a successful [`AlterTableHandler::execute`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct AlterOutcome {
    /// The table after the call: the newly materialized table for a
    /// physical rebuild, the updated original for a metadata-only run, or
    /// the unchanged original for read-only modes and no-op plans.
    pub table: TableSchema,
    /// The computed aggregate requirement set.
    pub requirements: Requirements,
}

/// Ordered, owned sequence of [`ChangeAction`]s bound to a storage
/// connection.
///
/// # Examples
///
/// ```no_run
/// use table_alter_core::{
///     AlterTableHandler, ChangeAction, ExecutionArguments, SchemaConnection,
/// };
/// use serde_json::json;
///
/// fn shorten<C: SchemaConnection>(conn: &mut C) {
///     let mut handler = AlterTableHandler::new(conn);
///     handler
///         .add_action(ChangeAction::ChangeFieldProperty {
///             field: "model".into(),
///             property: "maxLength".into(),
///             value: json!(80),
///         })
///         .add_action(ChangeAction::RemoveField { field: "notes".into() });
///
///     let outcome = handler
///         .execute("cars", &ExecutionArguments::default())
///         .unwrap();
///     println!("requirements: {}", outcome.requirements);
/// }
/// ```
pub struct AlterTableHandler<'a, C: SchemaConnection> {
    conn: &'a mut C,
    actions: Vec<ChangeAction>,
}

impl<'a, C: SchemaConnection> AlterTableHandler<'a, C> {
    /// Creates a handler bound to `conn` with an empty plan.
    pub fn new(conn: &'a mut C) -> Self {
        Self {
            conn,
            actions: Vec::new(),
        }
    }

    /// Appends an action; chainable.
    pub fn add_action(&mut self, action: ChangeAction) -> &mut Self {
        self.actions.push(action);
        self
    }

    /// Read-only view of the plan, in application order.
    pub fn actions(&self) -> &[ChangeAction] {
        &self.actions
    }

    /// Removes and returns the action at `index`, or `None` when out of
    /// range.
    pub fn remove_action(&mut self, index: usize) -> Option<ChangeAction> {
        (index < self.actions.len()).then(|| self.actions.remove(index))
    }

    /// Drops all actions.
    pub fn clear(&mut self) {
        self.actions.clear();
    }

    /// Replaces the whole plan.
    pub fn set_actions(&mut self, actions: Vec<ChangeAction>) {
        self.actions = actions;
    }

    /// One-line-per-action description of the plan, for diagnostics.
    pub fn describe_actions(&self) -> String {
        self.actions
            .iter()
            .enumerate()
            .map(|(i, a)| format!("{}: {}", i + 1, a.describe()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Runs the plan against the named table.
    ///
    /// Sequence: validate preconditions (writable connection, open
    /// database, table exists), trial-apply every action in order to a
    /// working copy, then either stop (read-only modes) or execute the
    /// cheapest strategy transactionally through the backend.
    ///
    /// Any failure aborts before the external table is touched, or rolls
    /// the transaction back — externally the call is all-or-nothing.
    ///
    /// # Errors
    ///
    /// See [`AlterError`]; every precondition and consistency failure is a
    /// distinct variant.
    pub fn execute(
        &mut self,
        table_name: &str,
        args: &ExecutionArguments,
    ) -> Result<AlterOutcome, AlterError> {
        if self.conn.is_read_only() {
            return Err(AlterError::ConnectionReadOnly);
        }
        if !self.conn.is_database_used() {
            return Err(AlterError::DatabaseNotUsed);
        }
        let original = self
            .conn
            .table_schema(table_name)?
            .ok_or_else(|| AlterError::TableNotFound(table_name.to_string()))?;

        debug!(table = table_name, actions = self.actions.len(), "executing plan");
        let mut altered = AlteredTable::new(&original);
        for action in &self.actions {
            altered.apply_action(action)?;
        }

        if args.only_compute_requirements || args.simulate {
            let requirements = altered.compute_requirements()?;
            return Ok(AlterOutcome {
                table: original,
                requirements,
            });
        }

        let requirements = altered.execute(self.conn, args)?;
        Ok(AlterOutcome {
            table: altered.into_table(),
            requirements,
        })
    }
}
