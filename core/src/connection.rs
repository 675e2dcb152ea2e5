//! The storage capability consumed by the alteration engine.
//!
//! The engine never talks SQL itself; it drives a [`SchemaConnection`],
//! which a storage backend (see the `table-alter-sqlite` crate) implements.
//! The engine assumes exclusive use of the connection for the duration of a
//! transaction and relies on the transaction boundary as its sole
//! concurrency-correctness mechanism.

use thiserror::Error;

use crate::TableSchema;

/// Opaque storage backend failure.
///
/// Backends convert their native errors into this type; the engine
/// propagates it unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("backend error: {0}")]
pub struct BackendError(pub String);

impl BackendError {
    /// Creates a backend error from any message.
    pub fn new(message: impl Into<String>) -> Self {
        BackendError(message.into())
    }
}

/// Capabilities the alteration engine requires from a storage backend.
///
/// **Transactionality caveat**: the engine wraps physical table creation
/// and the rename-over-original inside one transaction and expects
/// [`rollback_transaction`](SchemaConnection::rollback_transaction) to undo
/// both. Not every database engine supports transactional DDL; a backend
/// targeting one that does not must implement compensating cleanup inside
/// its primitives instead of relying on rollback.
pub trait SchemaConnection {
    /// Whether the connection forbids writes.
    fn is_read_only(&self) -> bool;

    /// Whether a database is currently open on this connection.
    fn is_database_used(&self) -> bool;

    /// Fetches the schema of the named table, or `None` if it does not
    /// exist.
    fn table_schema(&mut self, name: &str) -> Result<Option<TableSchema>, BackendError>;

    /// Opens a transaction.
    fn begin_transaction(&mut self) -> Result<(), BackendError>;

    /// Commits the open transaction.
    fn commit_transaction(&mut self) -> Result<(), BackendError>;

    /// Rolls back the open transaction.
    fn rollback_transaction(&mut self) -> Result<(), BackendError>;

    /// Materializes `schema` as a physical table and records it in the
    /// main catalog. With `replace_existing`, an existing table of the
    /// same name is dropped first; otherwise a name collision is an error.
    ///
    /// On success the backend assigns `schema.id`.
    fn create_table(
        &mut self,
        schema: &mut TableSchema,
        replace_existing: bool,
    ) -> Result<(), BackendError>;

    /// Renames the physical table described by `schema` to `new_name`,
    /// updating the catalog and `schema.name`. With `replace_existing`, a
    /// table already holding `new_name` is dropped first.
    fn alter_table_name(
        &mut self,
        schema: &mut TableSchema,
        new_name: &str,
        replace_existing: bool,
    ) -> Result<(), BackendError>;

    /// Rewrites the main catalog metadata for an existing table in place,
    /// without rebuilding the physical table. Backends rename physical
    /// columns as needed so the table matches `schema`.
    fn store_table_schema(&mut self, schema: &TableSchema) -> Result<(), BackendError>;

    /// Persists only the extended (driver-specific side-table) schema data
    /// for an existing table.
    fn store_extended_table_schema_data(&mut self, schema: &TableSchema)
    -> Result<(), BackendError>;

    /// Returns a collision-free temporary table name derived from `base`.
    ///
    /// The default implementation probes `__temp{n}__{base}` against
    /// [`table_schema`](SchemaConnection::table_schema) until a free name
    /// is found.
    fn temporary_table_name(&mut self, base: &str) -> Result<String, BackendError> {
        for n in 1.. {
            let candidate = format!("__temp{n}__{base}");
            if self.table_schema(&candidate)?.is_none() {
                return Ok(candidate);
            }
        }
        unreachable!()
    }
}
