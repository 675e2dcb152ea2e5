//! Engine error type.

use thiserror::Error;

use crate::{BackendError, PropertyError, SchemaError};

/// Errors raised while planning or executing a table alteration.
///
/// Precondition violations (missing table or field, read-only connection)
/// are distinct from internal-consistency violations
/// ([`InconsistentProperties`](AlterError::InconsistentProperties)), which
/// indicate a working copy whose property lists no longer line up with the
/// original schema where they must.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AlterError {
    /// The connection forbids writes.
    #[error("connection is read-only")]
    ConnectionReadOnly,
    /// No database is open on the connection.
    #[error("no database in use on the connection")]
    DatabaseNotUsed,
    /// The alteration target does not exist.
    #[error("table not found: {0}")]
    TableNotFound(String),
    /// An action referenced a field absent from the working copy.
    #[error("action targets unknown field \"{field}\": {action}")]
    UnknownActionField {
        /// The missing field name.
        field: String,
        /// Description of the failing action.
        action: String,
    },
    /// The working copy was already detached or discarded.
    #[error("altered table workspace is detached")]
    Detached,
    /// Original and working-copy property lists disagree in shape where
    /// identical shapes are required. Internal consistency violation, not a
    /// user error.
    #[error("inconsistent property lists for field \"{field}\": {detail}")]
    InconsistentProperties {
        /// The working-copy field at the mismatching position.
        field: String,
        /// What disagreed.
        detail: String,
    },
    /// Structural schema mutation failure.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// Property assignment failure.
    #[error(transparent)]
    Property(#[from] PropertyError),
    /// Storage backend failure.
    #[error(transparent)]
    Backend(#[from] BackendError),
}
