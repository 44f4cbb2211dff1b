use thiserror::Error;

/// The cause of a failed remote call, kept verbatim for the caller.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by resource adapters and the reconciliation step.
///
/// None of these are retried internally. Remote not-found during Read and
/// Delete is not an error at all; see [`crate::framework::ReadOutcome`].
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("invalid value for field {field}: {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("invalid import identifier {id:?} (expected {expected})")]
    InvalidImportFormat { id: String, expected: String },

    #[error("{kind} {id} not found")]
    ReferenceNotFound { kind: String, id: String },

    #[error("{operation} failed for {id}: {source}")]
    RemoteCallFailed {
        operation: String,
        id: String,
        #[source]
        source: BoxError,
    },

    #[error("cannot upgrade state from schema version {from_version}: {reason}")]
    SchemaUpgradeError { from_version: u64, reason: String },

    #[error("field {field} cannot be updated in place; the resource must be replaced")]
    ReplacementRequired { field: String },

    #[error("{operation} requires a resource id, but the record has none")]
    MissingId { operation: String },
}

impl ReconcileError {
    pub fn invalid_value(
        field: impl Into<String>,
        value: impl std::fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        ReconcileError::InvalidValue {
            field: field.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub fn reference_not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        ReconcileError::ReferenceNotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    pub fn remote(
        operation: impl Into<String>,
        id: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        ReconcileError::RemoteCallFailed {
            operation: operation.into(),
            id: id.into(),
            source: source.into(),
        }
    }

    pub fn upgrade(from_version: u64, reason: impl Into<String>) -> Self {
        ReconcileError::SchemaUpgradeError {
            from_version,
            reason: reason.into(),
        }
    }

    /// Whether reconciliation of the record must stop and wait for manual
    /// intervention.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ReconcileError::SchemaUpgradeError { .. })
    }
}

pub type Result<T, E = ReconcileError> = std::result::Result<T, E>;
