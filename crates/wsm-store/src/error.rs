use wsm_types::{EventHash, OperationHash};

/// Errors from storage collections.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The requested entity was not found.
    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    /// A uniqueness constraint was violated on insert.
    #[error("duplicate operation {operation_hash} in event {event_hash}")]
    Duplicate {
        event_hash: EventHash,
        operation_hash: OperationHash,
    },

    /// An append would overwrite an existing entry (e.g. a block height).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Failure of the underlying storage backend (I/O, network, lock).
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(kind: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            kind,
            key: key.to_string(),
        }
    }

    /// Returns `true` if the requested entity does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
