use wsm_store::StoreError;
use wsm_types::{EventHash, OperationHash, RecordId};

/// Why a lookup came back empty.
///
/// Callers that only render a 404-equivalent can ignore this; callers that
/// need to tell an unknown id from one without confirmed state can match on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundReason {
    /// No operation was ever stored for the record.
    UnknownRecord,
    /// Operations exist, but none belongs to a consensus event within the
    /// requested height ceiling.
    NoConfirmedHistory,
    /// No object with the id was ever projected.
    UnknownObject,
    /// The object was projected and later marked deleted.
    DeletedObject,
}

/// Errors produced by the state machine and the operation storage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("failed to get history for record {record_id}")]
    HistoryNotFound {
        record_id: RecordId,
        max_block_height: Option<u64>,
        reason: NotFoundReason,
    },

    #[error("an object with id {object_id} does not exist")]
    ObjectNotFound {
        object_id: String,
        reason: NotFoundReason,
    },

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("duplicate operation {operation_hash} in event {event_hash}")]
    Duplicate {
        event_hash: EventHash,
        operation_hash: OperationHash,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl StateError {
    /// Returns `true` for every "absent" failure: record history, object,
    /// or an upstream entity such as a block or event.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::HistoryNotFound { .. } | Self::ObjectNotFound { .. } => true,
            Self::Store(err) => err.is_not_found(),
            _ => false,
        }
    }

    /// The distinguishing reason of a record or object not-found error.
    pub fn not_found_reason(&self) -> Option<NotFoundReason> {
        match self {
            Self::HistoryNotFound { reason, .. } | Self::ObjectNotFound { reason, .. } => {
                Some(*reason)
            }
            _ => None,
        }
    }
}

/// Result alias for state machine operations.
pub type StateResult<T> = Result<T, StateError>;
