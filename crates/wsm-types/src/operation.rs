use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identity::{EventHash, OperationHash, RecordId};

/// Type of a record mutation.
///
/// Serialized as its bare name (`"Create"`, `"Update"`, `"Delete"`). Any
/// other name round-trips through [`OperationKind::Other`] so unknown
/// operation types never fail deserialization; replay treats them as no-ops.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
    Other(String),
}

impl OperationKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Create => "Create",
            Self::Update => "Update",
            Self::Delete => "Delete",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for OperationKind {
    fn from(name: String) -> Self {
        match name.as_str() {
            "Create" => Self::Create,
            "Update" => Self::Update,
            "Delete" => Self::Delete,
            _ => Self::Other(name),
        }
    }
}

impl From<OperationKind> for String {
    fn from(kind: OperationKind) -> Self {
        match kind {
            OperationKind::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single record mutation stored in the operation collection.
///
/// Operations are immutable once written, except for the `deleted` marker.
/// The pair `(event_hash, operation_hash)` is unique.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub record_id: RecordId,
    pub event_hash: EventHash,
    pub operation_hash: OperationHash,
    pub operation_type: OperationKind,
    #[serde(default)]
    pub payload: Value,
    /// Position of this operation inside its event. Unassigned until the
    /// event has been ordered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_order: Option<u32>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deleted: bool,
}

impl Operation {
    pub fn new(
        record_id: RecordId,
        event_hash: EventHash,
        operation_hash: OperationHash,
        operation_type: OperationKind,
        payload: Value,
    ) -> Self {
        Self {
            record_id,
            event_hash,
            operation_hash,
            operation_type,
            payload,
            event_order: None,
            deleted: false,
        }
    }

    /// Builder-style setter for the event order.
    pub fn with_event_order(mut self, order: u32) -> Self {
        self.event_order = Some(order);
        self
    }

    /// Returns `true` once an event order has been assigned.
    pub fn is_ordered(&self) -> bool {
        self.event_order.is_some()
    }
}
