use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identity::EventHash;
use crate::operation::OperationKind;

/// One operation as carried inside an event body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventOperation {
    #[serde(rename = "operation")]
    pub operation_type: OperationKind,
    /// Input bodies the operation applies, each carrying its own `id`.
    #[serde(default)]
    pub input: Vec<Value>,
}

impl EventOperation {
    pub fn new(operation_type: OperationKind, input: Vec<Value>) -> Self {
        Self {
            operation_type,
            input,
        }
    }

    pub fn create(input: Vec<Value>) -> Self {
        Self::new(OperationKind::Create, input)
    }
}

/// Payload of an event: the ordered list of operations it carries.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventBody {
    #[serde(default)]
    pub operations: Vec<EventOperation>,
}

impl EventBody {
    pub fn new(operations: Vec<EventOperation>) -> Self {
        Self { operations }
    }
}

/// Ordering fields of an event, as projected by the history join.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMeta {
    #[serde(default)]
    pub consensus: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_height: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_order: Option<u32>,
}

impl EventMeta {
    /// Consensus-confirmed meta placed at `(block_height, block_order)`.
    pub fn confirmed(block_height: u64, block_order: u32) -> Self {
        Self {
            consensus: true,
            block_height: Some(block_height),
            block_order: Some(block_order),
        }
    }

    /// Meta of an event that has not reached consensus yet.
    pub fn pending() -> Self {
        Self::default()
    }

    /// The `(block_height, block_order)` position of a consensus event.
    ///
    /// Returns `None` unless the event has consensus and both ordering
    /// fields are assigned.
    pub fn position(&self) -> Option<(u64, u32)> {
        if !self.consensus {
            return None;
        }
        Some((self.block_height?, self.block_order?))
    }
}

/// A stored event. Consumed read-only by the state machine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub event_hash: EventHash,
    #[serde(flatten)]
    pub body: EventBody,
    #[serde(flatten)]
    pub meta: EventMeta,
}

impl Event {
    pub fn new(event_hash: EventHash, body: EventBody, meta: EventMeta) -> Self {
        Self {
            event_hash,
            body,
            meta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn position_requires_consensus() {
        let pending = EventMeta {
            consensus: false,
            block_height: Some(3),
            block_order: Some(0),
        };
        assert_eq!(pending.position(), None);
        assert_eq!(EventMeta::confirmed(3, 1).position(), Some((3, 1)));
    }

    #[test]
    fn position_requires_ordering_fields() {
        let unplaced = EventMeta {
            consensus: true,
            block_height: Some(2),
            block_order: None,
        };
        assert_eq!(unplaced.position(), None);
    }

    #[test]
    fn event_flattens_body_and_meta() {
        let event: Event = serde_json::from_value(json!({
            "eventHash": "ni:///sha-256;e1",
            "operations": [{"operation": "Create", "input": [{"id": "X"}]}],
            "consensus": true,
            "blockHeight": 1,
            "blockOrder": 0
        }))
        .unwrap();

        assert_eq!(event.meta.position(), Some((1, 0)));
        assert_eq!(event.body.operations.len(), 1);
        assert_eq!(
            event.body.operations[0].operation_type,
            OperationKind::Create
        );
    }
}
