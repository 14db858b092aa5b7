use serde::{Deserialize, Serialize};

use crate::event::EventBody;
use crate::identity::EventHash;

/// An entry in a block's event list.
///
/// Blocks either embed the event body inline or reference a stored event by
/// hash; references are resolved through the event store during replay.
/// On the wire a reference is a bare string and an inline event an object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockEvent {
    Reference(EventHash),
    Inline(EventBody),
}

/// An ordered batch of events at a given height. Consumed read-only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub block_height: u64,
    #[serde(default)]
    pub events: Vec<BlockEvent>,
}

impl Block {
    pub fn new(block_height: u64, events: Vec<BlockEvent>) -> Self {
        Self {
            block_height,
            events,
        }
    }

    /// A block with no events (e.g. a genesis configuration block).
    pub fn empty(block_height: u64) -> Self {
        Self::new(block_height, Vec::new())
    }
}
