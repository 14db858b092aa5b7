use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde::Deserialize;
use wsm_state::{InsertOptions, OperationStorage, StateConfig, StateMachineStorage};
use wsm_store::{
    InMemoryBlockStore, InMemoryEventStore, InMemoryObjectCollection, InMemoryOperationCollection,
};
use wsm_types::{Block, Event, Operation};

/// A ledger snapshot on disk: the blocks, events, and operations a state
/// machine is built from.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub blocks: Vec<Block>,
    pub events: Vec<Event>,
    pub operations: Vec<Operation>,
}

/// The two storages of a loaded ledger, sharing one event store.
pub struct Ledger {
    pub operations: OperationStorage,
    pub state: StateMachineStorage,
}

impl Fixture {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading fixture {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing fixture {}", path.display()))
    }

    /// Populate fresh in-memory stores. Nothing is projected yet; the state
    /// machine catches up on first read.
    pub async fn open(self, config: StateConfig) -> anyhow::Result<Ledger> {
        let blocks = Arc::new(InMemoryBlockStore::new());
        for block in self.blocks {
            let height = block.block_height;
            blocks
                .append(block)
                .with_context(|| format!("loading block {height}"))?;
        }

        let events = Arc::new(InMemoryEventStore::new());
        for event in self.events {
            events.insert(event)?;
        }

        let operations = OperationStorage::new(
            config.ledger_id.clone(),
            Arc::new(InMemoryOperationCollection::new()),
            events.clone(),
        );
        let inserted = operations
            .add_many(&self.operations, InsertOptions::default())
            .await?;
        tracing::debug!(
            blocks = blocks.len(),
            events = events.len(),
            operations = inserted.inserted,
            duplicates = inserted.duplicates,
            "fixture loaded"
        );

        let state = StateMachineStorage::new(
            config,
            Arc::new(InMemoryObjectCollection::new()),
            blocks,
            events,
        );
        Ok(Ledger { operations, state })
    }
}

#[cfg(test)]
pub(crate) const SAMPLE: &str = r#"{
  "blocks": [
    { "blockHeight": 0, "events": [] },
    {
      "blockHeight": 1,
      "events": [
        "ni:///sha-256;ev1",
        { "operations": [ { "operation": "Create", "input": [ { "id": "did:v1:b", "name": "inline" } ] } ] }
      ]
    }
  ],
  "events": [
    {
      "eventHash": "ni:///sha-256;ev1",
      "operations": [ { "operation": "Create", "input": [ { "id": "did:v1:a", "name": "referenced" } ] } ],
      "consensus": true,
      "blockHeight": 1,
      "blockOrder": 0
    },
    {
      "eventHash": "ni:///sha-256;ev2",
      "operations": [],
      "consensus": false
    }
  ],
  "operations": [
    {
      "recordId": "did:v1:a",
      "eventHash": "ni:///sha-256;ev1",
      "operationHash": "op1",
      "operationType": "Create",
      "eventOrder": 0
    },
    {
      "recordId": "did:v1:a",
      "eventHash": "ni:///sha-256;ev2",
      "operationHash": "op2",
      "operationType": "Update"
    },
    {
      "recordId": "did:v1:a",
      "eventHash": "ni:///sha-256;ev1",
      "operationHash": "op1",
      "operationType": "Create",
      "eventOrder": 0
    }
  ]
}"#;
