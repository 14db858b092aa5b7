use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use wsm_types::{
    Block, Event, EventHash, EventMeta, IndexKey, LedgerId, Operation, OperationHash,
    ProjectedObject, RecordId,
};

use crate::error::{StoreError, StoreResult};
use crate::traits::{BlockStore, EventStore, ObjectCollection, OperationCollection};

fn poisoned<G>(_: PoisonError<G>) -> StoreError {
    StoreError::Backend("lock poisoned".into())
}

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

/// In-memory block store for tests, fixtures, and embedding.
///
/// Blocks are append-only: appending a height that already exists fails
/// with `StoreError::Conflict`.
#[derive(Default)]
pub struct InMemoryBlockStore {
    blocks: RwLock<BTreeMap<u64, Block>>,
    fetches: AtomicU64,
}

impl InMemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a block at its own height.
    pub fn append(&self, block: Block) -> StoreResult<()> {
        let mut blocks = self.blocks.write().map_err(poisoned)?;
        if blocks.contains_key(&block.block_height) {
            return Err(StoreError::Conflict(format!(
                "block already exists at height {}",
                block.block_height
            )));
        }
        blocks.insert(block.block_height, block);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.blocks.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `get_by_height` calls served so far.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlockStore for InMemoryBlockStore {
    async fn latest_height(&self) -> StoreResult<Option<u64>> {
        let blocks = self.blocks.read().map_err(poisoned)?;
        Ok(blocks.keys().next_back().copied())
    }

    async fn get_by_height(&self, height: u64) -> StoreResult<Block> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let blocks = self.blocks.read().map_err(poisoned)?;
        blocks
            .get(&height)
            .cloned()
            .ok_or_else(|| StoreError::not_found("block", height))
    }
}

impl std::fmt::Debug for InMemoryBlockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlockStore")
            .field("block_count", &self.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// In-memory event store keyed by the index key of the event hash.
#[derive(Default)]
pub struct InMemoryEventStore {
    events: RwLock<HashMap<IndexKey, Event>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an event.
    pub fn insert(&self, event: Event) -> StoreResult<()> {
        let mut events = self.events.write().map_err(poisoned)?;
        events.insert(event.event_hash.index_key(), event);
        Ok(())
    }

    /// Replace the ordering fields of a stored event (e.g. once consensus
    /// places it in a block).
    pub fn set_meta(&self, event_hash: &EventHash, meta: EventMeta) -> StoreResult<()> {
        let mut events = self.events.write().map_err(poisoned)?;
        let event = events
            .get_mut(&event_hash.index_key())
            .ok_or_else(|| StoreError::not_found("event", event_hash))?;
        event.meta = meta;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.events.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn get_event(&self, event_hash: &EventHash) -> StoreResult<Event> {
        let events = self.events.read().map_err(poisoned)?;
        events
            .get(&event_hash.index_key())
            .cloned()
            .ok_or_else(|| StoreError::not_found("event", event_hash))
    }

    async fn get_event_meta(&self, event_hash: &EventHash) -> StoreResult<Option<EventMeta>> {
        let events = self.events.read().map_err(poisoned)?;
        Ok(events.get(&event_hash.index_key()).map(|event| event.meta))
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

type OperationKey = (IndexKey, IndexKey);

fn operation_key(event_hash: &EventHash, operation_hash: &OperationHash) -> OperationKey {
    (event_hash.index_key(), operation_hash.index_key())
}

#[derive(Default)]
struct OperationIndex {
    documents: HashMap<OperationKey, Operation>,
    /// Operation keys per record, in insertion order.
    by_record: HashMap<IndexKey, Vec<OperationKey>>,
}

/// In-memory operation collection with a unique `(event, operation)` index.
#[derive(Default)]
pub struct InMemoryOperationCollection {
    inner: RwLock<OperationIndex>,
}

impl InMemoryOperationCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|i| i.documents.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl OperationCollection for InMemoryOperationCollection {
    async fn insert(&self, operation: &Operation) -> StoreResult<()> {
        let key = operation_key(&operation.event_hash, &operation.operation_hash);
        let mut index = self.inner.write().map_err(poisoned)?;
        if index.documents.contains_key(&key) {
            return Err(StoreError::Duplicate {
                event_hash: operation.event_hash.clone(),
                operation_hash: operation.operation_hash.clone(),
            });
        }
        index.documents.insert(key, operation.clone());
        index
            .by_record
            .entry(operation.record_id.index_key())
            .or_default()
            .push(key);
        Ok(())
    }

    async fn find_by_record(&self, record_id: &RecordId) -> StoreResult<Vec<Operation>> {
        let index = self.inner.read().map_err(poisoned)?;
        let Some(keys) = index.by_record.get(&record_id.index_key()) else {
            return Ok(vec![]);
        };
        Ok(keys
            .iter()
            .filter_map(|key| index.documents.get(key))
            .cloned()
            .collect())
    }

    async fn count_ordered(
        &self,
        event_hash: &EventHash,
        operation_hashes: &[OperationHash],
    ) -> StoreResult<u64> {
        let index = self.inner.read().map_err(poisoned)?;
        let wanted: HashSet<_> = operation_hashes.iter().collect();
        let count = wanted
            .into_iter()
            .filter_map(|hash| index.documents.get(&operation_key(event_hash, hash)))
            .filter(|op| !op.deleted && op.is_ordered())
            .count();
        Ok(count as u64)
    }

    async fn mark_deleted(
        &self,
        event_hash: &EventHash,
        operation_hash: &OperationHash,
    ) -> StoreResult<bool> {
        let mut index = self.inner.write().map_err(poisoned)?;
        match index
            .documents
            .get_mut(&operation_key(event_hash, operation_hash))
        {
            Some(op) => {
                op.deleted = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn assign_event_order(
        &self,
        event_hash: &EventHash,
        operation_hash: &OperationHash,
        event_order: u32,
    ) -> StoreResult<bool> {
        let mut index = self.inner.write().map_err(poisoned)?;
        match index
            .documents
            .get_mut(&operation_key(event_hash, operation_hash))
        {
            Some(op) => {
                op.event_order = Some(event_order);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

// ---------------------------------------------------------------------------
// Projected objects
// ---------------------------------------------------------------------------

type ObjectKey = (IndexKey, IndexKey);

fn object_key(ledger: &LedgerId, id: &str) -> ObjectKey {
    (ledger.index_key(), ProjectedObject::key_for(id))
}

/// In-memory object collection holding projected objects and watermarks,
/// both keyed by ledger.
#[derive(Default)]
pub struct InMemoryObjectCollection {
    objects: RwLock<HashMap<ObjectKey, ProjectedObject>>,
    watermarks: RwLock<HashMap<IndexKey, u64>>,
    writes: AtomicU64,
}

impl InMemoryObjectCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects across all ledgers.
    pub fn len(&self) -> usize {
        self.objects.read().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of object writes applied so far.
    pub fn upsert_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// All objects of `ledger` sorted by id.
    pub fn snapshot(&self, ledger: &LedgerId) -> StoreResult<Vec<ProjectedObject>> {
        let scope = ledger.index_key();
        let objects = self.objects.read().map_err(poisoned)?;
        let mut all: Vec<_> = objects
            .iter()
            .filter(|((owner, _), _)| *owner == scope)
            .map(|(_, object)| object.clone())
            .collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }

    fn count_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectCollection for InMemoryObjectCollection {
    async fn find(&self, ledger: &LedgerId, id: &str) -> StoreResult<Option<ProjectedObject>> {
        let objects = self.objects.read().map_err(poisoned)?;
        Ok(objects.get(&object_key(ledger, id)).cloned())
    }

    async fn upsert(
        &self,
        ledger: &LedgerId,
        mut object: ProjectedObject,
        keep_created: bool,
    ) -> StoreResult<ProjectedObject> {
        let key = object_key(ledger, &object.id);
        let mut objects = self.objects.write().map_err(poisoned)?;
        if keep_created {
            if let Some(stored) = objects.get(&key) {
                object.meta.created = stored.meta.created;
            }
        }
        objects.insert(key, object.clone());
        self.count_write();
        Ok(object)
    }

    async fn replace(
        &self,
        ledger: &LedgerId,
        mut object: ProjectedObject,
    ) -> StoreResult<Option<ProjectedObject>> {
        let key = object_key(ledger, &object.id);
        let mut objects = self.objects.write().map_err(poisoned)?;
        let Some(stored) = objects.get_mut(&key) else {
            return Ok(None);
        };
        if stored.meta.deleted {
            return Ok(None);
        }
        object.meta.created = stored.meta.created;
        *stored = object.clone();
        self.count_write();
        Ok(Some(object))
    }

    async fn mark_deleted(
        &self,
        ledger: &LedgerId,
        id: &str,
        block_height: u64,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut objects = self.objects.write().map_err(poisoned)?;
        match objects.get_mut(&object_key(ledger, id)) {
            Some(stored) if !stored.meta.deleted => {
                stored.meta.deleted = true;
                stored.meta.block_height = block_height;
                stored.meta.updated = at;
                self.count_write();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn watermark(&self, ledger: &LedgerId) -> StoreResult<Option<u64>> {
        let watermarks = self.watermarks.read().map_err(poisoned)?;
        Ok(watermarks.get(&ledger.index_key()).copied())
    }

    async fn advance_watermark(&self, ledger: &LedgerId, height: u64) -> StoreResult<u64> {
        let mut watermarks = self.watermarks.write().map_err(poisoned)?;
        let current = watermarks.entry(ledger.index_key()).or_insert(height);
        if height > *current {
            *current = height;
        }
        Ok(*current)
    }
}
