use async_trait::async_trait;
use chrono::{DateTime, Utc};
use wsm_types::{
    Block, Event, EventHash, EventMeta, LedgerId, Operation, OperationHash, ProjectedObject,
    RecordId,
};

use crate::error::{StoreError, StoreResult};

/// Read boundary of the block store.
///
/// Block persistence is owned elsewhere; the state machine only needs the
/// current height and random access by height.
#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Height of the latest block, or `None` for an empty ledger.
    async fn latest_height(&self) -> StoreResult<Option<u64>>;

    /// Fetch the block at `height`.
    ///
    /// Returns `StoreError::NotFound` if no block exists at that height.
    async fn get_by_height(&self, height: u64) -> StoreResult<Block>;
}

/// Read boundary of the event store.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Resolve a full event by hash.
    ///
    /// Returns `StoreError::NotFound` if the event is unknown.
    async fn get_event(&self, event_hash: &EventHash) -> StoreResult<Event>;

    /// Project only the ordering fields of an event.
    ///
    /// Returns `Ok(None)` if the event is unknown. The history join drops
    /// operations whose event cannot be found.
    async fn get_event_meta(&self, event_hash: &EventHash) -> StoreResult<Option<EventMeta>>;
}

/// A failed document in an unordered bulk insert.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulkWriteError {
    /// Index of the document in the submitted batch.
    pub index: usize,
    pub error: StoreError,
}

/// Outcome of an unordered bulk insert.
///
/// Unordered means every document is attempted: a failure at one index never
/// prevents the documents after it from being written.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BulkWriteResult {
    pub inserted: usize,
    pub write_errors: Vec<BulkWriteError>,
}

/// Durable collection of operation documents.
///
/// Implementations must enforce uniqueness of `(event_hash, operation_hash)`
/// and report violations as `StoreError::Duplicate`.
#[async_trait]
pub trait OperationCollection: Send + Sync {
    /// Insert a single operation.
    async fn insert(&self, operation: &Operation) -> StoreResult<()>;

    /// Insert a batch without ordering guarantees.
    ///
    /// Default implementation calls `insert()` for each operation and
    /// collects per-document failures. Backends may override with a native
    /// bulk write.
    async fn insert_unordered(&self, operations: &[Operation]) -> StoreResult<BulkWriteResult> {
        let mut result = BulkWriteResult::default();
        for (index, operation) in operations.iter().enumerate() {
            match self.insert(operation).await {
                Ok(()) => result.inserted += 1,
                Err(error) => result.write_errors.push(BulkWriteError { index, error }),
            }
        }
        Ok(result)
    }

    /// All operations recorded against `record_id`, deleted ones included.
    async fn find_by_record(&self, record_id: &RecordId) -> StoreResult<Vec<Operation>>;

    /// Count operations under `event_hash` whose hash is in
    /// `operation_hashes`, that are not deleted and have an event order.
    async fn count_ordered(
        &self,
        event_hash: &EventHash,
        operation_hashes: &[OperationHash],
    ) -> StoreResult<u64>;

    /// Set the deleted marker. Returns `true` if the operation exists.
    async fn mark_deleted(
        &self,
        event_hash: &EventHash,
        operation_hash: &OperationHash,
    ) -> StoreResult<bool>;

    /// Assign the operation's position inside its event. Returns `true` if
    /// the operation exists.
    async fn assign_event_order(
        &self,
        event_hash: &EventHash,
        operation_hash: &OperationHash,
        event_order: u32,
    ) -> StoreResult<bool>;
}

/// Durable collection of projected objects plus the projection watermark.
///
/// Objects are scoped by ledger the same way watermarks are, so ledgers
/// sharing one collection never see each other's objects. Every write is
/// atomic on its `(ledger, id)` key, including the merge rules of
/// [`upsert`](Self::upsert), [`replace`](Self::replace) and
/// [`mark_deleted`](Self::mark_deleted).
#[async_trait]
pub trait ObjectCollection: Send + Sync {
    /// Read an object by id, deleted ones included.
    async fn find(&self, ledger: &LedgerId, id: &str) -> StoreResult<Option<ProjectedObject>>;

    /// Insert or replace the object keyed by `object.id`.
    ///
    /// With `keep_created`, the `created` timestamp of an object already
    /// stored under the id survives the replacement. Returns the object as
    /// stored.
    async fn upsert(
        &self,
        ledger: &LedgerId,
        object: ProjectedObject,
        keep_created: bool,
    ) -> StoreResult<ProjectedObject>;

    /// Replace an object that is stored and not deleted, keeping its
    /// `created` timestamp. Returns `Ok(None)` without writing otherwise.
    async fn replace(
        &self,
        ledger: &LedgerId,
        object: ProjectedObject,
    ) -> StoreResult<Option<ProjectedObject>>;

    /// Mark a stored object deleted as of `block_height`.
    ///
    /// Returns `Ok(false)` without writing if the object is unknown or
    /// already deleted.
    async fn mark_deleted(
        &self,
        ledger: &LedgerId,
        id: &str,
        block_height: u64,
        at: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Highest block height fully applied for `ledger`, if any.
    async fn watermark(&self, ledger: &LedgerId) -> StoreResult<Option<u64>>;

    /// Raise the watermark of `ledger` to `height`.
    ///
    /// The watermark never decreases: advancing to a lower height is a no-op.
    /// Returns the watermark after the call.
    async fn advance_watermark(&self, ledger: &LedgerId, height: u64) -> StoreResult<u64>;
}
