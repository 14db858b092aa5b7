use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};
use wsm_store::{EventStore, OperationCollection, StoreError};
use wsm_types::{EventHash, EventMeta, LedgerId, Operation, OperationHash, RecordId};

use crate::error::{NotFoundReason, StateError, StateResult};

/// Options for [`OperationStorage::add_many`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InsertOptions {
    /// Absorb uniqueness violations instead of failing. Concurrent
    /// resubmission of the same operations is expected.
    pub ignore_duplicate: bool,
}

impl Default for InsertOptions {
    fn default() -> Self {
        Self {
            ignore_duplicate: true,
        }
    }
}

impl InsertOptions {
    pub fn strict() -> Self {
        Self {
            ignore_duplicate: false,
        }
    }
}

/// Partial result of a bulk insert.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InsertManyResult {
    pub inserted: usize,
    /// Operations that were already stored and were absorbed.
    pub duplicates: usize,
}

/// One step of a record's history: the operation and the ordering fields of
/// the consensus event that carries it.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub operation: Operation,
    pub event_meta: EventMeta,
    /// Position of the event, unpacked from `event_meta` when the entry is
    /// built. Serialized only through `event_meta`.
    #[serde(skip)]
    pub block_height: u64,
    #[serde(skip)]
    pub block_order: u32,
}

impl HistoryEntry {
    /// Total order of history entries: block height, then block order, then
    /// the operation's position inside its event.
    pub fn sort_key(&self) -> (u64, u32, Option<u32>) {
        (
            self.block_height,
            self.block_order,
            self.operation.event_order,
        )
    }
}

/// Operation storage for a single ledger.
///
/// Persists the operations carried by events and answers consensus-ordered
/// history queries by joining them against the event store.
pub struct OperationStorage {
    ledger_id: LedgerId,
    operations: Arc<dyn OperationCollection>,
    events: Arc<dyn EventStore>,
}

impl OperationStorage {
    pub fn new(
        ledger_id: LedgerId,
        operations: Arc<dyn OperationCollection>,
        events: Arc<dyn EventStore>,
    ) -> Self {
        Self {
            ledger_id,
            operations,
            events,
        }
    }

    pub fn ledger_id(&self) -> &LedgerId {
        &self.ledger_id
    }

    /// Bulk-insert operations without ordering across the batch.
    ///
    /// Every operation is attempted. When `ignore_duplicate` is set and
    /// every failure is a uniqueness violation, the call succeeds with the
    /// partial result. Any other failure is returned to the caller.
    pub async fn add_many(
        &self,
        operations: &[Operation],
        options: InsertOptions,
    ) -> StateResult<InsertManyResult> {
        let outcome = self.operations.insert_unordered(operations).await?;

        let mut duplicates = Vec::new();
        for failure in outcome.write_errors {
            match failure.error {
                StoreError::Duplicate {
                    event_hash,
                    operation_hash,
                } => duplicates.push((event_hash, operation_hash)),
                other => {
                    warn!(
                        ledger = %self.ledger_id,
                        index = failure.index,
                        error = %other,
                        "operation insert failed"
                    );
                    return Err(other.into());
                }
            }
        }

        if !options.ignore_duplicate {
            if let Some((event_hash, operation_hash)) = duplicates.into_iter().next() {
                return Err(StateError::Duplicate {
                    event_hash,
                    operation_hash,
                });
            }
            return Ok(InsertManyResult {
                inserted: outcome.inserted,
                duplicates: 0,
            });
        }

        if !duplicates.is_empty() {
            debug!(
                ledger = %self.ledger_id,
                duplicates = duplicates.len(),
                "absorbed duplicate operations"
            );
        }

        Ok(InsertManyResult {
            inserted: outcome.inserted,
            duplicates: duplicates.len(),
        })
    }

    /// Determine whether every requested operation exists under the event.
    ///
    /// An operation counts only if it is not deleted and has an event order.
    /// Requested hashes are deduplicated first, so listing a hash twice does
    /// not change the answer.
    pub async fn exists<I>(&self, event_hash: &EventHash, operation_hashes: I) -> StateResult<bool>
    where
        I: IntoIterator,
        I::Item: Into<OperationHash>,
    {
        let distinct: BTreeSet<OperationHash> =
            operation_hashes.into_iter().map(Into::into).collect();
        if distinct.is_empty() {
            return Ok(true);
        }

        let hashes: Vec<OperationHash> = distinct.into_iter().collect();
        let found = self.operations.count_ordered(event_hash, &hashes).await?;
        Ok(found == hashes.len() as u64)
    }

    /// Reconstruct the consensus-ordered history of a record.
    ///
    /// Only operations whose event has reached consensus are returned, and
    /// when `max_block_height` is given only those placed at or below it.
    /// The result is sorted by `(block_height, block_order, event_order)`.
    /// An empty result is a `HistoryNotFound` error, never an empty list.
    ///
    /// # Panics
    ///
    /// Panics if `max_block_height` is `Some(0)`; the ceiling must be a
    /// positive height.
    pub async fn get_record_history(
        &self,
        record_id: &RecordId,
        max_block_height: Option<u64>,
    ) -> StateResult<Vec<HistoryEntry>> {
        assert!(
            max_block_height != Some(0),
            "max_block_height must be a positive integer"
        );

        let operations = self.operations.find_by_record(record_id).await?;
        let not_found = |reason| StateError::HistoryNotFound {
            record_id: record_id.clone(),
            max_block_height,
            reason,
        };
        if operations.is_empty() {
            return Err(not_found(NotFoundReason::UnknownRecord));
        }

        // Many operations share an event; resolve each event once.
        let mut metas: HashMap<EventHash, Option<EventMeta>> = HashMap::new();
        let mut history = Vec::with_capacity(operations.len());

        for operation in operations {
            let meta = match metas.get(&operation.event_hash) {
                Some(meta) => *meta,
                None => {
                    let meta = self.events.get_event_meta(&operation.event_hash).await?;
                    metas.insert(operation.event_hash.clone(), meta);
                    meta
                }
            };

            let Some(event_meta) = meta else { continue };
            let Some((block_height, block_order)) = event_meta.position() else {
                continue;
            };
            if max_block_height.is_some_and(|max| block_height > max) {
                continue;
            }

            history.push(HistoryEntry {
                operation,
                event_meta,
                block_height,
                block_order,
            });
        }

        if history.is_empty() {
            return Err(not_found(NotFoundReason::NoConfirmedHistory));
        }

        history.sort_by_key(HistoryEntry::sort_key);
        Ok(history)
    }

    /// Mark an operation deleted so existence checks stop counting it.
    ///
    /// Returns `true` if the operation exists.
    pub async fn mark_deleted(
        &self,
        event_hash: &EventHash,
        operation_hash: &OperationHash,
    ) -> StateResult<bool> {
        Ok(self
            .operations
            .mark_deleted(event_hash, operation_hash)
            .await?)
    }

    /// Record the position of an operation inside its event.
    ///
    /// Returns `true` if the operation exists.
    pub async fn assign_event_order(
        &self,
        event_hash: &EventHash,
        operation_hash: &OperationHash,
        event_order: u32,
    ) -> StateResult<bool> {
        Ok(self
            .operations
            .assign_event_order(event_hash, operation_hash, event_order)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use wsm_store::{InMemoryEventStore, InMemoryOperationCollection};
    use wsm_types::{Event, EventBody, OperationKind};

    struct Fixture {
        storage: OperationStorage,
        operations: Arc<InMemoryOperationCollection>,
        events: Arc<InMemoryEventStore>,
    }

    fn fixture() -> Fixture {
        let operations = Arc::new(InMemoryOperationCollection::new());
        let events = Arc::new(InMemoryEventStore::new());
        let storage = OperationStorage::new(
            LedgerId::new("urn:ledger:ops"),
            operations.clone(),
            events.clone(),
        );
        Fixture {
            storage,
            operations,
            events,
        }
    }

    fn op(record: &str, event: &str, hash: &str, order: u32) -> Operation {
        Operation::new(
            RecordId::new(record),
            EventHash::new(event),
            OperationHash::new(hash),
            OperationKind::Create,
            json!({"id": record, "op": hash}),
        )
        .with_event_order(order)
    }

    fn event(events: &InMemoryEventStore, hash: &str, meta: EventMeta) {
        events
            .insert(Event::new(EventHash::new(hash), EventBody::default(), meta))
            .unwrap();
    }

    fn hashes(history: &[HistoryEntry]) -> Vec<&str> {
        history
            .iter()
            .map(|entry| entry.operation.operation_hash.as_str())
            .collect()
    }

    // -----------------------------------------------------------------------
    // add_many
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn duplicate_insert_is_absorbed() {
        let f = fixture();
        let batch = vec![op("R", "E1", "o1", 0)];

        let first = f.storage.add_many(&batch, InsertOptions::default()).await.unwrap();
        assert_eq!(first.inserted, 1);

        let second = f.storage.add_many(&batch, InsertOptions::default()).await.unwrap();
        assert_eq!(second, InsertManyResult { inserted: 0, duplicates: 1 });
        assert_eq!(f.operations.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_does_not_abort_rest_of_batch() {
        let f = fixture();
        f.storage
            .add_many(&[op("R", "E1", "o1", 0)], InsertOptions::default())
            .await
            .unwrap();

        let batch = vec![op("R", "E1", "o1", 0), op("R", "E1", "o2", 1)];
        let result = f.storage.add_many(&batch, InsertOptions::default()).await.unwrap();
        assert_eq!(result, InsertManyResult { inserted: 1, duplicates: 1 });
        assert_eq!(f.operations.len(), 2);
    }

    #[tokio::test]
    async fn strict_insert_surfaces_duplicate() {
        let f = fixture();
        let batch = vec![op("R", "E1", "o1", 0)];
        f.storage.add_many(&batch, InsertOptions::strict()).await.unwrap();

        let err = f
            .storage
            .add_many(&batch, InsertOptions::strict())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StateError::Duplicate {
                event_hash: EventHash::new("E1"),
                operation_hash: OperationHash::new("o1"),
            }
        );
    }

    // -----------------------------------------------------------------------
    // exists
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn exists_is_conjunctive() {
        let f = fixture();
        f.storage
            .add_many(
                &[op("R", "E1", "h1", 0), op("R", "E1", "h2", 1)],
                InsertOptions::default(),
            )
            .await
            .unwrap();
        let e1 = EventHash::new("E1");

        assert!(f.storage.exists(&e1, ["h1", "h2"]).await.unwrap());
        assert!(f.storage.exists(&e1, ["h1"]).await.unwrap());
        assert!(f.storage.exists(&e1, ["h1", "h1"]).await.unwrap());
        assert!(!f.storage.exists(&e1, ["h1", "h3"]).await.unwrap());
        assert!(!f
            .storage
            .exists(&EventHash::new("E2"), ["h1"])
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn exists_ignores_deleted_and_unordered() {
        let f = fixture();
        let unordered = Operation::new(
            RecordId::new("R"),
            EventHash::new("E1"),
            OperationHash::new("h2"),
            OperationKind::Create,
            json!({}),
        );
        f.storage
            .add_many(&[op("R", "E1", "h1", 0), unordered], InsertOptions::default())
            .await
            .unwrap();
        let e1 = EventHash::new("E1");

        assert!(!f.storage.exists(&e1, ["h2"]).await.unwrap());
        assert!(f
            .storage
            .assign_event_order(&e1, &OperationHash::new("h2"), 1)
            .await
            .unwrap());
        assert!(f.storage.exists(&e1, ["h2"]).await.unwrap());

        assert!(f
            .storage
            .mark_deleted(&e1, &OperationHash::new("h1"))
            .await
            .unwrap());
        assert!(!f.storage.exists(&e1, ["h1", "h2"]).await.unwrap());
    }

    // -----------------------------------------------------------------------
    // get_record_history
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn history_is_ordered_by_block_position() {
        let f = fixture();
        event(&f.events, "E1", EventMeta::confirmed(1, 0));
        event(&f.events, "E2", EventMeta::confirmed(1, 1));
        event(&f.events, "E3", EventMeta::confirmed(2, 0));

        // Inserted out of order on purpose.
        f.storage
            .add_many(
                &[
                    op("R", "E3", "o3", 0),
                    op("R", "E1", "o1", 0),
                    op("R", "E2", "o2", 0),
                ],
                InsertOptions::default(),
            )
            .await
            .unwrap();
        let record = RecordId::new("R");

        let all = f.storage.get_record_history(&record, None).await.unwrap();
        assert_eq!(hashes(&all), vec!["o1", "o2", "o3"]);

        let capped = f.storage.get_record_history(&record, Some(1)).await.unwrap();
        assert_eq!(hashes(&capped), vec!["o1", "o2"]);
    }

    #[tokio::test]
    async fn history_entry_serializes_position_once() {
        let f = fixture();
        event(&f.events, "E1", EventMeta::confirmed(2, 5));
        f.storage
            .add_many(&[op("R", "E1", "o1", 0)], InsertOptions::default())
            .await
            .unwrap();

        let history = f
            .storage
            .get_record_history(&RecordId::new("R"), None)
            .await
            .unwrap();
        let value = serde_json::to_value(&history[0]).unwrap();
        let fields: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(fields, vec!["eventMeta", "operation"]);
        assert_eq!(value["eventMeta"]["blockHeight"], json!(2));
        assert_eq!(value["eventMeta"]["blockOrder"], json!(5));
    }

    #[tokio::test]
    async fn history_orders_within_event_by_event_order() {
        let f = fixture();
        event(&f.events, "E1", EventMeta::confirmed(3, 0));
        f.storage
            .add_many(
                &[op("R", "E1", "b", 1), op("R", "E1", "a", 0)],
                InsertOptions::default(),
            )
            .await
            .unwrap();

        let history = f
            .storage
            .get_record_history(&RecordId::new("R"), None)
            .await
            .unwrap();
        assert_eq!(hashes(&history), vec!["a", "b"]);
        assert_eq!(history[0].sort_key(), (3, 0, Some(0)));
    }

    #[tokio::test]
    async fn history_requires_consensus() {
        let f = fixture();
        event(&f.events, "E1", EventMeta::pending());
        f.storage
            .add_many(&[op("R", "E1", "o1", 0)], InsertOptions::default())
            .await
            .unwrap();

        let err = f
            .storage
            .get_record_history(&RecordId::new("R"), None)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(
            err.not_found_reason(),
            Some(NotFoundReason::NoConfirmedHistory)
        );
    }

    #[tokio::test]
    async fn history_drops_operations_of_unknown_events() {
        let f = fixture();
        event(&f.events, "E1", EventMeta::confirmed(1, 0));
        f.storage
            .add_many(
                &[op("R", "E1", "o1", 0), op("R", "E-missing", "o2", 0)],
                InsertOptions::default(),
            )
            .await
            .unwrap();

        let history = f
            .storage
            .get_record_history(&RecordId::new("R"), None)
            .await
            .unwrap();
        assert_eq!(hashes(&history), vec!["o1"]);
    }

    #[tokio::test]
    async fn history_of_unknown_record_is_not_found() {
        let f = fixture();
        let err = f
            .storage
            .get_record_history(&RecordId::new("nobody"), Some(5))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StateError::HistoryNotFound {
                record_id: RecordId::new("nobody"),
                max_block_height: Some(5),
                reason: NotFoundReason::UnknownRecord,
            }
        );
    }

    #[tokio::test]
    async fn history_ceiling_below_every_event_is_not_found() {
        let f = fixture();
        event(&f.events, "E1", EventMeta::confirmed(4, 0));
        f.storage
            .add_many(&[op("R", "E1", "o1", 0)], InsertOptions::default())
            .await
            .unwrap();

        let err = f
            .storage
            .get_record_history(&RecordId::new("R"), Some(3))
            .await
            .unwrap_err();
        assert_eq!(
            err.not_found_reason(),
            Some(NotFoundReason::NoConfirmedHistory)
        );
    }

    #[tokio::test]
    #[should_panic(expected = "max_block_height must be a positive integer")]
    async fn zero_ceiling_is_a_programming_error() {
        let f = fixture();
        let _ = f
            .storage
            .get_record_history(&RecordId::new("R"), Some(0))
            .await;
    }

    // -----------------------------------------------------------------------
    // Ordering invariant
    // -----------------------------------------------------------------------

    proptest! {
        #[test]
        fn history_is_sorted_and_filtered(
            placements in proptest::collection::vec((1u64..6, any::<bool>()), 1..12),
            max in proptest::option::of(1u64..6),
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();
            runtime.block_on(async {
                let f = fixture();
                let mut expected = 0usize;
                let mut batch = Vec::new();
                for (index, (height, consensus)) in placements.iter().enumerate() {
                    let name = format!("E{index}");
                    let meta = EventMeta {
                        consensus: *consensus,
                        block_height: Some(*height),
                        block_order: Some(index as u32),
                    };
                    event(&f.events, &name, meta);
                    for order in 0..2u32 {
                        batch.push(op("R", &name, &format!("{name}-{order}"), order));
                    }
                    if *consensus && max.map_or(true, |m| *height <= m) {
                        expected += 2;
                    }
                }
                f.storage.add_many(&batch, InsertOptions::default()).await.unwrap();

                match f.storage.get_record_history(&RecordId::new("R"), max).await {
                    Ok(history) => {
                        prop_assert_eq!(history.len(), expected);
                        for pair in history.windows(2) {
                            prop_assert!(pair[0].sort_key() < pair[1].sort_key());
                        }
                        for entry in &history {
                            prop_assert!(entry.event_meta.consensus);
                        }
                    }
                    Err(err) => {
                        prop_assert_eq!(expected, 0);
                        prop_assert!(err.is_not_found());
                    }
                }
                Ok(())
            })?;
        }
    }
}
