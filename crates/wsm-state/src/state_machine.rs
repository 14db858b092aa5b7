use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;
use wsm_store::{BlockStore, EventStore, ObjectCollection};
use wsm_types::{ObjectMeta, ProjectedObject, StateRecord, UpdateMeta};

use crate::config::StateConfig;
use crate::error::{NotFoundReason, StateError, StateResult};

/// The state machine of a single ledger.
///
/// Holds the projection of every object created by the ledger's blocks and
/// keeps it current: every [`get`](Self::get) first catches the projection up
/// to the latest block height, then answers from it.
pub struct StateMachineStorage {
    pub(crate) config: StateConfig,
    pub(crate) objects: Arc<dyn ObjectCollection>,
    pub(crate) blocks: Arc<dyn BlockStore>,
    pub(crate) events: Arc<dyn EventStore>,
    /// Held for the duration of a replay walk. At most one replay per
    /// ledger is in flight; other callers wait for it to finish.
    pub(crate) replay_gate: Mutex<()>,
}

impl StateMachineStorage {
    pub fn new(
        config: StateConfig,
        objects: Arc<dyn ObjectCollection>,
        blocks: Arc<dyn BlockStore>,
        events: Arc<dyn EventStore>,
    ) -> Self {
        Self {
            config,
            objects,
            blocks,
            events,
            replay_gate: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &StateConfig {
        &self.config
    }

    /// Highest block height fully reflected in the projection.
    ///
    /// A projection that never applied a block sits at the genesis height.
    pub async fn watermark(&self) -> StateResult<u64> {
        Ok(self
            .objects
            .watermark(&self.config.ledger_id)
            .await?
            .unwrap_or(self.config.genesis_height))
    }

    /// Insert or replace a projected object.
    ///
    /// `object` must carry a non-empty string `id` and `meta` a non-zero
    /// block height. `created` is preserved from an existing object unless
    /// given explicitly; `updated` defaults to now. The merge happens inside
    /// the object collection's single-key write, so direct calls may run
    /// alongside a replay.
    pub async fn update(&self, object: Value, meta: UpdateMeta) -> StateResult<StateRecord> {
        let keep_created = meta.created.is_none();
        let object = stamp(object, &meta)?;
        debug!(
            object_id = %object.id,
            block_height = object.meta.block_height,
            "adding state machine object"
        );
        let stored = self
            .objects
            .upsert(&self.config.ledger_id, object, keep_created)
            .await?;
        Ok(stored.into_record())
    }

    /// Get the latest consensus state of an object.
    ///
    /// Catches the projection up to the ledger's latest block first. Fails
    /// with `ObjectNotFound` if the object was never created or has been
    /// deleted.
    pub async fn get(&self, object_id: &str) -> StateResult<StateRecord> {
        self.catch_up().await?;

        let not_found = |reason| StateError::ObjectNotFound {
            object_id: object_id.to_string(),
            reason,
        };
        match self.objects.find(&self.config.ledger_id, object_id).await? {
            None => Err(not_found(NotFoundReason::UnknownObject)),
            Some(found) if found.meta.deleted => Err(not_found(NotFoundReason::DeletedObject)),
            Some(found) => Ok(found.into_record()),
        }
    }

    /// Replace the body of an object that is already projected.
    ///
    /// Returns `Ok(false)` without writing when the object is unknown or
    /// deleted.
    pub(crate) async fn replace_existing(&self, object: Value, block_height: u64) -> StateResult<bool> {
        let object = stamp(object, &UpdateMeta::at_height(block_height))?;
        let replaced = self
            .objects
            .replace(&self.config.ledger_id, object)
            .await?;
        if let Some(stored) = &replaced {
            debug!(object_id = %stored.id, block_height, "replacing state machine object");
        }
        Ok(replaced.is_some())
    }

    /// Mark a projected object deleted. Deleting an unknown or already
    /// deleted object is a no-op returning `Ok(false)`.
    pub(crate) async fn mark_deleted(&self, object: &Value, block_height: u64) -> StateResult<bool> {
        let id = ProjectedObject::id_of(object).map_err(|_| missing_id())?;
        let deleted = self
            .objects
            .mark_deleted(&self.config.ledger_id, id, block_height, Utc::now())
            .await?;
        if deleted {
            debug!(object_id = %id, block_height, "deleting state machine object");
        }
        Ok(deleted)
    }
}

fn missing_id() -> StateError {
    StateError::BadRequest("an `id` for the given object was not specified".into())
}

/// Validate a write and fill in its timestamps.
fn stamp(object: Value, meta: &UpdateMeta) -> StateResult<ProjectedObject> {
    let id = ProjectedObject::id_of(&object)
        .map_err(|_| missing_id())?
        .to_string();
    if meta.block_height == 0 {
        return Err(StateError::BadRequest(format!(
            "a `blockHeight` for object {id} was not specified"
        )));
    }

    let now = Utc::now();
    Ok(ProjectedObject {
        id,
        object,
        meta: ObjectMeta {
            block_height: meta.block_height,
            created: meta.created.unwrap_or(now),
            updated: meta.updated.unwrap_or(now),
            deleted: false,
        },
    })
}

impl std::fmt::Debug for StateMachineStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateMachineStorage")
            .field("ledger_id", &self.config.ledger_id)
            .field("genesis_height", &self.config.genesis_height)
            .finish()
    }
}
