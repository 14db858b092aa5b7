use std::borrow::Cow;

use serde::Serialize;
use tracing::{debug, info};
use wsm_types::{Block, BlockEvent, EventBody, OperationKind, UpdateMeta};

use crate::error::StateResult;
use crate::state_machine::StateMachineStorage;

/// Summary of one catch-up invocation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatchUpReport {
    /// Watermark observed when the replay started.
    pub from: u64,
    /// Watermark after the replay.
    pub to: u64,
    pub applied_blocks: u64,
    pub applied_events: u64,
    pub upserted_objects: u64,
    pub deleted_objects: u64,
}

impl CatchUpReport {
    fn idle(watermark: u64) -> Self {
        Self {
            from: watermark,
            to: watermark,
            ..Default::default()
        }
    }

    /// Returns `true` if the projection was already current.
    pub fn is_noop(&self) -> bool {
        self.applied_blocks == 0
    }
}

impl StateMachineStorage {
    /// Bring the projection up to the ledger's latest block height.
    ///
    /// Blocks above the watermark are replayed one height at a time in
    /// increasing order; the watermark advances only after every write of a
    /// height is durable. A failure aborts the walk with the originating
    /// error and leaves the watermark at the last fully applied height, so
    /// the next call resumes there. Replaying a height twice is harmless
    /// because every write is an upsert keyed by object id.
    ///
    /// A current projection returns without touching the replay gate, so
    /// idle reads never queue behind each other. Replays are serialized:
    /// while one is in flight the others wait for it and then find nothing
    /// left to do.
    pub async fn catch_up(&self) -> StateResult<CatchUpReport> {
        let watermark = self.watermark().await?;
        let Some(target) = self.blocks.latest_height().await? else {
            return Ok(CatchUpReport::idle(watermark));
        };
        if target <= watermark {
            return Ok(CatchUpReport::idle(watermark));
        }

        let _replay = self.replay_gate.lock().await;
        // The replay this caller waited on may already have covered `target`.
        let watermark = self.watermark().await?;
        if target <= watermark {
            return Ok(CatchUpReport::idle(watermark));
        }

        info!(
            ledger = %self.config.ledger_id,
            from = watermark,
            to = target,
            "replaying blocks into state machine"
        );

        let mut report = CatchUpReport::idle(watermark);
        for height in watermark + 1..=target {
            let block = self.blocks.get_by_height(height).await?;
            self.apply_block(height, &block, &mut report).await?;
            report.to = self
                .objects
                .advance_watermark(&self.config.ledger_id, height)
                .await?;
            report.applied_blocks += 1;
        }

        info!(
            ledger = %self.config.ledger_id,
            to = report.to,
            blocks = report.applied_blocks,
            objects = report.upserted_objects,
            "state machine caught up"
        );
        Ok(report)
    }

    async fn apply_block(
        &self,
        height: u64,
        block: &Block,
        report: &mut CatchUpReport,
    ) -> StateResult<()> {
        for entry in &block.events {
            let event = self.resolve(entry).await?;
            self.apply_event(height, &event, report).await?;
            report.applied_events += 1;
        }
        Ok(())
    }

    /// Resolve a block entry to its event body, fetching referenced events
    /// from the event store.
    async fn resolve<'a>(&self, entry: &'a BlockEvent) -> StateResult<Cow<'a, EventBody>> {
        match entry {
            BlockEvent::Inline(body) => Ok(Cow::Borrowed(body)),
            BlockEvent::Reference(event_hash) => {
                let event = self.events.get_event(event_hash).await?;
                Ok(Cow::Owned(event.body))
            }
        }
    }

    async fn apply_event(
        &self,
        height: u64,
        event: &EventBody,
        report: &mut CatchUpReport,
    ) -> StateResult<()> {
        for operation in &event.operations {
            match &operation.operation_type {
                OperationKind::Create => {
                    for input in &operation.input {
                        self.update(input.clone(), UpdateMeta::at_height(height))
                            .await?;
                        report.upserted_objects += 1;
                    }
                }
                OperationKind::Update => {
                    for input in &operation.input {
                        if self.replace_existing(input.clone(), height).await? {
                            report.upserted_objects += 1;
                        }
                    }
                }
                OperationKind::Delete => {
                    for input in &operation.input {
                        if self.mark_deleted(input, height).await? {
                            report.deleted_objects += 1;
                        }
                    }
                }
                OperationKind::Other(name) => {
                    debug!(operation = %name, height, "skipping operation with no projection");
                }
            }
        }
        Ok(())
    }
}
