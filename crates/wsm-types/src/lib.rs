//! Foundation types for the WorldLine State Machine (WSM).
//!
//! This crate provides the identifiers and ledger entities shared by every
//! other WSM crate. It carries no storage or replay logic of its own.
//!
//! # Key Types
//!
//! - [`LedgerId`] -- Identity of the ledger a projection is scoped to
//! - [`RecordId`], [`EventHash`], [`OperationHash`] -- Opaque content identifiers
//! - [`IndexKey`] -- BLAKE3 index key derived from an identifier
//! - [`Operation`] -- A single record mutation carried by an event
//! - [`Event`] / [`EventMeta`] -- Consensus-confirmable unit and its ordering fields
//! - [`Block`] / [`BlockEvent`] -- Ordered batch of inline or referenced events
//! - [`ProjectedObject`] -- Materialized record state built by replay

pub mod block;
pub mod error;
pub mod event;
pub mod identity;
pub mod object;
pub mod operation;
pub mod projected;

pub use block::{Block, BlockEvent};
pub use error::TypeError;
pub use event::{Event, EventBody, EventMeta, EventOperation};
pub use identity::{EventHash, LedgerId, OperationHash, RecordId};
pub use object::IndexKey;
pub use operation::{Operation, OperationKind};
pub use projected::{ObjectMeta, ProjectedObject, StateRecord, UpdateMeta};
