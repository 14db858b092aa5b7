//! Storage boundaries for the WorldLine State Machine.
//!
//! The state machine never owns block or event persistence. This crate
//! defines the narrow interfaces it consumes from those stores, plus the two
//! collections it writes to itself:
//!
//! - [`BlockStore`] -- latest height and block-by-height lookup
//! - [`EventStore`] -- event resolution by hash and ordering-field projection
//! - [`OperationCollection`] -- operation documents, unique per
//!   `(event_hash, operation_hash)`
//! - [`ObjectCollection`] -- projected objects and the per-ledger watermark
//!
//! # Storage Backends
//!
//! - [`InMemoryBlockStore`], [`InMemoryEventStore`],
//!   [`InMemoryOperationCollection`], [`InMemoryObjectCollection`] --
//!   `RwLock`-guarded maps for tests, fixtures, and embedding
//!
//! # Design Rules
//!
//! 1. Every identifier is stored under its domain-separated [`wsm_types::IndexKey`].
//! 2. Single-document writes are atomic; there are no multi-document transactions.
//! 3. Uniqueness violations are reported as [`StoreError::Duplicate`], never swallowed.
//! 4. All backend errors are propagated, never retried.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::{
    InMemoryBlockStore, InMemoryEventStore, InMemoryObjectCollection, InMemoryOperationCollection,
};
pub use traits::{
    BlockStore, BulkWriteError, BulkWriteResult, EventStore, ObjectCollection, OperationCollection,
};
