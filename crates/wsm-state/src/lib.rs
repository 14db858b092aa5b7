//! Ledger state projection for the WorldLine State Machine (WSM).
//!
//! This crate turns a ledger's confirmed blocks into queryable state. It
//! provides:
//! - [`OperationStorage`] -- idempotent operation ingestion, existence checks,
//!   and ordered per-record history
//! - [`StateMachineStorage`] -- the projected object store with lazy,
//!   single-flight catch-up on every read
//! - [`StateConfig`] -- per-ledger configuration
//!
//! Block and event persistence live elsewhere and are reached through the
//! traits in `wsm_store`.

pub mod catch_up;
pub mod config;
pub mod error;
pub mod operations;
pub mod state_machine;

pub use catch_up::CatchUpReport;
pub use config::StateConfig;
pub use error::{NotFoundReason, StateError, StateResult};
pub use operations::{HistoryEntry, InsertManyResult, InsertOptions, OperationStorage};
pub use state_machine::StateMachineStorage;
