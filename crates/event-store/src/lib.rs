//! Event-log collaborator contract for the event-sourced write side.
//!
//! The append-only storage engine itself lives outside this workspace; this
//! crate defines what the write side needs from it:
//! - [`EventStore`], the four-primitive persistence contract with
//!   optimistic-version checks
//! - [`PersistentEvent`] and [`PersistentAggregate`], the storage-facing
//!   views of domain types
//! - [`EventStoreError`] with a distinguishable optimistic-lock variant
//! - [`InMemoryEventStore`], a reference implementation used by tests

pub mod error;
pub mod memory;
pub mod store;

pub use error::{EventStoreError, Result};
pub use memory::InMemoryEventStore;
pub use store::{EventStore, PersistentAggregate, PersistentEvent, Version};
