//! Read-model side of the write pipeline.
//!
//! The event log emits an at-least-once change stream as events are
//! persisted. This crate decodes those records and materializes them into
//! the relational read store:
//! - [`AttributeValue`], [`StreamBatch`], [`StreamRecord`]: the
//!   self-describing record wire model
//! - [`ReadModelDao`]: the insert/update/delete contract against the read
//!   store, with Postgres and in-memory implementations
//! - [`ReadModelUpdater`]: the projector walking each delivered batch
//!
//! DAO writes are idempotent at row identity, so redelivered batches leave
//! the read model unchanged.

pub mod dao;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod stream;
pub mod updater;

pub use dao::{DaoError, ReadModelDao};
pub use error::{ProjectionError, Result};
pub use memory::{AggregateRow, InMemoryReadModelDao, ItemRow};
pub use postgres::PostgresReadModelDao;
pub use stream::{AttributeValue, RecordBody, StreamBatch, StreamRecord};
pub use updater::ReadModelUpdater;
