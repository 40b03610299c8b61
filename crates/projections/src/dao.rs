//! Read-store DAO contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AggregateId, Context, ItemId};
use domain::{Item, Name};
use thiserror::Error;

/// Errors raised by read-store writes.
#[derive(Debug, Error)]
pub enum DaoError {
    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Write contract against the relational read store.
///
/// Each method is a single asynchronous write; no transaction spans
/// multiple calls. Implementations must be idempotent at row identity
/// (insert-by-id upserts, delete-by-id tolerates absence) so redelivery of
/// a change-stream record leaves the read model unchanged.
#[async_trait]
pub trait ReadModelDao<C: Context>: Send + Sync {
    /// Inserts the aggregate row.
    async fn insert_aggregate(
        &self,
        id: &AggregateId<C>,
        name: &Name,
        at: DateTime<Utc>,
    ) -> Result<(), DaoError>;

    /// Sets the aggregate's logical `deleted` flag; rows are never
    /// physically removed.
    async fn delete_aggregate(
        &self,
        id: &AggregateId<C>,
        at: DateTime<Utc>,
    ) -> Result<(), DaoError>;

    /// Inserts an item row under the aggregate.
    async fn insert_item(
        &self,
        aggregate_id: &AggregateId<C>,
        item: &Item<C>,
        at: DateTime<Utc>,
    ) -> Result<(), DaoError>;

    /// Removes an item row by id.
    async fn delete_item(&self, item_id: &ItemId<C>) -> Result<(), DaoError>;
}
