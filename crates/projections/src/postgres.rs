//! PostgreSQL-backed read-store DAO.

use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AggregateId, Context, ItemId};
use domain::{Item, Name};
use sqlx::PgPool;

use crate::dao::{DaoError, ReadModelDao};

/// Read-model DAO writing to a pair of relational tables, e.g.
/// `carts`/`cart_items` or `orders`/`order_items`.
///
/// Inserts upsert on the primary key and deletes tolerate absent rows, so
/// every write is idempotent at row identity.
#[derive(Clone)]
pub struct PostgresReadModelDao<C: Context> {
    pool: PgPool,
    aggregates_table: &'static str,
    items_table: &'static str,
    _context: PhantomData<C>,
}

impl<C: Context> PostgresReadModelDao<C> {
    /// Creates a DAO over the given pool and table names.
    pub fn new(pool: PgPool, aggregates_table: &'static str, items_table: &'static str) -> Self {
        Self {
            pool,
            aggregates_table,
            items_table,
            _context: PhantomData,
        }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl<C: Context> ReadModelDao<C> for PostgresReadModelDao<C> {
    async fn insert_aggregate(
        &self,
        id: &AggregateId<C>,
        name: &Name,
        at: DateTime<Utc>,
    ) -> Result<(), DaoError> {
        let sql = format!(
            "INSERT INTO {} (id, deleted, name, created_at, updated_at) \
             VALUES ($1, false, $2, $3, $3) \
             ON CONFLICT (id) DO UPDATE SET \
                 deleted = false, \
                 name = EXCLUDED.name, \
                 updated_at = EXCLUDED.updated_at",
            self.aggregates_table
        );
        sqlx::query(&sql)
            .bind(id.to_string())
            .bind(name.as_str())
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_aggregate(
        &self,
        id: &AggregateId<C>,
        at: DateTime<Utc>,
    ) -> Result<(), DaoError> {
        let sql = format!(
            "UPDATE {} SET deleted = true, updated_at = $2 WHERE id = $1",
            self.aggregates_table
        );
        sqlx::query(&sql)
            .bind(id.to_string())
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_item(
        &self,
        aggregate_id: &AggregateId<C>,
        item: &Item<C>,
        at: DateTime<Utc>,
    ) -> Result<(), DaoError> {
        let sql = format!(
            "INSERT INTO {} (id, aggregate_id, name, quantity, price, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $6) \
             ON CONFLICT (id) DO UPDATE SET \
                 aggregate_id = EXCLUDED.aggregate_id, \
                 name = EXCLUDED.name, \
                 quantity = EXCLUDED.quantity, \
                 price = EXCLUDED.price, \
                 updated_at = EXCLUDED.updated_at",
            self.items_table
        );
        sqlx::query(&sql)
            .bind(item.id().to_string())
            .bind(aggregate_id.to_string())
            .bind(item.name())
            .bind(i64::from(item.quantity()))
            .bind(item.price().cents())
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_item(&self, item_id: &ItemId<C>) -> Result<(), DaoError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", self.items_table);
        sqlx::query(&sql)
            .bind(item_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
