//! In-memory read model for tests and local wiring.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AggregateId, Context, ItemId};
use domain::{Item, Money, Name};
use tokio::sync::RwLock;

use crate::dao::{DaoError, ReadModelDao};

/// Row in the aggregates table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateRow {
    pub id: String,
    pub name: String,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row in the items table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRow {
    pub id: String,
    pub aggregate_id: String,
    pub name: String,
    pub quantity: u32,
    pub price: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Map-backed [`ReadModelDao`] with the same row-identity idempotency the
/// relational implementation provides.
pub struct InMemoryReadModelDao<C: Context> {
    aggregates: Arc<RwLock<HashMap<String, AggregateRow>>>,
    items: Arc<RwLock<HashMap<String, ItemRow>>>,
    _context: PhantomData<C>,
}

impl<C: Context> InMemoryReadModelDao<C> {
    /// Creates an empty read model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up an aggregate row.
    pub async fn aggregate(&self, id: &AggregateId<C>) -> Option<AggregateRow> {
        self.aggregates.read().await.get(&id.to_string()).cloned()
    }

    /// Item rows belonging to an aggregate, in unspecified order.
    pub async fn items_of(&self, id: &AggregateId<C>) -> Vec<ItemRow> {
        let key = id.to_string();
        self.items
            .read()
            .await
            .values()
            .filter(|row| row.aggregate_id == key)
            .cloned()
            .collect()
    }

    /// Total number of aggregate rows.
    pub async fn aggregate_count(&self) -> usize {
        self.aggregates.read().await.len()
    }

    /// Total number of item rows.
    pub async fn item_count(&self) -> usize {
        self.items.read().await.len()
    }
}

impl<C: Context> Clone for InMemoryReadModelDao<C> {
    fn clone(&self) -> Self {
        Self {
            aggregates: Arc::clone(&self.aggregates),
            items: Arc::clone(&self.items),
            _context: PhantomData,
        }
    }
}

impl<C: Context> Default for InMemoryReadModelDao<C> {
    fn default() -> Self {
        Self {
            aggregates: Arc::new(RwLock::new(HashMap::new())),
            items: Arc::new(RwLock::new(HashMap::new())),
            _context: PhantomData,
        }
    }
}

#[async_trait]
impl<C: Context> ReadModelDao<C> for InMemoryReadModelDao<C> {
    async fn insert_aggregate(
        &self,
        id: &AggregateId<C>,
        name: &Name,
        at: DateTime<Utc>,
    ) -> Result<(), DaoError> {
        let key = id.to_string();
        let mut aggregates = self.aggregates.write().await;
        let created_at = aggregates.get(&key).map_or(at, |row| row.created_at);
        aggregates.insert(
            key.clone(),
            AggregateRow {
                id: key,
                name: name.as_str().to_string(),
                deleted: false,
                created_at,
                updated_at: at,
            },
        );
        Ok(())
    }

    async fn delete_aggregate(
        &self,
        id: &AggregateId<C>,
        at: DateTime<Utc>,
    ) -> Result<(), DaoError> {
        let mut aggregates = self.aggregates.write().await;
        if let Some(row) = aggregates.get_mut(&id.to_string()) {
            row.deleted = true;
            row.updated_at = at;
        }
        Ok(())
    }

    async fn insert_item(
        &self,
        aggregate_id: &AggregateId<C>,
        item: &Item<C>,
        at: DateTime<Utc>,
    ) -> Result<(), DaoError> {
        let key = item.id().to_string();
        let mut items = self.items.write().await;
        let created_at = items.get(&key).map_or(at, |row| row.created_at);
        items.insert(
            key.clone(),
            ItemRow {
                id: key,
                aggregate_id: aggregate_id.to_string(),
                name: item.name().to_string(),
                quantity: item.quantity(),
                price: item.price(),
                created_at,
                updated_at: at,
            },
        );
        Ok(())
    }

    async fn delete_item(&self, item_id: &ItemId<C>) -> Result<(), DaoError> {
        self.items.write().await.remove(&item_id.to_string());
        Ok(())
    }
}
