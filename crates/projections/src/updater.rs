//! Change-stream projector feeding the read store.

use std::marker::PhantomData;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use common::Context;
use domain::{Event, EventBody};
use tracing::{debug, warn};

use crate::dao::ReadModelDao;
use crate::error::ProjectionError;
use crate::stream::{AttributeValue, StreamBatch};

/// Attribute of the new image holding the base64-encoded event payload.
const PAYLOAD_ATTRIBUTE: &str = "payload";

/// Consumes change-stream batches and applies them to the read-store DAO.
///
/// Records are processed strictly sequentially; per-aggregate ordering is
/// the stream's responsibility.
pub struct ReadModelUpdater<C: Context, D> {
    dao: D,
    _context: PhantomData<C>,
}

impl<C: Context, D: ReadModelDao<C>> ReadModelUpdater<C, D> {
    /// Creates an updater over the given DAO.
    pub fn new(dao: D) -> Self {
        Self {
            dao,
            _context: PhantomData,
        }
    }

    /// Applies a delivered batch to the read model.
    ///
    /// A record missing its body, new image, or binary payload attribute
    /// logs a warning and ends processing of the whole batch with success,
    /// so the consumer does not redeliver it. Decode and DAO failures
    /// propagate instead and the consumer redelivers the batch; DAO writes
    /// are idempotent by row identity to make that safe.
    #[tracing::instrument(skip_all, fields(context = C::NAME, records = batch.records.len()))]
    pub async fn update_read_model(&self, batch: &StreamBatch) -> Result<(), ProjectionError> {
        for record in &batch.records {
            let Some(body) = record.body.as_ref() else {
                warn!("record has no body, dropping the rest of the batch");
                return Ok(());
            };
            let Some(image) = body.new_image.as_ref() else {
                warn!("record has no new image, dropping the rest of the batch");
                return Ok(());
            };
            let Some(AttributeValue::B(encoded)) = image.get(PAYLOAD_ATTRIBUTE) else {
                warn!("record has no binary payload attribute, dropping the rest of the batch");
                return Ok(());
            };

            let payload = BASE64.decode(encoded)?;
            let payload = String::from_utf8(payload)?;
            let event: Event<C> = serde_json::from_str(&payload)?;

            self.apply(&event).await?;
            metrics::counter!("read_model_records_applied", "context" => C::NAME).increment(1);
        }
        Ok(())
    }

    async fn apply(&self, event: &Event<C>) -> Result<(), ProjectionError> {
        debug!(
            event_type = %event.event_type(),
            aggregate_id = %event.aggregate_id(),
            sequence_number = event.sequence_number(),
            "applying event to read model"
        );
        match event.body() {
            EventBody::Created { name } => {
                self.dao
                    .insert_aggregate(&event.aggregate_id(), name, Utc::now())
                    .await?;
            }
            EventBody::Deleted => {
                self.dao
                    .delete_aggregate(&event.aggregate_id(), Utc::now())
                    .await?;
            }
            EventBody::ItemAdded { item } => {
                self.dao
                    .insert_item(&event.aggregate_id(), item, Utc::now())
                    .await?;
            }
            EventBody::ItemRemoved { item } => {
                self.dao.delete_item(item.id()).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::DaoError;
    use crate::memory::InMemoryReadModelDao;
    use crate::stream::StreamRecord;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use common::{AggregateId, CartContext, ItemId, UserAccountId};
    use domain::{Aggregate, Item, Money, Name};
    use std::collections::HashMap;

    type Cart = Aggregate<CartContext>;
    type CartEvent = Event<CartContext>;
    type Dao = InMemoryReadModelDao<CartContext>;
    type Updater = ReadModelUpdater<CartContext, Dao>;

    fn record_for(event: &CartEvent) -> StreamRecord {
        let payload = serde_json::to_string(event).unwrap();
        let encoded = BASE64.encode(payload.as_bytes());
        let mut image = HashMap::new();
        image.insert(
            PAYLOAD_ATTRIBUTE.to_string(),
            AttributeValue::B(encoded),
        );
        StreamRecord::with_image(image)
    }

    fn created_event() -> CartEvent {
        let executor = UserAccountId::generate();
        let (_, event) = Cart::create(
            AggregateId::generate(),
            Name::new("sample").unwrap(),
            executor,
        );
        event
    }

    #[tokio::test]
    async fn created_record_inserts_exactly_one_row() {
        let dao = Dao::new();
        let updater = Updater::new(dao.clone());
        let event = created_event();

        updater
            .update_read_model(&StreamBatch::new(vec![record_for(&event)]))
            .await
            .unwrap();

        assert_eq!(dao.aggregate_count().await, 1);
        let row = dao.aggregate(&event.aggregate_id()).await.unwrap();
        assert_eq!(row.name, "sample");
    }

    #[tokio::test]
    async fn record_without_payload_attribute_is_not_an_error() {
        let dao = Dao::new();
        let updater = Updater::new(dao.clone());

        // Wrong variant under the payload key.
        let mut image = HashMap::new();
        image.insert(
            PAYLOAD_ATTRIBUTE.to_string(),
            AttributeValue::S("not binary".to_string()),
        );
        let batch = StreamBatch::new(vec![StreamRecord::with_image(image)]);

        updater.update_read_model(&batch).await.unwrap();
        assert_eq!(dao.aggregate_count().await, 0);
    }

    #[tokio::test]
    async fn malformed_record_aborts_the_whole_batch() {
        // A structurally bad record stops the batch; it is not skipped.
        let dao = Dao::new();
        let updater = Updater::new(dao.clone());
        let good = created_event();

        let batch = StreamBatch::new(vec![StreamRecord::default(), record_for(&good)]);
        updater.update_read_model(&batch).await.unwrap();

        assert_eq!(dao.aggregate_count().await, 0);
    }

    #[tokio::test]
    async fn invalid_base64_propagates() {
        let dao = Dao::new();
        let updater = Updater::new(dao);

        let mut image = HashMap::new();
        image.insert(
            PAYLOAD_ATTRIBUTE.to_string(),
            AttributeValue::B("!!not-base64!!".to_string()),
        );
        let batch = StreamBatch::new(vec![StreamRecord::with_image(image)]);

        let err = updater.update_read_model(&batch).await.unwrap_err();
        assert!(matches!(err, ProjectionError::Base64(_)));
    }

    #[tokio::test]
    async fn unknown_event_type_propagates() {
        let dao = Dao::new();
        let updater = Updater::new(dao);

        let encoded = BASE64.encode(br#"{"type":"CartExploded","data":{}}"#);
        let mut image = HashMap::new();
        image.insert(PAYLOAD_ATTRIBUTE.to_string(), AttributeValue::B(encoded));
        let batch = StreamBatch::new(vec![StreamRecord::with_image(image)]);

        let err = updater.update_read_model(&batch).await.unwrap_err();
        assert!(matches!(err, ProjectionError::Deserialization(_)));
    }

    #[tokio::test]
    async fn dao_failures_propagate_for_redelivery() {
        struct FailingDao;

        #[async_trait]
        impl ReadModelDao<CartContext> for FailingDao {
            async fn insert_aggregate(
                &self,
                _id: &AggregateId<CartContext>,
                _name: &Name,
                _at: DateTime<Utc>,
            ) -> Result<(), DaoError> {
                Err(DaoError::Database(sqlx::Error::PoolClosed))
            }

            async fn delete_aggregate(
                &self,
                _id: &AggregateId<CartContext>,
                _at: DateTime<Utc>,
            ) -> Result<(), DaoError> {
                Err(DaoError::Database(sqlx::Error::PoolClosed))
            }

            async fn insert_item(
                &self,
                _aggregate_id: &AggregateId<CartContext>,
                _item: &Item<CartContext>,
                _at: DateTime<Utc>,
            ) -> Result<(), DaoError> {
                Err(DaoError::Database(sqlx::Error::PoolClosed))
            }

            async fn delete_item(
                &self,
                _item_id: &ItemId<CartContext>,
            ) -> Result<(), DaoError> {
                Err(DaoError::Database(sqlx::Error::PoolClosed))
            }
        }

        let updater = ReadModelUpdater::<CartContext, _>::new(FailingDao);
        let batch = StreamBatch::new(vec![record_for(&created_event())]);

        let err = updater.update_read_model(&batch).await.unwrap_err();
        assert!(matches!(err, ProjectionError::Dao(_)));
    }

    #[tokio::test]
    async fn item_events_dispatch_to_item_writes() {
        let dao = Dao::new();
        let updater = Updater::new(dao.clone());
        let executor = UserAccountId::generate();

        let (cart, created) = Cart::create(
            AggregateId::generate(),
            Name::new("sample").unwrap(),
            executor,
        );
        let item = Item::new(ItemId::generate(), "apple", 2, Money::from_cents(150)).unwrap();
        let (cart, added) = cart.add_item(item.clone(), executor).unwrap();
        let (_, removed) = cart.remove_item(item.id(), executor).unwrap();

        updater
            .update_read_model(&StreamBatch::new(vec![
                record_for(&created),
                record_for(&added),
            ]))
            .await
            .unwrap();
        assert_eq!(dao.items_of(&cart.id()).await.len(), 1);

        updater
            .update_read_model(&StreamBatch::new(vec![record_for(&removed)]))
            .await
            .unwrap();
        assert!(dao.items_of(&cart.id()).await.is_empty());
    }
}
