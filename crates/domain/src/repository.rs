//! Optimistic-concurrency repository over the event-log collaborator.

use std::sync::Arc;

use async_trait::async_trait;
use common::{AggregateId, Context};
use event_store::{EventStore, EventStoreError, Version};
use thiserror::Error;

use crate::aggregate::Aggregate;
use crate::error::ReplayError;
use crate::event::Event;

/// Policy deciding whether persisting `event` should also write a snapshot
/// of the aggregate after the event.
pub type SnapshotDecider<C> = Arc<dyn Fn(&Event<C>, &Aggregate<C>) -> bool + Send + Sync>;

/// Snapshot cadence: true for every `number_of_events`-th event.
///
/// `number_of_events` must be non-zero.
pub fn retention_criteria_of<C: Context>(number_of_events: u64) -> SnapshotDecider<C> {
    assert!(number_of_events > 0, "retention interval must be non-zero");
    Arc::new(move |event, _| event.sequence_number() % number_of_events == 0)
}

/// Errors raised by the repository.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Another writer persisted first; the caller's view of the aggregate
    /// is stale.
    #[error("failed to store event due to optimistic lock conflict")]
    Conflict(#[source] EventStoreError),

    /// Any other failure of the event-log collaborator.
    #[error("event store operation failed")]
    Store(#[source] EventStoreError),

    /// Stored history did not replay cleanly over its snapshot.
    #[error("failed to reconstruct aggregate from stored history")]
    Replay(#[from] ReplayError),
}

impl RepositoryError {
    /// True when this error wraps an optimistic-lock conflict. The command
    /// processor and API layer classify on this.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    fn from_store(error: EventStoreError) -> Self {
        if error.is_optimistic_lock() {
            Self::Conflict(error)
        } else {
            Self::Store(error)
        }
    }
}

/// Persistence seam consumed by the command processor.
#[async_trait]
pub trait Repository<C: Context>: Send + Sync {
    /// Persists `event`, adding a snapshot of `aggregate` when the event is
    /// a creation event or the retention policy asks for one.
    async fn store(
        &self,
        event: &Event<C>,
        aggregate: &Aggregate<C>,
    ) -> Result<(), RepositoryError>;

    /// Persists the event alone, passing `version` as the optimistic-lock
    /// token.
    async fn store_event(&self, event: &Event<C>, version: Version)
    -> Result<(), RepositoryError>;

    /// Persists the event together with a full snapshot, atomically.
    async fn store_event_and_snapshot(
        &self,
        event: &Event<C>,
        aggregate: &Aggregate<C>,
    ) -> Result<(), RepositoryError>;

    /// Reconstructs the current aggregate from its latest snapshot plus the
    /// events since it. `None` when the aggregate has never been persisted.
    async fn find_by_id(
        &self,
        id: &AggregateId<C>,
    ) -> Result<Option<Aggregate<C>>, RepositoryError>;
}

/// Repository over any [`EventStore`] for the context's aggregate/event
/// pair.
#[derive(Clone)]
pub struct EventSourcedRepository<C: Context, S> {
    event_store: S,
    snapshot_decider: Option<SnapshotDecider<C>>,
}

impl<C: Context, S> EventSourcedRepository<C, S> {
    /// Creates a repository that snapshots creation events only.
    pub fn new(event_store: S) -> Self {
        Self {
            event_store,
            snapshot_decider: None,
        }
    }

    /// Returns a repository that additionally snapshots every
    /// `number_of_events`-th event.
    pub fn with_retention(&self, number_of_events: u64) -> Self
    where
        S: Clone,
    {
        Self {
            event_store: self.event_store.clone(),
            snapshot_decider: Some(retention_criteria_of(number_of_events)),
        }
    }
}

#[async_trait]
impl<C, S> Repository<C> for EventSourcedRepository<C, S>
where
    C: Context,
    S: EventStore<Aggregate = Aggregate<C>, Event = Event<C>>,
{
    async fn store(
        &self,
        event: &Event<C>,
        aggregate: &Aggregate<C>,
    ) -> Result<(), RepositoryError> {
        let snapshot_requested = self
            .snapshot_decider
            .as_ref()
            .is_some_and(|decider| decider(event, aggregate));

        if event.is_created() || snapshot_requested {
            self.store_event_and_snapshot(event, aggregate).await
        } else {
            self.store_event(event, aggregate.version()).await
        }
    }

    async fn store_event(
        &self,
        event: &Event<C>,
        version: Version,
    ) -> Result<(), RepositoryError> {
        self.event_store
            .persist_event(event, version)
            .await
            .map_err(RepositoryError::from_store)
    }

    async fn store_event_and_snapshot(
        &self,
        event: &Event<C>,
        aggregate: &Aggregate<C>,
    ) -> Result<(), RepositoryError> {
        self.event_store
            .persist_event_and_snapshot(event, aggregate)
            .await
            .map_err(RepositoryError::from_store)
    }

    async fn find_by_id(
        &self,
        id: &AggregateId<C>,
    ) -> Result<Option<Aggregate<C>>, RepositoryError> {
        let Some(snapshot) = self
            .event_store
            .get_latest_snapshot_by_id(id)
            .await
            .map_err(RepositoryError::from_store)?
        else {
            return Ok(None);
        };

        let events = self
            .event_store
            .get_events_by_id_since_sequence_number(id, snapshot.sequence_number() + 1)
            .await
            .map_err(RepositoryError::from_store)?;

        let aggregate = Aggregate::replay(events, snapshot)?;
        Ok(Some(aggregate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::{Item, Money, Name};
    use common::{CartContext, ItemId, UserAccountId};
    use event_store::InMemoryEventStore;

    type Cart = Aggregate<CartContext>;
    type CartEvent = Event<CartContext>;
    type Store = InMemoryEventStore<Cart, CartEvent>;
    type Repo = EventSourcedRepository<CartContext, Store>;

    fn apple() -> Item<CartContext> {
        Item::new(ItemId::generate(), "apple", 2, Money::from_cents(150)).unwrap()
    }

    fn created_cart() -> (Cart, CartEvent, UserAccountId) {
        let executor = UserAccountId::generate();
        let (cart, event) = Cart::create(
            AggregateId::generate(),
            Name::new("sample").unwrap(),
            executor,
        );
        (cart, event, executor)
    }

    #[test]
    fn retention_criteria_matches_multiples() {
        let decider = retention_criteria_of::<CartContext>(2);
        let executor = UserAccountId::generate();
        let (cart, _) = Cart::create(
            AggregateId::generate(),
            Name::new("sample").unwrap(),
            executor,
        );

        let at4 = CartEvent::deleted(cart.id(), executor, 4);
        let at5 = CartEvent::deleted(cart.id(), executor, 5);
        assert!(decider(&at4, &cart));
        assert!(!decider(&at5, &cart));
    }

    #[tokio::test]
    async fn created_events_are_always_snapshotted() {
        let store = Store::new();
        let repo = Repo::new(store.clone());
        let (cart, event, _) = created_cart();

        repo.store(&event, &cart).await.unwrap();

        let stored = store.stored_snapshot(&cart.id()).await.unwrap();
        assert_eq!(stored.sequence_number(), 1);
    }

    #[tokio::test]
    async fn non_created_events_skip_snapshot_without_retention() {
        let store = Store::new();
        let repo = Repo::new(store.clone());
        let (cart, created, executor) = created_cart();
        repo.store(&created, &cart).await.unwrap();

        let cart = repo.find_by_id(&cart.id()).await.unwrap().unwrap();
        let (next, event) = cart.add_item(apple(), executor).unwrap();
        repo.store(&event, &next).await.unwrap();

        // Snapshot still reflects creation; the new event went to the
        // journal alone.
        let stored = store.stored_snapshot(&cart.id()).await.unwrap();
        assert_eq!(stored.sequence_number(), 1);
        assert_eq!(store.event_count().await, 2);
    }

    #[tokio::test]
    async fn retention_snapshots_every_nth_event() {
        let store = Store::new();
        let repo = Repo::new(store.clone()).with_retention(2);
        let (cart, created, executor) = created_cart();
        repo.store(&created, &cart).await.unwrap();

        // Sequence 2: retention hit, snapshot written.
        let cart = repo.find_by_id(&cart.id()).await.unwrap().unwrap();
        let (cart, event) = cart.add_item(apple(), executor).unwrap();
        repo.store(&event, &cart).await.unwrap();
        let stored = store.stored_snapshot(&cart.id()).await.unwrap();
        assert_eq!(stored.sequence_number(), 2);

        // Sequence 3: no retention hit, snapshot unchanged.
        let cart = repo.find_by_id(&cart.id()).await.unwrap().unwrap();
        let (cart, event) = cart.add_item(apple(), executor).unwrap();
        repo.store(&event, &cart).await.unwrap();
        let stored = store.stored_snapshot(&cart.id()).await.unwrap();
        assert_eq!(stored.sequence_number(), 2);
    }

    #[tokio::test]
    async fn find_by_id_replays_events_over_snapshot() {
        let store = Store::new();
        let repo = Repo::new(store.clone());
        let (cart, created, executor) = created_cart();
        repo.store(&created, &cart).await.unwrap();

        let loaded = repo.find_by_id(&cart.id()).await.unwrap().unwrap();
        let (after_add, event) = loaded.add_item(apple(), executor).unwrap();
        repo.store(&event, &after_add).await.unwrap();

        let reconstructed = repo.find_by_id(&cart.id()).await.unwrap().unwrap();
        assert_eq!(reconstructed.sequence_number(), 2);
        assert_eq!(reconstructed.total_price(), Money::from_cents(300));
        assert_eq!(reconstructed.version(), Version::new(2));
    }

    #[tokio::test]
    async fn find_by_id_returns_none_for_unknown_aggregate() {
        let store = Store::new();
        let repo = Repo::new(store);
        let result = repo.find_by_id(&AggregateId::generate()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn racing_writers_produce_a_distinguishable_conflict() {
        let store = Store::new();
        let repo = Repo::new(store.clone());
        let (cart, created, executor) = created_cart();
        repo.store(&created, &cart).await.unwrap();

        // Two writers load the same state.
        let first = repo.find_by_id(&cart.id()).await.unwrap().unwrap();
        let second = first.clone();

        let (first_next, first_event) = first.add_item(apple(), executor).unwrap();
        repo.store(&first_event, &first_next).await.unwrap();

        let (second_next, second_event) = second.add_item(apple(), executor).unwrap();
        let err = repo.store(&second_event, &second_next).await.unwrap_err();

        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn generic_store_failures_are_not_conflicts() {
        let err = RepositoryError::from_store(EventStoreError::storage("connection reset"));
        assert!(!err.is_conflict());
        assert!(matches!(err, RepositoryError::Store(_)));
    }
}
