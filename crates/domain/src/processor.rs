//! Command processor: the load → mutate → persist cycle.

use std::marker::PhantomData;

use common::{AggregateId, Context, ItemId, UserAccountId};
use thiserror::Error;

use crate::aggregate::Aggregate;
use crate::error::DomainError;
use crate::event::Event;
use crate::repository::{Repository, RepositoryError};
use crate::value_objects::{Item, Name};

/// Cause carried by [`ProcessError::Internal`].
#[derive(Debug, Error)]
pub enum ProcessCause {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Failures surfaced to the API layer.
///
/// Exactly two kinds: the target aggregate does not exist, or something
/// else went wrong. The wrapped cause stays inspectable so the API layer
/// can classify conflicts and invariant violations.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("{aggregate} not found")]
    NotFound { aggregate: &'static str },

    #[error("{context}")]
    Internal {
        context: &'static str,
        #[source]
        cause: ProcessCause,
    },
}

impl ProcessError {
    fn internal(context: &'static str, cause: impl Into<ProcessCause>) -> Self {
        Self::Internal {
            context,
            cause: cause.into(),
        }
    }

    /// True when the underlying cause is an optimistic-lock conflict
    /// (HTTP 409 at the API boundary).
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::Internal {
                cause: ProcessCause::Repository(e),
                ..
            } if e.is_conflict()
        )
    }

    /// True when the underlying cause is a domain invariant violation
    /// (HTTP 422 at the API boundary).
    pub fn is_domain_violation(&self) -> bool {
        matches!(
            self,
            Self::Internal {
                cause: ProcessCause::Domain(_),
                ..
            }
        )
    }
}

/// Executes commands against one bounded context through a [`Repository`].
///
/// Each invocation operates on exactly one aggregate and relies entirely on
/// the storage collaborator's optimistic-version check for concurrency
/// control; conflicts surface as internal errors and retrying is the
/// caller's decision.
pub struct CommandProcessor<C: Context, R> {
    repository: R,
    _context: PhantomData<C>,
}

impl<C: Context, R: Repository<C>> CommandProcessor<C, R> {
    /// Creates a processor over the given repository.
    pub fn new(repository: R) -> Self {
        Self {
            repository,
            _context: PhantomData,
        }
    }

    /// Creates a new aggregate with a freshly generated id and returns the
    /// creation event. Creation events always go through the snapshot path.
    #[tracing::instrument(skip(self), fields(context = C::NAME))]
    pub async fn create(
        &self,
        name: Name,
        executor_id: UserAccountId,
    ) -> Result<Event<C>, ProcessError> {
        let id = AggregateId::generate();
        let (aggregate, event) = Aggregate::create(id, name, executor_id);
        self.store(&event, &aggregate).await?;
        metrics::counter!("commands_processed", "context" => C::NAME, "command" => "create")
            .increment(1);
        Ok(event)
    }

    /// Adds an item to an existing aggregate and returns the emitted event.
    #[tracing::instrument(skip(self), fields(context = C::NAME))]
    pub async fn add_item(
        &self,
        id: &AggregateId<C>,
        item: Item<C>,
        executor_id: UserAccountId,
    ) -> Result<Event<C>, ProcessError> {
        let aggregate = self.load(id).await?;
        let (next, event) = aggregate
            .add_item(item, executor_id)
            .map_err(|e| ProcessError::internal("failed to add item", DomainError::from(e)))?;
        self.store(&event, &next).await?;
        metrics::counter!("commands_processed", "context" => C::NAME, "command" => "add_item")
            .increment(1);
        Ok(event)
    }

    /// Removes an item from an existing aggregate and returns the emitted
    /// event.
    #[tracing::instrument(skip(self), fields(context = C::NAME))]
    pub async fn remove_item(
        &self,
        id: &AggregateId<C>,
        item_id: &ItemId<C>,
        executor_id: UserAccountId,
    ) -> Result<Event<C>, ProcessError> {
        let aggregate = self.load(id).await?;
        let (next, event) = aggregate
            .remove_item(item_id, executor_id)
            .map_err(|e| ProcessError::internal("failed to remove item", DomainError::from(e)))?;
        self.store(&event, &next).await?;
        metrics::counter!("commands_processed", "context" => C::NAME, "command" => "remove_item")
            .increment(1);
        Ok(event)
    }

    /// Logically deletes an existing aggregate and returns the emitted
    /// event.
    #[tracing::instrument(skip(self), fields(context = C::NAME))]
    pub async fn delete(
        &self,
        id: &AggregateId<C>,
        executor_id: UserAccountId,
    ) -> Result<Event<C>, ProcessError> {
        let aggregate = self.load(id).await?;
        let (next, event) = aggregate
            .delete(executor_id)
            .map_err(|e| ProcessError::internal("failed to delete", DomainError::from(e)))?;
        self.store(&event, &next).await?;
        metrics::counter!("commands_processed", "context" => C::NAME, "command" => "delete")
            .increment(1);
        Ok(event)
    }

    async fn load(&self, id: &AggregateId<C>) -> Result<Aggregate<C>, ProcessError> {
        let found = self
            .repository
            .find_by_id(id)
            .await
            .map_err(|e| ProcessError::internal("repository operation failed", e))?;
        found.ok_or(ProcessError::NotFound { aggregate: C::NAME })
    }

    async fn store(
        &self,
        event: &Event<C>,
        aggregate: &Aggregate<C>,
    ) -> Result<(), ProcessError> {
        self.repository
            .store(event, aggregate)
            .await
            .map_err(|e| ProcessError::internal("repository operation failed", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::EventSourcedRepository;
    use crate::value_objects::Money;
    use crate::{EventBody, EventKind};
    use common::CartContext;
    use event_store::InMemoryEventStore;

    type Cart = Aggregate<CartContext>;
    type CartEvent = Event<CartContext>;
    type Store = InMemoryEventStore<Cart, CartEvent>;
    type Repo = EventSourcedRepository<CartContext, Store>;
    type Processor = CommandProcessor<CartContext, Repo>;

    fn setup() -> (Store, Repo, Processor) {
        let store = Store::new();
        let repo = Repo::new(store.clone());
        let processor = Processor::new(Repo::new(store.clone()));
        (store, repo, processor)
    }

    fn apple() -> Item<CartContext> {
        Item::new(ItemId::generate(), "apple", 2, Money::from_cents(150)).unwrap()
    }

    #[tokio::test]
    async fn create_returns_creation_event() {
        let (store, repo, processor) = setup();
        let executor = UserAccountId::generate();

        let event = processor
            .create(Name::new("sample").unwrap(), executor)
            .await
            .unwrap();

        assert_eq!(event.kind(), EventKind::Created);
        assert_eq!(event.sequence_number(), 1);
        // Creation always snapshots.
        assert!(store.stored_snapshot(&event.aggregate_id()).await.is_some());

        let cart = repo
            .find_by_id(&event.aggregate_id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cart.name().as_str(), "sample");
    }

    #[tokio::test]
    async fn add_item_to_unknown_aggregate_is_not_found() {
        let (_, _, processor) = setup();
        let executor = UserAccountId::generate();

        let err = processor
            .add_item(&AggregateId::generate(), apple(), executor)
            .await
            .unwrap_err();

        assert!(matches!(err, ProcessError::NotFound { aggregate: "Cart" }));
        assert!(!err.is_conflict());
        assert!(!err.is_domain_violation());
    }

    #[tokio::test]
    async fn add_remove_delete_cycle() {
        let (_, repo, processor) = setup();
        let executor = UserAccountId::generate();

        let created = processor
            .create(Name::new("sample").unwrap(), executor)
            .await
            .unwrap();
        let id = created.aggregate_id();

        let added = processor.add_item(&id, apple(), executor).await.unwrap();
        assert_eq!(added.sequence_number(), 2);
        let item_id = match added.body() {
            EventBody::ItemAdded { item } => *item.id(),
            other => panic!("unexpected body: {other:?}"),
        };

        let removed = processor
            .remove_item(&id, &item_id, executor)
            .await
            .unwrap();
        assert_eq!(removed.sequence_number(), 3);

        let deleted = processor.delete(&id, executor).await.unwrap();
        assert_eq!(deleted.sequence_number(), 4);

        let cart = repo.find_by_id(&id).await.unwrap().unwrap();
        assert!(cart.is_deleted());
        assert!(cart.items().is_empty());
    }

    #[tokio::test]
    async fn domain_failures_become_internal_errors() {
        let (_, _, processor) = setup();
        let executor = UserAccountId::generate();

        let created = processor
            .create(Name::new("sample").unwrap(), executor)
            .await
            .unwrap();
        let id = created.aggregate_id();

        processor.delete(&id, executor).await.unwrap();
        let err = processor.delete(&id, executor).await.unwrap_err();

        assert!(err.is_domain_violation());
        assert!(!err.is_conflict());
        assert!(matches!(
            err,
            ProcessError::Internal {
                cause: ProcessCause::Domain(DomainError::Delete(_)),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn conflicts_are_classified_as_conflicts() {
        let (_, repo, processor) = setup();
        let executor = UserAccountId::generate();

        let created = processor
            .create(Name::new("sample").unwrap(), executor)
            .await
            .unwrap();
        let id = created.aggregate_id();

        // A second writer persists behind the repository's back, so the
        // processor's next store sees a stale version.
        let stale = repo.find_by_id(&id).await.unwrap().unwrap();
        let (next, event) = stale.add_item(apple(), executor).unwrap();

        processor.add_item(&id, apple(), executor).await.unwrap();
        let err = repo.store(&event, &next).await.unwrap_err();
        assert!(err.is_conflict());

        let wrapped = ProcessError::internal("repository operation failed", err);
        assert!(wrapped.is_conflict());
        assert!(!wrapped.is_domain_violation());
    }
}
