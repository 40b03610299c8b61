//! The generic aggregate state machine.

use common::{AggregateId, Context, ItemId, UserAccountId};
use event_store::{PersistentAggregate, Version};
use serde::{Deserialize, Serialize};

use crate::error::{AddItemError, DeleteError, DomainError, RemoveItemError, ReplayError};
use crate::event::{Event, EventBody};
use crate::value_objects::{Item, Items, Money, Name};

/// A cart or order: a named, versioned item collection whose only mutation
/// path is emitting an event.
///
/// Commands take `&self` and return the next state paired with the emitted
/// event, or a typed domain error. `sequence_number` advances by exactly 1
/// per applied event; `version` is the optimistic-lock token and is only
/// ever advanced by the storage layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound = "")]
pub struct Aggregate<C: Context> {
    id: AggregateId<C>,
    deleted: bool,
    name: Name,
    items: Items<C>,
    sequence_number: u64,
    version: Version,
}

impl<C: Context> Aggregate<C> {
    /// Brings a new aggregate into existence.
    ///
    /// Sequence number 1, version 1, empty item collection. Infallible: the
    /// id and name have already been validated by the caller.
    pub fn create(
        id: AggregateId<C>,
        name: Name,
        executor_id: UserAccountId,
    ) -> (Self, Event<C>) {
        let sequence_number = 1;
        let aggregate = Self {
            id,
            deleted: false,
            name: name.clone(),
            items: Items::empty(),
            sequence_number,
            version: Version::first(),
        };
        let event = Event::created(id, name, executor_id, sequence_number);
        (aggregate, event)
    }

    /// Merges an item into the collection; an item with the same id is
    /// replaced.
    pub fn add_item(
        &self,
        item: Item<C>,
        executor_id: UserAccountId,
    ) -> Result<(Self, Event<C>), AddItemError> {
        if self.deleted {
            return Err(AddItemError::Deleted { aggregate: C::NAME });
        }

        let sequence_number = self.sequence_number + 1;
        let next = Self {
            items: self.items.add(item.clone()),
            sequence_number,
            ..self.clone()
        };
        let event = Event::item_added(self.id, item, executor_id, sequence_number);

        Ok((next, event))
    }

    /// Removes an item by id; the emitted event carries the removed item.
    pub fn remove_item(
        &self,
        item_id: &ItemId<C>,
        executor_id: UserAccountId,
    ) -> Result<(Self, Event<C>), RemoveItemError> {
        if self.deleted {
            return Err(RemoveItemError::Deleted { aggregate: C::NAME });
        }

        let Some((items, removed)) = self.items.remove_by_id(item_id) else {
            return Err(RemoveItemError::NotFound {
                item_id: item_id.to_string(),
            });
        };

        let sequence_number = self.sequence_number + 1;
        let next = Self {
            items,
            sequence_number,
            ..self.clone()
        };
        let event = Event::item_removed(self.id, removed, executor_id, sequence_number);

        Ok((next, event))
    }

    /// Marks the aggregate deleted. Deletion is logical and terminal: no
    /// further mutation is accepted afterwards.
    pub fn delete(
        &self,
        executor_id: UserAccountId,
    ) -> Result<(Self, Event<C>), DeleteError> {
        if self.deleted {
            return Err(DeleteError::AlreadyDeleted { aggregate: C::NAME });
        }

        let sequence_number = self.sequence_number + 1;
        let next = Self {
            deleted: true,
            sequence_number,
            ..self.clone()
        };
        let event = Event::deleted(self.id, executor_id, sequence_number);

        Ok((next, event))
    }

    /// Pure replay transition, used only while reconstructing state from
    /// stored history. A domain error here means the history is corrupt and
    /// surfaces as a fatal [`ReplayError`].
    pub fn apply_event(&self, event: &Event<C>) -> Result<Self, ReplayError> {
        let result = match event.body() {
            EventBody::Created { .. } => {
                return Err(ReplayError::UnexpectedCreated {
                    event_id: event.id(),
                });
            }
            EventBody::ItemAdded { item } => self
                .add_item(item.clone(), event.executor_id())
                .map_err(DomainError::from),
            EventBody::ItemRemoved { item } => self
                .remove_item(item.id(), event.executor_id())
                .map_err(DomainError::from),
            EventBody::Deleted => self
                .delete(event.executor_id())
                .map_err(DomainError::from),
        };

        match result {
            Ok((next, _)) => Ok(next),
            Err(source) => Err(ReplayError::InvalidTransition {
                event_id: event.id(),
                sequence_number: event.sequence_number(),
                source,
            }),
        }
    }

    /// Left-fold of [`apply_event`](Self::apply_event) over `events`,
    /// starting from `snapshot`. Replaying no events returns the snapshot
    /// unchanged.
    pub fn replay<I>(events: I, snapshot: Self) -> Result<Self, ReplayError>
    where
        I: IntoIterator<Item = Event<C>>,
    {
        events
            .into_iter()
            .try_fold(snapshot, |aggregate, event| aggregate.apply_event(&event))
    }

    /// Returns the aggregate carrying a storage-assigned version.
    pub fn with_version(self, version: Version) -> Self {
        Self { version, ..self }
    }

    pub fn id(&self) -> AggregateId<C> {
        self.id
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn items(&self) -> &Items<C> {
        &self.items
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Sum of the item totals.
    pub fn total_price(&self) -> Money {
        self.items.total_price()
    }
}

impl<C: Context> PersistentAggregate for Aggregate<C> {
    type Id = AggregateId<C>;

    fn id(&self) -> &AggregateId<C> {
        &self.id
    }

    fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    fn version(&self) -> Version {
        self.version
    }

    fn with_version(self, version: Version) -> Self {
        Aggregate::with_version(self, version)
    }
}
