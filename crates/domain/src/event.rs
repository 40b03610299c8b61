//! Domain event catalog and its wire envelope.
//!
//! Events serialize as the self-describing envelope
//! `{"type": "<Context><Kind>", "data": {...}}` consumed by the
//! change-stream projector, so the serde representation *is* the wire
//! format.

use chrono::{DateTime, Utc};
use common::{AggregateId, Context, EventId, UserAccountId};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::value_objects::{Item, Name};

/// Discriminant of the event catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Created,
    ItemAdded,
    ItemRemoved,
    Deleted,
}

impl EventKind {
    /// Suffix appended to the context name to form the wire type tag.
    pub fn suffix(&self) -> &'static str {
        match self {
            EventKind::Created => "Created",
            EventKind::ItemAdded => "ItemAdded",
            EventKind::ItemRemoved => "ItemRemoved",
            EventKind::Deleted => "Deleted",
        }
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "Created" => Some(EventKind::Created),
            "ItemAdded" => Some(EventKind::ItemAdded),
            "ItemRemoved" => Some(EventKind::ItemRemoved),
            "Deleted" => Some(EventKind::Deleted),
            _ => None,
        }
    }
}

/// Kind-specific payload of an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventBody<C: Context> {
    /// The aggregate came into existence with the given name.
    Created { name: Name },

    /// An item was merged into the collection.
    ItemAdded { item: Item<C> },

    /// An item was removed; the event carries the removed item.
    ItemRemoved { item: Item<C> },

    /// The aggregate was logically deleted.
    Deleted,
}

/// An immutable domain event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event<C: Context> {
    id: EventId,
    aggregate_id: AggregateId<C>,
    sequence_number: u64,
    occurred_at: DateTime<Utc>,
    executor_id: UserAccountId,
    body: EventBody<C>,
}

impl<C: Context> Event<C> {
    fn new(
        aggregate_id: AggregateId<C>,
        executor_id: UserAccountId,
        sequence_number: u64,
        body: EventBody<C>,
    ) -> Self {
        Self {
            id: EventId::generate(),
            aggregate_id,
            sequence_number,
            occurred_at: Utc::now(),
            executor_id,
            body,
        }
    }

    /// A creation event.
    pub fn created(
        aggregate_id: AggregateId<C>,
        name: Name,
        executor_id: UserAccountId,
        sequence_number: u64,
    ) -> Self {
        Self::new(
            aggregate_id,
            executor_id,
            sequence_number,
            EventBody::Created { name },
        )
    }

    /// An item-added event.
    pub fn item_added(
        aggregate_id: AggregateId<C>,
        item: Item<C>,
        executor_id: UserAccountId,
        sequence_number: u64,
    ) -> Self {
        Self::new(
            aggregate_id,
            executor_id,
            sequence_number,
            EventBody::ItemAdded { item },
        )
    }

    /// An item-removed event carrying the removed item.
    pub fn item_removed(
        aggregate_id: AggregateId<C>,
        item: Item<C>,
        executor_id: UserAccountId,
        sequence_number: u64,
    ) -> Self {
        Self::new(
            aggregate_id,
            executor_id,
            sequence_number,
            EventBody::ItemRemoved { item },
        )
    }

    /// A logical-deletion event.
    pub fn deleted(
        aggregate_id: AggregateId<C>,
        executor_id: UserAccountId,
        sequence_number: u64,
    ) -> Self {
        Self::new(aggregate_id, executor_id, sequence_number, EventBody::Deleted)
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn aggregate_id(&self) -> AggregateId<C> {
        self.aggregate_id
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn executor_id(&self) -> UserAccountId {
        self.executor_id
    }

    pub fn body(&self) -> &EventBody<C> {
        &self.body
    }

    /// The payload-free discriminant.
    pub fn kind(&self) -> EventKind {
        match self.body {
            EventBody::Created { .. } => EventKind::Created,
            EventBody::ItemAdded { .. } => EventKind::ItemAdded,
            EventBody::ItemRemoved { .. } => EventKind::ItemRemoved,
            EventBody::Deleted => EventKind::Deleted,
        }
    }

    /// True only for creation events; the repository always snapshots these.
    pub fn is_created(&self) -> bool {
        matches!(self.body, EventBody::Created { .. })
    }

    /// Wire type tag, e.g. `"CartItemAdded"`.
    pub fn event_type(&self) -> String {
        format!("{}{}", C::NAME, self.kind().suffix())
    }
}

impl<C: Context> event_store::PersistentEvent for Event<C> {
    type AggregateId = AggregateId<C>;

    fn aggregate_id(&self) -> &AggregateId<C> {
        &self.aggregate_id
    }

    fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    fn is_created(&self) -> bool {
        Event::is_created(self)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound = "")]
struct WireData<C: Context> {
    id: EventId,
    aggregate_id: AggregateId<C>,
    executor_id: UserAccountId,
    sequence_number: u64,
    occurred_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<Name>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    item: Option<Item<C>>,
}

#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
struct WireEnvelope<C: Context> {
    #[serde(rename = "type")]
    event_type: String,
    data: WireData<C>,
}

impl<C: Context> Serialize for Event<C> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let (name, item) = match &self.body {
            EventBody::Created { name } => (Some(name.clone()), None),
            EventBody::ItemAdded { item } | EventBody::ItemRemoved { item } => {
                (None, Some(item.clone()))
            }
            EventBody::Deleted => (None, None),
        };
        let envelope = WireEnvelope {
            event_type: self.event_type(),
            data: WireData {
                id: self.id,
                aggregate_id: self.aggregate_id,
                executor_id: self.executor_id,
                sequence_number: self.sequence_number,
                occurred_at: self.occurred_at,
                name,
                item,
            },
        };
        envelope.serialize(serializer)
    }
}

impl<'de, C: Context> Deserialize<'de> for Event<C> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let envelope = WireEnvelope::<C>::deserialize(deserializer)?;
        let kind = envelope
            .event_type
            .strip_prefix(C::NAME)
            .and_then(EventKind::from_suffix)
            .ok_or_else(|| {
                D::Error::custom(format!("unknown event type: {}", envelope.event_type))
            })?;

        let WireData {
            id,
            aggregate_id,
            executor_id,
            sequence_number,
            occurred_at,
            name,
            item,
        } = envelope.data;

        let body = match kind {
            EventKind::Created => EventBody::Created {
                name: name.ok_or_else(|| D::Error::missing_field("name"))?,
            },
            EventKind::ItemAdded => EventBody::ItemAdded {
                item: item.ok_or_else(|| D::Error::missing_field("item"))?,
            },
            EventKind::ItemRemoved => EventBody::ItemRemoved {
                item: item.ok_or_else(|| D::Error::missing_field("item"))?,
            },
            EventKind::Deleted => EventBody::Deleted,
        };

        Ok(Event {
            id,
            aggregate_id,
            sequence_number,
            occurred_at,
            executor_id,
            body,
        })
    }
}
