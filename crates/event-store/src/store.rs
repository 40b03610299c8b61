use std::fmt::Display;
use std::hash::Hash;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Storage-side version of an aggregate, used as the optimistic-lock token.
///
/// Versions start at 1 when an aggregate is first persisted and advance by
/// 1 on every successful write. Domain logic never advances a version; only
/// the storage layer does.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    /// Creates a version from a raw value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// The version of an aggregate that has never been persisted.
    pub fn initial() -> Self {
        Self(0)
    }

    /// The version assigned by the first persisted write.
    pub fn first() -> Self {
        Self(1)
    }

    /// The next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Version {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Version> for u64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

/// Storage-facing view of a domain event.
pub trait PersistentEvent: Clone + Send + Sync + 'static {
    /// Identifier type of the aggregate the event belongs to.
    type AggregateId: Clone + Eq + Hash + Display + Send + Sync + 'static;

    /// The aggregate this event belongs to.
    fn aggregate_id(&self) -> &Self::AggregateId;

    /// Position of the event in the aggregate's history.
    fn sequence_number(&self) -> u64;

    /// True only for the event that brings an aggregate into existence.
    /// Creation events are always persisted together with a snapshot.
    fn is_created(&self) -> bool;
}

/// Storage-facing view of an aggregate snapshot.
pub trait PersistentAggregate: Clone + Send + Sync + 'static {
    /// Identifier type of the aggregate.
    type Id: Clone + Eq + Hash + Display + Send + Sync + 'static;

    /// The aggregate's identifier.
    fn id(&self) -> &Self::Id;

    /// Sequence number of the last event reflected in this snapshot.
    fn sequence_number(&self) -> u64;

    /// Last version observed from storage.
    fn version(&self) -> Version;

    /// Returns the snapshot carrying a storage-assigned version. Store
    /// implementations call this when handing a snapshot back to a reader.
    fn with_version(self, version: Version) -> Self;
}

/// The four-primitive contract of the append-only event log.
///
/// Implementations enforce the optimistic-version check themselves: a write
/// whose expected version does not match the stored version fails with
/// [`EventStoreError::OptimisticLock`](crate::EventStoreError::OptimisticLock).
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Snapshot type persisted alongside events.
    type Aggregate: PersistentAggregate;

    /// Event type persisted in the journal.
    type Event: PersistentEvent<AggregateId = <Self::Aggregate as PersistentAggregate>::Id>;

    /// Appends a single event, proving the caller observed
    /// `expected_version`.
    async fn persist_event(&self, event: &Self::Event, expected_version: Version) -> Result<()>;

    /// Appends an event together with a snapshot of the aggregate after the
    /// event, atomically. The snapshot's own version is the optimistic-lock
    /// token; creation events expect no prior record instead.
    async fn persist_event_and_snapshot(
        &self,
        event: &Self::Event,
        snapshot: &Self::Aggregate,
    ) -> Result<()>;

    /// Latest snapshot for the aggregate, carrying the current storage
    /// version. `None` when the aggregate has never been persisted.
    async fn get_latest_snapshot_by_id(
        &self,
        id: &<Self::Aggregate as PersistentAggregate>::Id,
    ) -> Result<Option<Self::Aggregate>>;

    /// Events with sequence number `sequence_number` or greater, oldest
    /// first.
    async fn get_events_by_id_since_sequence_number(
        &self,
        id: &<Self::Aggregate as PersistentAggregate>::Id,
        sequence_number: u64,
    ) -> Result<Vec<Self::Event>>;
}
