use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    EventStore, EventStoreError, PersistentAggregate, PersistentEvent, Result, Version,
};

/// In-memory event store used by tests and local wiring.
///
/// Keeps an append-only journal and the latest snapshot per aggregate, and
/// enforces the same expected-version check a conditional write in the real
/// storage engine would.
pub struct InMemoryEventStore<A, E>
where
    A: PersistentAggregate,
    E: PersistentEvent<AggregateId = A::Id>,
{
    inner: Arc<RwLock<Inner<A, E>>>,
}

struct Inner<A: PersistentAggregate, E> {
    journal: HashMap<A::Id, Vec<E>>,
    snapshots: HashMap<A::Id, SnapshotRow<A>>,
}

struct SnapshotRow<A> {
    state: A,
    current_version: Version,
}

impl<A, E> InMemoryEventStore<A, E>
where
    A: PersistentAggregate,
    E: PersistentEvent<AggregateId = A::Id>,
{
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of journaled events.
    pub async fn event_count(&self) -> usize {
        self.inner.read().await.journal.values().map(Vec::len).sum()
    }

    /// The raw stored snapshot for an aggregate, without the current-version
    /// fixup [`get_latest_snapshot_by_id`](EventStore::get_latest_snapshot_by_id)
    /// applies. Useful for asserting snapshot cadence in tests.
    pub async fn stored_snapshot(&self, id: &A::Id) -> Option<A> {
        self.inner
            .read()
            .await
            .snapshots
            .get(id)
            .map(|row| row.state.clone())
    }

    /// Current storage version of an aggregate.
    pub async fn current_version(&self, id: &A::Id) -> Option<Version> {
        self.inner
            .read()
            .await
            .snapshots
            .get(id)
            .map(|row| row.current_version)
    }

    /// Clears all events and snapshots.
    pub async fn clear(&self) {
        let mut guard = self.inner.write().await;
        guard.journal.clear();
        guard.snapshots.clear();
    }
}

impl<A, E> Clone for InMemoryEventStore<A, E>
where
    A: PersistentAggregate,
    E: PersistentEvent<AggregateId = A::Id>,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A, E> Default for InMemoryEventStore<A, E>
where
    A: PersistentAggregate,
    E: PersistentEvent<AggregateId = A::Id>,
{
    fn default() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                journal: HashMap::new(),
                snapshots: HashMap::new(),
            })),
        }
    }
}

#[async_trait]
impl<A, E> EventStore for InMemoryEventStore<A, E>
where
    A: PersistentAggregate,
    E: PersistentEvent<AggregateId = A::Id>,
{
    type Aggregate = A;
    type Event = E;

    async fn persist_event(&self, event: &E, expected_version: Version) -> Result<()> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        let id = event.aggregate_id().clone();

        let Some(row) = inner.snapshots.get_mut(&id) else {
            return Err(EventStoreError::OptimisticLock {
                aggregate_id: id.to_string(),
                expected: expected_version,
                actual: Version::initial(),
            });
        };
        if row.current_version != expected_version {
            return Err(EventStoreError::OptimisticLock {
                aggregate_id: id.to_string(),
                expected: expected_version,
                actual: row.current_version,
            });
        }

        row.current_version = expected_version.next();
        inner.journal.entry(id).or_default().push(event.clone());
        Ok(())
    }

    async fn persist_event_and_snapshot(&self, event: &E, snapshot: &A) -> Result<()> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        let id = event.aggregate_id().clone();

        if event.is_created() {
            if let Some(row) = inner.snapshots.get(&id) {
                return Err(EventStoreError::OptimisticLock {
                    aggregate_id: id.to_string(),
                    expected: Version::initial(),
                    actual: row.current_version,
                });
            }
            inner.snapshots.insert(
                id.clone(),
                SnapshotRow {
                    state: snapshot.clone(),
                    current_version: snapshot.version(),
                },
            );
        } else {
            let expected = snapshot.version();
            let Some(row) = inner.snapshots.get_mut(&id) else {
                return Err(EventStoreError::OptimisticLock {
                    aggregate_id: id.to_string(),
                    expected,
                    actual: Version::initial(),
                });
            };
            if row.current_version != expected {
                return Err(EventStoreError::OptimisticLock {
                    aggregate_id: id.to_string(),
                    expected,
                    actual: row.current_version,
                });
            }
            row.current_version = expected.next();
            row.state = snapshot.clone();
        }

        inner.journal.entry(id).or_default().push(event.clone());
        Ok(())
    }

    async fn get_latest_snapshot_by_id(&self, id: &A::Id) -> Result<Option<A>> {
        let guard = self.inner.read().await;
        Ok(guard
            .snapshots
            .get(id)
            .map(|row| row.state.clone().with_version(row.current_version)))
    }

    async fn get_events_by_id_since_sequence_number(
        &self,
        id: &A::Id,
        sequence_number: u64,
    ) -> Result<Vec<E>> {
        let guard = self.inner.read().await;
        let mut events: Vec<E> = guard
            .journal
            .get(id)
            .map(|events| {
                events
                    .iter()
                    .filter(|e| e.sequence_number() >= sequence_number)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        events.sort_by_key(|e| e.sequence_number());
        Ok(events)
    }
}
