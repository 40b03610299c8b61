//! Domain error types.

use common::EventId;
use thiserror::Error;

/// Input validation failures, raised before any domain object is built.
///
/// These never reach the repository; the boundary closest to user input
/// recovers them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("name cannot be empty")]
    EmptyName,

    #[error("name cannot be longer than {max} characters")]
    NameTooLong { max: usize },

    #[error("item name cannot be empty")]
    EmptyItemName,

    #[error("quantity must be greater than 0")]
    NonPositiveQuantity,

    #[error("price cannot be negative: {cents}")]
    NegativePrice { cents: i64 },
}

/// Failure to add an item to an aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddItemError {
    /// The aggregate has been logically deleted; deletion is terminal.
    #[error("the {aggregate} is deleted")]
    Deleted { aggregate: &'static str },
}

/// Failure to remove an item from an aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoveItemError {
    /// The aggregate has been logically deleted; deletion is terminal.
    #[error("the {aggregate} is deleted")]
    Deleted { aggregate: &'static str },

    /// No item with the given id exists.
    #[error("the item does not exist: {item_id}")]
    NotFound { item_id: String },
}

/// Failure to delete an aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeleteError {
    #[error("the {aggregate} is already deleted")]
    AlreadyDeleted { aggregate: &'static str },
}

/// Umbrella over the per-operation domain errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error(transparent)]
    AddItem(#[from] AddItemError),

    #[error(transparent)]
    RemoveItem(#[from] RemoveItemError),

    #[error(transparent)]
    Delete(#[from] DeleteError),
}

/// Fatal errors raised while replaying history over a snapshot.
///
/// An event that fails to apply during replay means the stored history is
/// corrupt; it must never be absorbed silently.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplayError {
    #[error("event {event_id} at sequence number {sequence_number} does not apply: {source}")]
    InvalidTransition {
        event_id: EventId,
        sequence_number: u64,
        #[source]
        source: DomainError,
    },

    #[error("creation event {event_id} encountered while replaying over a snapshot")]
    UnexpectedCreated { event_id: EventId },
}
