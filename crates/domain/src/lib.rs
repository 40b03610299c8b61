//! Domain layer for the event-sourced write side.
//!
//! This crate provides:
//! - Value objects ([`Name`], [`Money`], [`Item`], [`Items`])
//! - The domain event catalog ([`Event`], [`EventBody`], [`EventKind`])
//! - The generic aggregate state machine ([`Aggregate`])
//! - The optimistic-concurrency repository ([`Repository`],
//!   [`EventSourcedRepository`]) with configurable snapshot retention
//! - The command processor ([`CommandProcessor`]) and its error taxonomy
//!
//! The cart and order bounded contexts share one generic implementation;
//! the `Cart*`/`Order*` aliases instantiate it per context marker.

pub mod aggregate;
pub mod error;
pub mod event;
pub mod processor;
pub mod repository;
pub mod value_objects;

pub use aggregate::Aggregate;
pub use error::{
    AddItemError, DeleteError, DomainError, RemoveItemError, ReplayError, ValidationError,
};
pub use event::{Event, EventBody, EventKind};
pub use processor::{CommandProcessor, ProcessCause, ProcessError};
pub use repository::{
    EventSourcedRepository, Repository, RepositoryError, SnapshotDecider, retention_criteria_of,
};
pub use value_objects::{Item, Items, Money, Name};

use common::{CartContext, OrderContext};

/// Cart-context instantiations.
pub type Cart = Aggregate<CartContext>;
pub type CartEvent = Event<CartContext>;
pub type CartCommandProcessor<R> = CommandProcessor<CartContext, R>;

/// Order-context instantiations.
pub type Order = Aggregate<OrderContext>;
pub type OrderEvent = Event<OrderContext>;
pub type OrderCommandProcessor<R> = CommandProcessor<OrderContext, R>;
