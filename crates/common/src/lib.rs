//! Shared types for the event-sourced write side.
//!
//! This crate provides the bounded-context markers and the typed,
//! ULID-backed identifiers used by every other crate in the workspace.

mod context;
mod identifier;

pub use context::{CartContext, Context, OrderContext};
pub use identifier::{AggregateId, EventId, ItemId, ParseIdError, UserAccountId};
