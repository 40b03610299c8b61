//! Typed identifiers backed by lexicographically sortable ULIDs.
//!
//! Aggregate, item, and user-account identifiers render as
//! `"<Kind>-<ulid>"` and parse with or without the kind prefix. Event
//! identifiers are bare ULIDs.

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use ulid::Ulid;

use crate::Context;

/// Error returned when a string is not a valid identifier of the expected
/// kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} identifier: {value:?}")]
pub struct ParseIdError {
    /// The identifier kind that was expected.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

fn parse_prefixed(kind: &'static str, input: &str) -> Result<Ulid, ParseIdError> {
    let raw = input
        .strip_prefix(kind)
        .and_then(|rest| rest.strip_prefix('-'))
        .unwrap_or(input);
    Ulid::from_string(raw).map_err(|_| ParseIdError {
        kind,
        value: input.to_string(),
    })
}

/// Identifier of an aggregate instance within a bounded context.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AggregateId<C: Context> {
    value: Ulid,
    _context: PhantomData<C>,
}

impl<C: Context> AggregateId<C> {
    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self::from_ulid(Ulid::new())
    }

    /// Wraps an existing ULID.
    pub fn from_ulid(value: Ulid) -> Self {
        Self {
            value,
            _context: PhantomData,
        }
    }

    /// Parses the rendered form, accepting a bare ULID as well.
    pub fn parse(input: &str) -> Result<Self, ParseIdError> {
        parse_prefixed(C::NAME, input).map(Self::from_ulid)
    }

    /// Returns the underlying ULID.
    pub fn ulid(&self) -> Ulid {
        self.value
    }
}

impl<C: Context> fmt::Display for AggregateId<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", C::NAME, self.value)
    }
}

impl<C: Context> fmt::Debug for AggregateId<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AggregateId({self})")
    }
}

impl<C: Context> Default for AggregateId<C> {
    fn default() -> Self {
        Self::generate()
    }
}

impl<C: Context> FromStr for AggregateId<C> {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<C: Context> Serialize for AggregateId<C> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de, C: Context> Deserialize<'de> for AggregateId<C> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

/// Identifier of an item within a bounded context.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemId<C: Context> {
    value: Ulid,
    _context: PhantomData<C>,
}

impl<C: Context> ItemId<C> {
    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self::from_ulid(Ulid::new())
    }

    /// Wraps an existing ULID.
    pub fn from_ulid(value: Ulid) -> Self {
        Self {
            value,
            _context: PhantomData,
        }
    }

    /// Parses the rendered form, accepting a bare ULID as well.
    pub fn parse(input: &str) -> Result<Self, ParseIdError> {
        parse_prefixed(C::ITEM_NAME, input).map(Self::from_ulid)
    }

    /// Returns the underlying ULID.
    pub fn ulid(&self) -> Ulid {
        self.value
    }
}

impl<C: Context> fmt::Display for ItemId<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", C::ITEM_NAME, self.value)
    }
}

impl<C: Context> fmt::Debug for ItemId<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemId({self})")
    }
}

impl<C: Context> Default for ItemId<C> {
    fn default() -> Self {
        Self::generate()
    }
}

impl<C: Context> FromStr for ItemId<C> {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<C: Context> Serialize for ItemId<C> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de, C: Context> Deserialize<'de> for ItemId<C> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

const USER_ACCOUNT_PREFIX: &str = "UserAccount";

/// Identifier of the user account that executed a command.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserAccountId {
    value: Ulid,
}

impl UserAccountId {
    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self::from_ulid(Ulid::new())
    }

    /// Wraps an existing ULID.
    pub fn from_ulid(value: Ulid) -> Self {
        Self { value }
    }

    /// Parses the rendered form, accepting a bare ULID as well.
    pub fn parse(input: &str) -> Result<Self, ParseIdError> {
        parse_prefixed(USER_ACCOUNT_PREFIX, input).map(Self::from_ulid)
    }

    /// Returns the underlying ULID.
    pub fn ulid(&self) -> Ulid {
        self.value
    }
}

impl fmt::Display for UserAccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{USER_ACCOUNT_PREFIX}-{}", self.value)
    }
}

impl fmt::Debug for UserAccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserAccountId({self})")
    }
}

impl Default for UserAccountId {
    fn default() -> Self {
        Self::generate()
    }
}

impl FromStr for UserAccountId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for UserAccountId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for UserAccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

/// Identifier of a single domain event, rendered as a bare ULID.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId {
    value: Ulid,
}

impl EventId {
    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self::from_ulid(Ulid::new())
    }

    /// Wraps an existing ULID.
    pub fn from_ulid(value: Ulid) -> Self {
        Self { value }
    }

    /// Parses a bare ULID.
    pub fn parse(input: &str) -> Result<Self, ParseIdError> {
        Ulid::from_string(input)
            .map(Self::from_ulid)
            .map_err(|_| ParseIdError {
                kind: "Event",
                value: input.to_string(),
            })
    }

    /// Returns the underlying ULID.
    pub fn ulid(&self) -> Ulid {
        self.value
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl fmt::Debug for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventId({self})")
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::generate()
    }
}

impl FromStr for EventId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for EventId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EventId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}
