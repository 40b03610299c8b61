//! Value objects shared by the cart and order contexts.

use std::collections::HashMap;
use std::ops::Add;

use common::{Context, ItemId};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

/// Display name of an aggregate.
///
/// Non-empty and at most [`Name::MAX_LENGTH`] characters, enforced at
/// construction so a `Name` in hand is always well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Name(String);

impl Name {
    /// Maximum length in characters.
    pub const MAX_LENGTH: usize = 200;

    /// Validates and wraps a name.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if value.chars().count() > Self::MAX_LENGTH {
            return Err(ValidationError::NameTooLong {
                max: Self::MAX_LENGTH,
            });
        }
        Ok(Self(value))
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Name {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Name> for String {
    fn from(name: Name) -> Self {
        name.0
    }
}

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Money amount in integral minor units (cents), avoiding floating point.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates an amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Zero.
    pub fn zero() -> Self {
        Self(0)
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.0
    }

    /// True when the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Scales the amount by a quantity.
    pub fn multiply(&self, quantity: u32) -> Money {
        Self(self.0 * i64::from(quantity))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

/// A line item.
///
/// Invariants (`quantity > 0`, `price >= 0`, non-empty name) are enforced at
/// construction and re-enforced when deserializing, so malformed wire data
/// is rejected before it becomes a domain object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawItem<C>", bound = "")]
pub struct Item<C: Context> {
    id: ItemId<C>,
    name: String,
    quantity: u32,
    price: Money,
}

#[derive(Deserialize)]
#[serde(bound = "")]
struct RawItem<C: Context> {
    id: ItemId<C>,
    name: String,
    quantity: u32,
    price: Money,
}

impl<C: Context> TryFrom<RawItem<C>> for Item<C> {
    type Error = ValidationError;

    fn try_from(raw: RawItem<C>) -> Result<Self, Self::Error> {
        Self::new(raw.id, raw.name, raw.quantity, raw.price)
    }
}

impl<C: Context> Item<C> {
    /// Validates and builds an item.
    pub fn new(
        id: ItemId<C>,
        name: impl Into<String>,
        quantity: u32,
        price: Money,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if quantity == 0 {
            return Err(ValidationError::NonPositiveQuantity);
        }
        if price.is_negative() {
            return Err(ValidationError::NegativePrice {
                cents: price.cents(),
            });
        }
        if name.is_empty() {
            return Err(ValidationError::EmptyItemName);
        }
        Ok(Self {
            id,
            name,
            quantity,
            price,
        })
    }

    pub fn id(&self) -> &ItemId<C> {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn price(&self) -> Money {
        self.price
    }

    /// `quantity × price`.
    pub fn total_price(&self) -> Money {
        self.price.multiply(self.quantity)
    }
}

/// Item collection keyed by item id; insertion order is irrelevant.
///
/// Operations are persistent: each returns a new collection and leaves the
/// receiver untouched, matching the aggregate's event-producing style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Items<C: Context> {
    values: HashMap<ItemId<C>, Item<C>>,
}

impl<C: Context> Default for Items<C> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<C: Context> Items<C> {
    /// The empty collection.
    pub fn empty() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Builds a collection from items; later duplicates by id win.
    pub fn from_vec(items: Vec<Item<C>>) -> Self {
        Self {
            values: items.into_iter().map(|item| (*item.id(), item)).collect(),
        }
    }

    /// Adds an item; an item with the same id is replaced.
    pub fn add(&self, item: Item<C>) -> Self {
        let mut values = self.values.clone();
        values.insert(*item.id(), item);
        Self { values }
    }

    /// Removes an item by id, returning the new collection and the removed
    /// item, or `None` when absent.
    pub fn remove_by_id(&self, item_id: &ItemId<C>) -> Option<(Self, Item<C>)> {
        let mut values = self.values.clone();
        let removed = values.remove(item_id)?;
        Some((Self { values }, removed))
    }

    /// True when an item with the given id is present.
    pub fn contains_by_id(&self, item_id: &ItemId<C>) -> bool {
        self.values.contains_key(item_id)
    }

    /// Looks up an item by id.
    pub fn find_by_id(&self, item_id: &ItemId<C>) -> Option<&Item<C>> {
        self.values.get(item_id)
    }

    /// Sum of the member totals.
    pub fn total_price(&self) -> Money {
        self.values
            .values()
            .fold(Money::zero(), |acc, item| acc + item.total_price())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over the items in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &Item<C>> {
        self.values.values()
    }
}

impl<C: Context> Serialize for Items<C> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.values.values())
    }
}

impl<'de, C: Context> Deserialize<'de> for Items<C> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Vec::<Item<C>>::deserialize(deserializer)?;
        Ok(Self::from_vec(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::CartContext;

    type CartItem = Item<CartContext>;
    type CartItems = Items<CartContext>;
    type CartItemId = ItemId<CartContext>;

    fn item(name: &str, quantity: u32, price: i64) -> CartItem {
        CartItem::new(
            CartItemId::generate(),
            name,
            quantity,
            Money::from_cents(price),
        )
        .unwrap()
    }

    #[test]
    fn name_rejects_empty_and_too_long() {
        assert_eq!(Name::new(""), Err(ValidationError::EmptyName));
        assert_eq!(
            Name::new("x".repeat(201)),
            Err(ValidationError::NameTooLong { max: 200 })
        );
        assert!(Name::new("x".repeat(200)).is_ok());
    }

    #[test]
    fn item_rejects_invalid_fields() {
        let id = CartItemId::generate();
        assert_eq!(
            CartItem::new(id, "apple", 0, Money::from_cents(100)),
            Err(ValidationError::NonPositiveQuantity)
        );
        assert_eq!(
            CartItem::new(id, "apple", 1, Money::from_cents(-1)),
            Err(ValidationError::NegativePrice { cents: -1 })
        );
        assert_eq!(
            CartItem::new(id, "", 1, Money::from_cents(100)),
            Err(ValidationError::EmptyItemName)
        );
        // Zero price is allowed.
        assert!(CartItem::new(id, "freebie", 1, Money::zero()).is_ok());
    }

    #[test]
    fn item_total_price() {
        let item = item("apple", 2, 150);
        assert_eq!(item.total_price(), Money::from_cents(300));
    }

    #[test]
    fn item_deserialization_revalidates() {
        let id = CartItemId::generate();
        let json = format!(r#"{{"id":"{id}","name":"apple","quantity":0,"price":100}}"#);
        let result: Result<CartItem, _> = serde_json::from_str(&json);
        assert!(result.is_err());
    }

    #[test]
    fn add_overwrites_by_id() {
        let first = item("apple", 1, 100);
        let replacement =
            CartItem::new(*first.id(), "apple", 5, Money::from_cents(100)).unwrap();

        let items = CartItems::empty().add(first).add(replacement.clone());

        assert_eq!(items.len(), 1);
        assert_eq!(items.find_by_id(replacement.id()), Some(&replacement));
    }

    #[test]
    fn remove_by_id_returns_removed_item() {
        let apple = item("apple", 2, 150);
        let banana = item("banana", 1, 80);
        let items = CartItems::empty().add(apple.clone()).add(banana);

        let (remaining, removed) = items.remove_by_id(apple.id()).unwrap();
        assert_eq!(removed, apple);
        assert_eq!(remaining.len(), 1);
        assert!(!remaining.contains_by_id(apple.id()));
        // The original collection is untouched.
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn remove_absent_id_is_none() {
        let items = CartItems::empty().add(item("apple", 1, 100));
        assert!(items.remove_by_id(&CartItemId::generate()).is_none());
    }

    #[test]
    fn total_price_sums_members() {
        let items = CartItems::empty()
            .add(item("apple", 2, 150))
            .add(item("banana", 3, 80));
        assert_eq!(items.total_price(), Money::from_cents(540));
    }

    #[test]
    fn structural_equality_ignores_insertion_order() {
        let apple = item("apple", 1, 100);
        let banana = item("banana", 1, 80);

        let forward = CartItems::empty().add(apple.clone()).add(banana.clone());
        let backward = CartItems::empty().add(banana).add(apple);

        assert_eq!(forward, backward);
    }

    #[test]
    fn items_serde_roundtrip() {
        let items = CartItems::empty()
            .add(item("apple", 2, 150))
            .add(item("banana", 1, 80));

        let json = serde_json::to_string(&items).unwrap();
        let decoded: CartItems = serde_json::from_str(&json).unwrap();
        assert_eq!(items, decoded);
    }
}
