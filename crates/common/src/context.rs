//! Bounded-context markers.

use std::fmt::Debug;
use std::hash::Hash;

/// Marker trait identifying a bounded context.
///
/// The write side hosts two structurally identical contexts (carts and
/// orders). Everything generic over `C: Context` is instantiated once per
/// marker instead of being duplicated per context.
pub trait Context: Copy + Clone + Debug + PartialEq + Eq + Hash + Send + Sync + 'static {
    /// Prefix used when rendering aggregate identifiers, e.g. `"Cart"`.
    const NAME: &'static str;

    /// Prefix used when rendering item identifiers, e.g. `"CartItem"`.
    const ITEM_NAME: &'static str;
}

/// Marker for the cart bounded context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CartContext;

impl Context for CartContext {
    const NAME: &'static str = "Cart";
    const ITEM_NAME: &'static str = "CartItem";
}

/// Marker for the order bounded context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrderContext;

impl Context for OrderContext {
    const NAME: &'static str = "Order";
    const ITEM_NAME: &'static str = "OrderItem";
}
