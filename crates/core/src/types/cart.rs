//! Cart types shared by the guest store, the remote client and the session.
//!
//! The wire format matches the backend's JSON (`camelCase` keys, owner in
//! `userId`, `"guest"` as the owner sentinel for carts that only exist on
//! the client).

use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{CartId, IdError, ProductId, UserId};
use super::quantity::Quantity;

/// Owner value used for carts that only exist in client storage.
pub const GUEST_OWNER: &str = "guest";

/// A single product line in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Product this line refers to.
    pub product_id: ProductId,
    /// Number of units (always positive).
    pub quantity: Quantity,
}

impl CartItem {
    /// Create a new cart line.
    #[must_use]
    pub const fn new(product_id: ProductId, quantity: Quantity) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// Who a cart belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CartOwner {
    /// Unauthenticated shopper; the cart lives in client storage.
    Guest,
    /// Authenticated user; the cart lives on the backend.
    User(UserId),
}

impl CartOwner {
    /// Whether this is the guest sentinel.
    #[must_use]
    pub const fn is_guest(&self) -> bool {
        matches!(self, Self::Guest)
    }
}

impl fmt::Display for CartOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Guest => f.write_str(GUEST_OWNER),
            Self::User(id) => write!(f, "{id}"),
        }
    }
}

impl TryFrom<String> for CartOwner {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == GUEST_OWNER {
            return Ok(Self::Guest);
        }
        UserId::try_from(value).map(Self::User)
    }
}

impl From<CartOwner> for String {
    fn from(owner: CartOwner) -> Self {
        match owner {
            CartOwner::Guest => GUEST_OWNER.to_owned(),
            CartOwner::User(id) => id.into_inner(),
        }
    }
}

/// A shopping cart, either a guest cart or a server cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    /// Server-assigned cart ID (`None` for guest carts).
    #[serde(default)]
    pub id: Option<CartId>,
    /// Cart owner.
    #[serde(rename = "userId")]
    pub owner: CartOwner,
    /// Cart lines, at most one per product.
    #[serde(default)]
    pub items: Vec<CartItem>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
    /// Expiration time, if the backend reserves stock for a limited period.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Cart {
    /// Build a guest cart view over locally stored items.
    #[must_use]
    pub fn guest(items: Vec<CartItem>, updated_at: DateTime<Utc>) -> Self {
        Self {
            id: None,
            owner: CartOwner::Guest,
            items,
            updated_at,
            expires_at: None,
        }
    }

    /// Whether this cart lives only on the client.
    #[must_use]
    pub const fn is_guest(&self) -> bool {
        self.owner.is_guest()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of quantities across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        total_quantity(&self.items)
    }

    /// Quantity held for a product, if it is in the cart.
    #[must_use]
    pub fn quantity_of(&self, product_id: &ProductId) -> Option<Quantity> {
        self.items
            .iter()
            .find(|item| &item.product_id == product_id)
            .map(|item| item.quantity)
    }

    /// Whole seconds until the cart expires, floored at zero.
    ///
    /// Returns `None` when the cart has no expiration.
    #[must_use]
    pub fn seconds_remaining(&self, now: DateTime<Utc>) -> Option<u64> {
        let expires_at = self.expires_at?;
        let remaining = expires_at.signed_duration_since(now).num_seconds();
        Some(u64::try_from(remaining).unwrap_or(0))
    }
}

/// Sum of quantities across a list of cart lines.
#[must_use]
pub fn total_quantity(items: &[CartItem]) -> u64 {
    items.iter().map(|item| u64::from(item.quantity)).sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn item(id: &str, quantity: u32) -> CartItem {
        CartItem::new(ProductId::parse(id).unwrap(), Quantity::new(quantity).unwrap())
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_item_count_sums_quantities() {
        let cart = Cart::guest(vec![item("sku-1", 2), item("sku-2", 3)], now());
        assert_eq!(cart.item_count(), 5);
    }

    #[test]
    fn test_item_count_empty() {
        let cart = Cart::guest(Vec::new(), now());
        assert_eq!(cart.item_count(), 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_quantity_of() {
        let cart = Cart::guest(vec![item("sku-1", 2)], now());
        let sku1 = ProductId::parse("sku-1").unwrap();
        let sku9 = ProductId::parse("sku-9").unwrap();
        assert_eq!(cart.quantity_of(&sku1).map(Quantity::get), Some(2));
        assert_eq!(cart.quantity_of(&sku9), None);
    }

    #[test]
    fn test_seconds_remaining() {
        let mut cart = Cart::guest(Vec::new(), now());
        assert_eq!(cart.seconds_remaining(now()), None);

        cart.expires_at = Some(now() + Duration::seconds(90));
        assert_eq!(cart.seconds_remaining(now()), Some(90));

        cart.expires_at = Some(now() - Duration::seconds(5));
        assert_eq!(cart.seconds_remaining(now()), Some(0));
    }

    #[test]
    fn test_deserialize_server_cart() {
        let json = r#"{
            "id": "cart-7",
            "userId": "user-1",
            "items": [{"productId": "sku-1", "quantity": 2}],
            "updatedAt": "2026-01-15T12:00:00Z",
            "expiresAt": "2026-01-15T12:30:00.000Z"
        }"#;
        let cart: Cart = serde_json::from_str(json).unwrap();
        assert_eq!(cart.id.as_ref().map(CartId::as_str), Some("cart-7"));
        assert_eq!(cart.owner, CartOwner::User(UserId::parse("user-1").unwrap()));
        assert_eq!(cart.item_count(), 2);
        assert!(cart.expires_at.is_some());
    }

    #[test]
    fn test_deserialize_guest_owner_and_null_id() {
        let json = r#"{"id": null, "userId": "guest", "items": [], "updatedAt": "2026-01-15T12:00:00Z"}"#;
        let cart: Cart = serde_json::from_str(json).unwrap();
        assert!(cart.is_guest());
        assert!(cart.id.is_none());
    }

    #[test]
    fn test_serialize_uses_wire_names() {
        let cart = Cart::guest(vec![item("sku-1", 1)], now());
        let value = serde_json::to_value(&cart).unwrap();
        assert_eq!(value["userId"], "guest");
        assert_eq!(value["items"][0]["productId"], "sku-1");
        assert!(value.get("expiresAt").is_none());
    }
}
