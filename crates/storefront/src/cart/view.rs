//! Display model for the cart.

use chrono::{DateTime, Utc};
use serde::Serialize;

use shopfront_core::{Cart, CartItem};

/// Remaining seconds below which a cart counts as expiring soon.
pub const EXPIRING_SOON_SECS: u64 = 300;

/// What a cart screen or badge needs to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    pub items: Vec<CartItem>,
    /// Sum of quantities (0 for no cart).
    pub item_count: u64,
    /// Seconds until the reservation lapses, floored at 0.
    pub expires_in: Option<u64>,
    pub expiring_soon: bool,
    pub is_guest: bool,
}

impl CartView {
    /// View of an absent cart.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            items: Vec::new(),
            item_count: 0,
            expires_in: None,
            expiring_soon: false,
            is_guest: true,
        }
    }

    /// View of `cart` at `now`.
    #[must_use]
    pub fn from_cart(cart: Option<&Cart>, now: DateTime<Utc>) -> Self {
        let Some(cart) = cart else {
            return Self::empty();
        };
        let expires_in = cart.seconds_remaining(now);
        Self {
            items: cart.items.clone(),
            item_count: cart.item_count(),
            expires_in,
            expiring_soon: expires_in.is_some_and(|secs| secs < EXPIRING_SOON_SECS),
            is_guest: cart.is_guest(),
        }
    }

    /// Whether there is nothing to show.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Reservation countdown line, if one should be shown.
    ///
    /// With `show_timer` off the countdown only appears once the cart is
    /// expiring soon.
    #[must_use]
    pub fn countdown_label(&self, show_timer: bool) -> Option<String> {
        let secs = self.expires_in?;
        if !show_timer && !self.expiring_soon {
            return None;
        }

        let remaining = format_time_remaining(secs);
        let mut label = if show_timer {
            format!("Items reserved for: {remaining}")
        } else {
            format!("Cart expires in: {remaining}")
        };
        if self.expiring_soon {
            label.push_str(" - Complete checkout soon!");
        }
        Some(label)
    }
}

impl Default for CartView {
    fn default() -> Self {
        Self::empty()
    }
}

/// Format seconds as `m:ss`, or `Expired` at zero.
#[must_use]
pub fn format_time_remaining(secs: u64) -> String {
    if secs == 0 {
        return "Expired".to_string();
    }
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::cart::testing::item;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn server_cart(expires_in: Option<i64>) -> Cart {
        let json = serde_json::json!({
            "id": "c1",
            "userId": "u1",
            "items": [{"productId": "a", "quantity": 2}, {"productId": "b", "quantity": 3}],
            "updatedAt": now(),
        });
        let mut cart: Cart = serde_json::from_value(json).unwrap();
        cart.expires_at = expires_in.map(|secs| now() + Duration::seconds(secs));
        cart
    }

    #[test]
    fn test_format_time_remaining() {
        assert_eq!(format_time_remaining(0), "Expired");
        assert_eq!(format_time_remaining(5), "0:05");
        assert_eq!(format_time_remaining(299), "4:59");
        assert_eq!(format_time_remaining(3600), "60:00");
    }

    #[test]
    fn test_empty_view() {
        let view = CartView::from_cart(None, now());
        assert_eq!(view, CartView::empty());
        assert_eq!(view.item_count, 0);
        assert!(view.countdown_label(true).is_none());
    }

    #[test]
    fn test_item_count_sums_quantities() {
        let view = CartView::from_cart(Some(&server_cart(None)), now());
        assert_eq!(view.item_count, 5);
        assert!(!view.is_guest);
        assert_eq!(view.expires_in, None);
    }

    #[test]
    fn test_guest_view() {
        let cart = Cart::guest(vec![item("a", 1)], now());
        let view = CartView::from_cart(Some(&cart), now());
        assert!(view.is_guest);
        assert_eq!(view.item_count, 1);
    }

    #[test]
    fn test_countdown_hidden_until_expiring_soon() {
        let view = CartView::from_cart(Some(&server_cart(Some(900))), now());
        assert_eq!(view.expires_in, Some(900));
        assert!(!view.expiring_soon);
        assert_eq!(view.countdown_label(false), None);
        assert_eq!(
            view.countdown_label(true).unwrap(),
            "Items reserved for: 15:00"
        );
    }

    #[test]
    fn test_countdown_when_expiring_soon() {
        let view = CartView::from_cart(Some(&server_cart(Some(120))), now());
        assert!(view.expiring_soon);
        assert_eq!(
            view.countdown_label(false).unwrap(),
            "Cart expires in: 2:00 - Complete checkout soon!"
        );
    }

    #[test]
    fn test_expired_cart_floors_at_zero() {
        let view = CartView::from_cart(Some(&server_cart(Some(-30))), now());
        assert_eq!(view.expires_in, Some(0));
        assert_eq!(
            view.countdown_label(false).unwrap(),
            "Cart expires in: Expired - Complete checkout soon!"
        );
    }
}
