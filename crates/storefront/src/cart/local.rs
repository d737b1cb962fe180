//! Guest cart persisted in client storage.
//!
//! The document is a JSON array of `{productId, quantity}` entries. Anything
//! unreadable is treated as an empty cart and malformed entries are dropped
//! on load, so a corrupted file can never block the shopper.

use std::sync::Arc;

use tracing::warn;

use shopfront_core::{CartItem, ProductId, Quantity};

use crate::storage::KeyValueStore;

/// Storage key holding the guest cart.
pub const GUEST_CART_KEY: &str = "shopfront.guest_cart";

/// Durable store for the signed-out shopper's cart.
#[derive(Clone)]
pub struct GuestCartStore {
    store: Arc<dyn KeyValueStore>,
}

impl GuestCartStore {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Read the stored items.
    ///
    /// Missing, unreadable or non-array documents yield an empty list. Entries
    /// that do not parse as a cart item are skipped; repeated products are
    /// folded into one line.
    #[must_use]
    pub fn load(&self) -> Vec<CartItem> {
        let raw = match self.store.get(GUEST_CART_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read guest cart");
                return Vec::new();
            }
        };

        let Ok(entries) = serde_json::from_str::<Vec<serde_json::Value>>(&raw) else {
            warn!("Guest cart is not a JSON array; treating as empty");
            return Vec::new();
        };

        let mut items: Vec<CartItem> = Vec::with_capacity(entries.len());
        for entry in entries {
            let Ok(item) = serde_json::from_value::<CartItem>(entry) else {
                continue;
            };
            merge_line(&mut items, item.product_id, item.quantity);
        }
        items
    }

    /// Replace the stored items. Failures are logged, not returned.
    pub fn save(&self, items: &[CartItem]) {
        let json = match serde_json::to_string(items) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to serialize guest cart");
                return;
            }
        };
        if let Err(e) = self.store.set(GUEST_CART_KEY, &json) {
            warn!(error = %e, "Failed to save guest cart");
        }
    }

    /// Remove the stored cart.
    pub fn clear(&self) {
        if let Err(e) = self.store.remove(GUEST_CART_KEY) {
            warn!(error = %e, "Failed to clear guest cart");
        }
    }

    /// Add `quantity` of `product_id`, summing into an existing line.
    ///
    /// Returns the updated items.
    pub fn add(&self, product_id: ProductId, quantity: Quantity) -> Vec<CartItem> {
        let mut items = self.load();
        merge_line(&mut items, product_id, quantity);
        self.save(&items);
        items
    }

    /// Drop the line for `product_id`.
    ///
    /// Storage is not rewritten when the product is absent. Returns the
    /// resulting items.
    pub fn remove(&self, product_id: &ProductId) -> Vec<CartItem> {
        let mut items = self.load();
        let before = items.len();
        items.retain(|item| &item.product_id != product_id);
        if items.len() != before {
            self.save(&items);
        }
        items
    }
}

impl std::fmt::Debug for GuestCartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuestCartStore").finish_non_exhaustive()
    }
}

fn merge_line(items: &mut Vec<CartItem>, product_id: ProductId, quantity: Quantity) {
    if let Some(line) = items.iter_mut().find(|item| item.product_id == product_id) {
        line.quantity = super::add_quantities(&line.product_id, line.quantity, quantity);
    } else {
        items.push(CartItem::new(product_id, quantity));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::testing::FailingStore;
    use crate::storage::{FileStore, MemoryStore};

    fn pid(id: &str) -> ProductId {
        ProductId::parse(id).unwrap()
    }

    fn qty(n: u32) -> Quantity {
        Quantity::new(n).unwrap()
    }

    fn store_with(raw: &str) -> GuestCartStore {
        let backing = Arc::new(MemoryStore::new());
        backing.set(GUEST_CART_KEY, raw).unwrap();
        GuestCartStore::new(backing)
    }

    #[test]
    fn test_load_missing_is_empty() {
        let store = GuestCartStore::new(Arc::new(MemoryStore::new()));
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_load_garbage_is_empty() {
        assert!(store_with("{not json").load().is_empty());
        assert!(store_with(r#"{"productId": "p1", "quantity": 1}"#).load().is_empty());
    }

    #[test]
    fn test_load_drops_malformed_entries() {
        let store = store_with(
            r#"[
                {"productId": "p1", "quantity": 2},
                {"productId": "", "quantity": 1},
                {"productId": "p2", "quantity": 0},
                {"productId": "p3", "quantity": -4},
                {"productId": "p4", "quantity": 1.5},
                {"productId": "p5"},
                "p6",
                {"productId": "p7", "quantity": 1}
            ]"#,
        );
        assert_eq!(
            store.load(),
            vec![
                CartItem::new(pid("p1"), qty(2)),
                CartItem::new(pid("p7"), qty(1)),
            ]
        );
    }

    #[test]
    fn test_load_folds_duplicates() {
        let store = store_with(
            r#"[{"productId": "p1", "quantity": 2}, {"productId": "p1", "quantity": 3}]"#,
        );
        assert_eq!(store.load(), vec![CartItem::new(pid("p1"), qty(5))]);
    }

    #[test]
    fn test_add_sums_existing_line() {
        let store = GuestCartStore::new(Arc::new(MemoryStore::new()));
        store.add(pid("sku-1"), qty(2));
        store.add(pid("sku-2"), qty(1));
        let items = store.add(pid("sku-1"), qty(1));

        assert_eq!(
            items,
            vec![
                CartItem::new(pid("sku-1"), qty(3)),
                CartItem::new(pid("sku-2"), qty(1)),
            ]
        );
        assert_eq!(store.load(), items);
    }

    #[test]
    fn test_remove_absent_does_not_write() {
        let backing = Arc::new(MemoryStore::new());
        let store = GuestCartStore::new(backing.clone());

        assert!(store.remove(&pid("ghost")).is_empty());
        assert_eq!(backing.get(GUEST_CART_KEY).unwrap(), None);
    }

    #[test]
    fn test_remove_drops_line() {
        let store = GuestCartStore::new(Arc::new(MemoryStore::new()));
        store.add(pid("a"), qty(1));
        store.add(pid("b"), qty(1));
        assert_eq!(store.remove(&pid("a")), vec![CartItem::new(pid("b"), qty(1))]);
    }

    #[test]
    fn test_clear() {
        let store = GuestCartStore::new(Arc::new(MemoryStore::new()));
        store.add(pid("a"), qty(1));
        store.clear();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        GuestCartStore::new(Arc::new(FileStore::new(dir.path()))).add(pid("sku-1"), qty(2));

        let reopened = GuestCartStore::new(Arc::new(FileStore::new(dir.path())));
        assert_eq!(reopened.load(), vec![CartItem::new(pid("sku-1"), qty(2))]);
    }

    #[test]
    fn test_add_caps_at_max_quantity() {
        let store = GuestCartStore::new(Arc::new(MemoryStore::new()));
        store.add(pid("sku-1"), Quantity::MAX);
        let items = store.add(pid("sku-1"), qty(5));

        assert_eq!(items, vec![CartItem::new(pid("sku-1"), Quantity::MAX)]);
    }

    #[test]
    fn test_unreadable_storage_loads_empty() {
        let backing = Arc::new(FailingStore::default());
        let store = GuestCartStore::new(backing.clone());
        store.add(pid("sku-1"), qty(2));

        backing.fail_get(true);
        assert!(store.load().is_empty());

        backing.fail_get(false);
        assert_eq!(store.load(), vec![CartItem::new(pid("sku-1"), qty(2))]);
    }

    #[test]
    fn test_failed_write_still_returns_items() {
        let backing = Arc::new(FailingStore::default());
        backing.fail_set(true);
        let store = GuestCartStore::new(backing);

        let items = store.add(pid("sku-1"), qty(3));

        assert_eq!(items, vec![CartItem::new(pid("sku-1"), qty(3))]);
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_failed_clear_is_swallowed() {
        let backing = Arc::new(FailingStore::default());
        let store = GuestCartStore::new(backing.clone());
        store.add(pid("sku-1"), qty(1));

        backing.fail_remove(true);
        store.clear();

        assert_eq!(store.load().len(), 1);
    }
}
