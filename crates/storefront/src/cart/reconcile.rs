//! Login-time merge of the guest cart into the server cart.
//!
//! Quantities are summed per product. The merge is pushed to the backend one
//! `add_item` call per guest line, and a failing line is logged and skipped
//! rather than aborting the whole merge. If the server cart cannot be read
//! in the first place nothing is merged and the guest cart is left alone.

use std::collections::BTreeMap;

use tracing::{info, instrument, warn};

use shopfront_core::{Cart, CartItem, ProductId, Quantity};

use super::add_quantities;
use super::local::GuestCartStore;
use super::remote::RemoteCart;
use crate::error::{CartError, add_breadcrumb};

/// Merge guest lines into server lines by summing quantities per product.
///
/// The result holds one line per product present on either side, ordered by
/// product ID.
#[must_use]
pub fn merge_items(local: &[CartItem], server: &[CartItem]) -> Vec<CartItem> {
    let mut merged: BTreeMap<&ProductId, Quantity> = BTreeMap::new();

    for item in server.iter().chain(local) {
        merged
            .entry(&item.product_id)
            .and_modify(|q| *q = add_quantities(&item.product_id, *q, item.quantity))
            .or_insert(item.quantity);
    }

    merged
        .into_iter()
        .map(|(product_id, quantity)| CartItem::new(product_id.clone(), quantity))
        .collect()
}

/// Result of a completed merge.
#[derive(Debug)]
pub struct MergeReport {
    /// Cart to show after the merge.
    pub cart: Cart,
    /// What the server cart should hold if every line merged.
    pub expected: Vec<CartItem>,
    /// Guest lines pushed to the server.
    pub attempted: usize,
    /// Guest lines the backend refused, with the reason.
    pub failed: Vec<(ProductId, CartError)>,
    /// Whether `cart` came from a fresh `GET` after the merge.
    pub refetched: bool,
}

impl MergeReport {
    /// Whether every guest line reached the server cart.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// What [`reconcile`] did.
#[derive(Debug)]
pub enum ReconcileOutcome {
    /// Merge ran (possibly partially); the guest cart has been cleared.
    Merged(MergeReport),
    /// Server cart was unreachable; the guest cart is untouched.
    Skipped { error: CartError },
}

impl ReconcileOutcome {
    /// Cart to show after reconciliation, if one is known.
    #[must_use]
    pub const fn cart(&self) -> Option<&Cart> {
        match self {
            Self::Merged(report) => Some(&report.cart),
            Self::Skipped { .. } => None,
        }
    }
}

/// Merge the guest cart into the server cart.
///
/// 1. Fetch the server cart; on failure return [`ReconcileOutcome::Skipped`].
/// 2. With no guest lines, the fetched cart is the result.
/// 3. Push each guest line with `add_item`, in order, recording failures.
/// 4. Clear the guest cart and re-fetch. If the re-fetch fails, use the
///    cart returned by the last successful `add_item`, else the first fetch.
#[instrument(skip_all)]
pub async fn reconcile<R>(local: &GuestCartStore, remote: &R) -> ReconcileOutcome
where
    R: RemoteCart + ?Sized,
{
    let server = match remote.fetch_current().await {
        Ok(cart) => cart,
        Err(error) => {
            warn!(error = %error, "Server cart unavailable; keeping guest cart");
            return ReconcileOutcome::Skipped { error };
        }
    };

    let guest_items = local.load();
    let expected = merge_items(&guest_items, &server.items);
    if guest_items.is_empty() {
        return ReconcileOutcome::Merged(MergeReport {
            cart: server,
            expected,
            attempted: 0,
            failed: Vec::new(),
            refetched: false,
        });
    }

    add_breadcrumb("cart", "Merging guest cart", None);

    let mut failed = Vec::new();
    let mut last_ok = None;
    for item in &guest_items {
        match remote.add_item(&item.product_id, item.quantity).await {
            Ok(cart) => last_ok = Some(cart),
            Err(error) => {
                warn!(
                    product_id = %item.product_id,
                    quantity = item.quantity.get(),
                    error = %error,
                    "Failed to merge guest cart line"
                );
                failed.push((item.product_id.clone(), error));
            }
        }
    }

    local.clear();

    let (cart, refetched) = match remote.fetch_current().await {
        Ok(cart) => (cart, true),
        Err(error) => {
            warn!(error = %error, "Failed to re-fetch server cart after merge");
            (last_ok.unwrap_or(server), false)
        }
    };

    info!(
        merged = guest_items.len() - failed.len(),
        failed = failed.len(),
        "Guest cart merged"
    );

    ReconcileOutcome::Merged(MergeReport {
        cart,
        expected,
        attempted: guest_items.len(),
        failed,
        refetched,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cart::testing::{FakeRemote, item, pid};
    use crate::storage::MemoryStore;

    fn guest_store(items: &[CartItem]) -> GuestCartStore {
        let store = GuestCartStore::new(Arc::new(MemoryStore::new()));
        store.save(items);
        store
    }

    fn as_map(items: &[CartItem]) -> BTreeMap<String, u32> {
        items
            .iter()
            .map(|i| (i.product_id.to_string(), i.quantity.get()))
            .collect()
    }

    #[test]
    fn test_merge_sums_overlapping_products() {
        let local = vec![item("a", 2), item("b", 1)];
        let server = vec![item("b", 4), item("c", 3)];

        let merged = as_map(&merge_items(&local, &server));
        assert_eq!(merged.len(), 3);
        assert_eq!(merged["a"], 2);
        assert_eq!(merged["b"], 5);
        assert_eq!(merged["c"], 3);
    }

    #[test]
    fn test_merge_preserves_total_quantity() {
        let local = vec![item("x", 7), item("y", 1), item("z", 2)];
        let server = vec![item("y", 3), item("w", 9)];

        let merged = merge_items(&local, &server);
        let total: u64 = merged.iter().map(|i| u64::from(i.quantity)).sum();
        assert_eq!(total, 7 + 1 + 2 + 3 + 9);
    }

    #[test]
    fn test_merge_caps_at_max_quantity() {
        let local = vec![item("a", u32::MAX)];
        let server = vec![item("a", 3), item("b", 1)];

        let merged = as_map(&merge_items(&local, &server));
        assert_eq!(merged["a"], u32::MAX);
        assert_eq!(merged["b"], 1);
    }

    #[test]
    fn test_merge_with_empty_side() {
        let server = vec![item("a", 1)];
        assert_eq!(merge_items(&[], &server), server);
        assert_eq!(merge_items(&server, &[]), server);
        assert!(merge_items(&[], &[]).is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_merges_and_clears_guest_cart() {
        let remote = FakeRemote::with_items(&[("sku-1", 1)]);
        let local = guest_store(&[item("sku-1", 1), item("sku-2", 2)]);

        let ReconcileOutcome::Merged(report) = reconcile(&local, &remote).await else {
            panic!("expected merge");
        };

        assert!(report.is_complete());
        assert!(report.refetched);
        assert_eq!(report.attempted, 2);
        assert!(local.load().is_empty());
        assert_eq!(as_map(&report.cart.items), as_map(&report.expected));
        assert_eq!(remote.quantity("sku-1"), Some(2));
        assert_eq!(remote.quantity("sku-2"), Some(2));
        assert_eq!(remote.add_calls(), 2);
    }

    #[tokio::test]
    async fn test_reconcile_skips_when_server_unreachable() {
        let remote = FakeRemote::with_items(&[("sku-1", 1)]);
        remote.fail_fetch(true);
        let local = guest_store(&[item("sku-1", 1)]);

        let outcome = reconcile(&local, &remote).await;

        assert!(matches!(outcome, ReconcileOutcome::Skipped { .. }));
        assert!(outcome.cart().is_none());
        assert_eq!(local.load(), vec![item("sku-1", 1)]);
        assert_eq!(remote.add_calls(), 0);
    }

    #[tokio::test]
    async fn test_reconcile_empty_guest_cart_is_fetch_only() {
        let remote = FakeRemote::with_items(&[("sku-9", 4)]);
        let local = guest_store(&[]);

        let ReconcileOutcome::Merged(report) = reconcile(&local, &remote).await else {
            panic!("expected merge");
        };
        assert!(!report.refetched);
        assert_eq!(report.cart.items, vec![item("sku-9", 4)]);
        assert_eq!(remote.add_calls(), 0);
    }

    #[tokio::test]
    async fn test_reconcile_tolerates_partial_failure() {
        let remote = FakeRemote::with_items(&[]);
        remote.reject_product("sold-out");
        let local = guest_store(&[item("a", 1), item("sold-out", 2), item("b", 3)]);

        let ReconcileOutcome::Merged(report) = reconcile(&local, &remote).await else {
            panic!("expected merge");
        };

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed.first().unwrap().0, pid("sold-out"));
        assert!(local.load().is_empty());
        assert_eq!(
            as_map(&report.cart.items),
            BTreeMap::from([("a".to_string(), 1), ("b".to_string(), 3)])
        );
    }

    #[tokio::test]
    async fn test_reconcile_falls_back_to_last_add_when_refetch_fails() {
        let remote = FakeRemote::with_items(&[("a", 1)]);
        remote.fail_refetch(true);
        let local = guest_store(&[item("a", 1), item("b", 1)]);

        let ReconcileOutcome::Merged(report) = reconcile(&local, &remote).await else {
            panic!("expected merge");
        };

        assert!(!report.refetched);
        assert_eq!(
            as_map(&report.cart.items),
            BTreeMap::from([("a".to_string(), 2), ("b".to_string(), 1)])
        );
        assert!(local.load().is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_falls_back_to_first_fetch_when_nothing_merged() {
        let remote = FakeRemote::with_items(&[("a", 5)]);
        remote.fail_refetch(true);
        remote.reject_product("b");
        let local = guest_store(&[item("b", 1)]);

        let ReconcileOutcome::Merged(report) = reconcile(&local, &remote).await else {
            panic!("expected merge");
        };

        assert_eq!(report.cart.items, vec![item("a", 5)]);
        assert_eq!(report.failed.len(), 1);
    }
}
