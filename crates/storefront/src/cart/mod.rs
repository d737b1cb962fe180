//! Shopping cart for guest and signed-in shoppers.
//!
//! # Modules
//!
//! - `local` - Guest cart in durable client storage
//! - `remote` - Server cart of the signed-in shopper
//! - `reconcile` - Merge of the guest cart into the server cart at login
//! - `session` - [`CartSession`], the single entry point for cart actions
//! - `view` - Display model (item count, reservation countdown)

pub mod local;
pub mod reconcile;
pub mod remote;
pub mod session;
pub mod view;

pub use local::{GUEST_CART_KEY, GuestCartStore};
pub use reconcile::{MergeReport, ReconcileOutcome, merge_items, reconcile};
pub use remote::{RemoteCart, RemoteCartClient};
pub use session::{CartSession, SessionState};
pub use view::{CartView, EXPIRING_SOON_SECS, format_time_remaining};

use shopfront_core::{ProductId, Quantity};
use tracing::warn;

/// Sum two quantities of the same product, capping at [`Quantity::MAX`].
pub(crate) fn add_quantities(product_id: &ProductId, held: Quantity, added: Quantity) -> Quantity {
    held.checked_add(added).unwrap_or_else(|| {
        warn!(
            product_id = %product_id,
            held = %held,
            added = %added,
            "Cart line quantity overflows, capping at maximum"
        );
        Quantity::MAX
    })
}

/// In-memory server cart for unit tests.
#[cfg(test)]
pub(crate) mod testing {
    use std::collections::{BTreeMap, HashSet};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Mutex, PoisonError};

    use async_trait::async_trait;
    use chrono::Utc;
    use reqwest::StatusCode;

    use shopfront_core::{Cart, CartId, CartItem, CartOwner, ProductId, Quantity, UserId};

    use super::RemoteCart;
    use crate::error::{CartError, Result};
    use crate::storage::{KeyValueStore, MemoryStore, StorageError};

    pub fn pid(id: &str) -> ProductId {
        ProductId::parse(id).unwrap_or_else(|e| panic!("bad product id {id}: {e}"))
    }

    pub fn item(id: &str, quantity: u32) -> CartItem {
        let quantity = Quantity::new(quantity).unwrap_or_else(|e| panic!("bad quantity: {e}"));
        CartItem::new(pid(id), quantity)
    }

    #[derive(Default)]
    struct State {
        items: BTreeMap<ProductId, Quantity>,
        fail_fetch: bool,
        fail_refetch: bool,
        rejected: HashSet<ProductId>,
        fetch_calls: usize,
        add_calls: usize,
        remove_calls: usize,
    }

    /// Server cart kept in a map. Failures can be switched on per call kind.
    #[derive(Default)]
    pub struct FakeRemote {
        state: Mutex<State>,
    }

    impl FakeRemote {
        pub fn with_items(items: &[(&str, u32)]) -> Self {
            let remote = Self::default();
            {
                let mut state = remote.lock();
                for (id, quantity) in items {
                    let line = item(id, *quantity);
                    state.items.insert(line.product_id, line.quantity);
                }
            }
            remote
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, State> {
            self.state.lock().unwrap_or_else(PoisonError::into_inner)
        }

        /// Every fetch fails.
        pub fn fail_fetch(&self, fail: bool) {
            self.lock().fail_fetch = fail;
        }

        /// Every fetch after the first fails.
        pub fn fail_refetch(&self, fail: bool) {
            self.lock().fail_refetch = fail;
        }

        /// `add_item` for this product fails.
        pub fn reject_product(&self, id: &str) {
            self.lock().rejected.insert(pid(id));
        }

        pub fn quantity(&self, id: &str) -> Option<u32> {
            self.lock().items.get(&pid(id)).map(|q| q.get())
        }

        pub fn fetch_calls(&self) -> usize {
            self.lock().fetch_calls
        }

        pub fn add_calls(&self) -> usize {
            self.lock().add_calls
        }

        pub fn remove_calls(&self) -> usize {
            self.lock().remove_calls
        }

        fn snapshot(state: &State) -> Cart {
            Cart {
                id: CartId::parse("cart-1").ok(),
                owner: CartOwner::User(
                    UserId::parse("user-1").unwrap_or_else(|e| panic!("bad user id: {e}")),
                ),
                items: state
                    .items
                    .iter()
                    .map(|(id, q)| CartItem::new(id.clone(), *q))
                    .collect(),
                updated_at: Utc::now(),
                expires_at: None,
            }
        }
    }

    fn unavailable() -> CartError {
        CartError::server(StatusCode::SERVICE_UNAVAILABLE, "cart service unavailable")
    }

    #[async_trait]
    impl RemoteCart for FakeRemote {
        async fn fetch_current(&self) -> Result<Cart> {
            let mut state = self.lock();
            state.fetch_calls += 1;
            if state.fail_fetch || (state.fail_refetch && state.fetch_calls > 1) {
                return Err(unavailable());
            }
            Ok(Self::snapshot(&state))
        }

        async fn add_item(&self, product_id: &ProductId, quantity: Quantity) -> Result<Cart> {
            let mut state = self.lock();
            state.add_calls += 1;
            if state.rejected.contains(product_id) {
                return Err(CartError::server(
                    StatusCode::BAD_REQUEST,
                    "Product out of stock",
                ));
            }
            state
                .items
                .entry(product_id.clone())
                .and_modify(|q| *q = super::add_quantities(product_id, *q, quantity))
                .or_insert(quantity);
            Ok(Self::snapshot(&state))
        }

        async fn remove_item(&self, product_id: &ProductId) -> Result<Cart> {
            let mut state = self.lock();
            state.remove_calls += 1;
            state.items.remove(product_id);
            Ok(Self::snapshot(&state))
        }
    }

    /// Storage whose reads, writes and removals can be made to fail.
    #[derive(Default)]
    pub struct FailingStore {
        inner: MemoryStore,
        fail_get: AtomicBool,
        fail_set: AtomicBool,
        fail_remove: AtomicBool,
    }

    impl FailingStore {
        pub fn fail_get(&self, fail: bool) {
            self.fail_get.store(fail, Ordering::SeqCst);
        }

        pub fn fail_set(&self, fail: bool) {
            self.fail_set.store(fail, Ordering::SeqCst);
        }

        pub fn fail_remove(&self, fail: bool) {
            self.fail_remove.store(fail, Ordering::SeqCst);
        }

        fn check(flag: &AtomicBool) -> std::result::Result<(), StorageError> {
            if flag.load(Ordering::SeqCst) {
                return Err(StorageError::Unavailable("quota exceeded".to_string()));
            }
            Ok(())
        }
    }

    impl KeyValueStore for FailingStore {
        fn get(&self, key: &str) -> std::result::Result<Option<String>, StorageError> {
            Self::check(&self.fail_get)?;
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> std::result::Result<(), StorageError> {
            Self::check(&self.fail_set)?;
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> std::result::Result<(), StorageError> {
            Self::check(&self.fail_remove)?;
            self.inner.remove(key)
        }
    }
}
