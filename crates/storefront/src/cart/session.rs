//! The cart session: one cart view regardless of sign-in state.
//!
//! A [`CartSession`] routes cart actions to the guest store while signed out
//! and to the server cart while signed in. The sign-in transition runs the
//! guest-cart merge exactly once; while it runs the session is
//! [`SessionState::Authenticating`] and refuses mutations.
//!
//! All mutations take `&mut self`, so actions on one session are applied
//! strictly one after another.

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use shopfront_core::{Cart, CartItem, ProductId, Quantity};

use super::local::GuestCartStore;
use super::reconcile::{ReconcileOutcome, reconcile};
use super::remote::RemoteCart;
use super::view::CartView;
use crate::error::{CartError, Result, add_breadcrumb};

/// Sign-in state of a cart session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Signed out; the cart lives in client storage.
    Guest { cart: Option<Cart> },
    /// Guest cart merge in progress.
    Authenticating,
    /// Signed in; the cart lives on the server.
    Authenticated {
        /// Last server cart, or `None` if the last fetch failed.
        cart: Option<Cart>,
        /// The login merge was skipped and guest lines are still waiting.
        pending_merge: bool,
    },
}

/// Cart entry point for one shopper.
#[derive(Debug)]
pub struct CartSession<R> {
    local: GuestCartStore,
    remote: R,
    state: SessionState,
}

impl<R: RemoteCart> CartSession<R> {
    /// Start a signed-out session over the stored guest cart.
    #[must_use]
    pub fn new(local: GuestCartStore, remote: R) -> Self {
        let cart = guest_cart(local.load());
        Self {
            local,
            remote,
            state: SessionState::Guest { cart },
        }
    }

    /// Resume a session from storage.
    ///
    /// When `authenticated` (a token is stored) this is the sign-in
    /// transition, so any leftover guest lines are merged.
    pub async fn restore(local: GuestCartStore, remote: R, authenticated: bool) -> Self {
        let mut session = Self::new(local, remote);
        if authenticated {
            session.authenticate().await;
        }
        session
    }

    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Authenticated { .. })
    }

    /// The current cart, if any.
    #[must_use]
    pub const fn cart(&self) -> Option<&Cart> {
        match &self.state {
            SessionState::Guest { cart } | SessionState::Authenticated { cart, .. } => {
                cart.as_ref()
            }
            SessionState::Authenticating => None,
        }
    }

    /// Sum of quantities in the current cart.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.cart().map_or(0, Cart::item_count)
    }

    /// Display model of the current cart at `now`.
    #[must_use]
    pub fn view(&self, now: DateTime<Utc>) -> CartView {
        CartView::from_cart(self.cart(), now)
    }

    #[must_use]
    pub const fn remote(&self) -> &R {
        &self.remote
    }

    #[must_use]
    pub const fn local(&self) -> &GuestCartStore {
        &self.local
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Enter the signed-in state, merging the guest cart into the server cart.
    ///
    /// Returns `None` without doing anything if the session is already signed
    /// in or mid-merge. When the server cart cannot be read, the session is
    /// still signed in, the guest cart is kept, and the merge is retried by
    /// the next [`refresh`](Self::refresh).
    #[instrument(skip(self))]
    pub async fn authenticate(&mut self) -> Option<ReconcileOutcome> {
        if !matches!(self.state, SessionState::Guest { .. }) {
            debug!("Session already authenticated");
            return None;
        }

        self.state = SessionState::Authenticating;
        let outcome = reconcile(&self.local, &self.remote).await;
        self.finish_merge(&outcome);
        info!(merged = matches!(outcome, ReconcileOutcome::Merged(_)), "Session authenticated");
        Some(outcome)
    }

    /// Return to the signed-out state.
    ///
    /// The server cart is dropped from view. Guest storage is left as is: it
    /// is empty after a completed merge, and still holds the lines of a merge
    /// that never ran.
    pub fn logout(&mut self) {
        self.state = SessionState::Guest {
            cart: guest_cart(self.local.load()),
        };
        info!("Session signed out");
    }

    fn finish_merge(&mut self, outcome: &ReconcileOutcome) {
        self.state = match outcome {
            ReconcileOutcome::Merged(report) => SessionState::Authenticated {
                cart: Some(report.cart.clone()),
                pending_merge: false,
            },
            ReconcileOutcome::Skipped { .. } => SessionState::Authenticated {
                cart: None,
                pending_merge: !self.local.load().is_empty(),
            },
        };
    }

    // =========================================================================
    // Cart Actions
    // =========================================================================

    /// Add `quantity` of `product_id`.
    ///
    /// # Errors
    ///
    /// - `CartError::Validation` for a blank product ID or a quantity that is
    ///   not a positive 32-bit integer, before any I/O
    /// - `CartError::Reconciling` while a merge is unfinished
    /// - any error from the server cart while signed in
    #[instrument(skip(self))]
    pub async fn add_to_cart(&mut self, product_id: &str, quantity: i64) -> Result<()> {
        let product_id = ProductId::parse(product_id)?;
        let quantity = Quantity::try_from(quantity)?;

        match &mut self.state {
            SessionState::Guest { cart } => {
                *cart = guest_cart(self.local.add(product_id.clone(), quantity));
            }
            SessionState::Authenticating => return Err(CartError::Reconciling),
            SessionState::Authenticated { cart, .. } => {
                *cart = Some(self.remote.add_item(&product_id, quantity).await?);
            }
        }

        let count = quantity.to_string();
        add_breadcrumb(
            "cart",
            "Added to cart",
            Some(&[("product_id", product_id.as_str()), ("quantity", count.as_str())]),
        );
        Ok(())
    }

    /// Remove the line for `product_id`. Removing an absent product changes
    /// nothing.
    ///
    /// # Errors
    ///
    /// - `CartError::Validation` for a blank product ID
    /// - `CartError::Reconciling` while a merge is unfinished
    /// - any error from the server cart while signed in
    #[instrument(skip(self))]
    pub async fn remove_from_cart(&mut self, product_id: &str) -> Result<()> {
        let product_id = ProductId::parse(product_id)?;

        match &mut self.state {
            SessionState::Guest { cart } => {
                *cart = guest_cart(self.local.remove(&product_id));
            }
            SessionState::Authenticating => return Err(CartError::Reconciling),
            SessionState::Authenticated { cart, .. } => {
                *cart = Some(self.remote.remove_item(&product_id).await?);
            }
        }

        add_breadcrumb(
            "cart",
            "Removed from cart",
            Some(&[("product_id", product_id.as_str())]),
        );
        Ok(())
    }

    /// Empty the cart.
    ///
    /// Signed out this deletes the guest cart. Signed in the backend empties
    /// the server cart itself when an order is placed, so this only reloads it.
    ///
    /// # Errors
    ///
    /// See [`refresh`](Self::refresh).
    pub async fn clear(&mut self) -> Result<()> {
        match self.state {
            SessionState::Guest { .. } => {
                self.local.clear();
                self.state = SessionState::Guest { cart: None };
                Ok(())
            }
            SessionState::Authenticating => Err(CartError::Reconciling),
            SessionState::Authenticated { .. } => self.refresh().await,
        }
    }

    /// Reload the cart from its source of truth.
    ///
    /// Signed in with a pending merge and guest lines still stored, this
    /// retries the merge instead. A session left mid-merge by a dropped
    /// future is moved to signed in without merging.
    ///
    /// # Errors
    ///
    /// Returns the server cart error while signed in; the cart view is then
    /// empty until the next successful reload.
    #[instrument(skip(self))]
    pub async fn refresh(&mut self) -> Result<()> {
        match self.state {
            SessionState::Guest { .. } => {
                self.state = SessionState::Guest {
                    cart: guest_cart(self.local.load()),
                };
                Ok(())
            }
            SessionState::Authenticated {
                pending_merge: true,
                ..
            } if !self.local.load().is_empty() => {
                self.state = SessionState::Authenticating;
                let outcome = reconcile(&self.local, &self.remote).await;
                self.finish_merge(&outcome);
                match outcome {
                    ReconcileOutcome::Merged(report) => {
                        if !report.is_complete() {
                            warn!(failed = report.failed.len(), "Guest cart merged partially");
                        }
                        Ok(())
                    }
                    ReconcileOutcome::Skipped { error } => Err(error),
                }
            }
            SessionState::Authenticated { .. } | SessionState::Authenticating => {
                let fetched = self.remote.fetch_current().await;
                let pending_merge = !self.local.load().is_empty();
                match fetched {
                    Ok(cart) => {
                        self.state = SessionState::Authenticated {
                            cart: Some(cart),
                            pending_merge,
                        };
                        Ok(())
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to refresh server cart");
                        self.state = SessionState::Authenticated {
                            cart: None,
                            pending_merge,
                        };
                        Err(e)
                    }
                }
            }
        }
    }
}

/// Guest cart view over stored lines; `None` when there are none.
fn guest_cart(items: Vec<CartItem>) -> Option<Cart> {
    if items.is_empty() {
        None
    } else {
        Some(Cart::guest(items, Utc::now()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use super::*;
    use crate::cart::testing::{FailingStore, FakeRemote, item};
    use crate::storage::MemoryStore;

    fn guest_store() -> GuestCartStore {
        GuestCartStore::new(Arc::new(MemoryStore::new()))
    }

    fn lines(cart: Option<&Cart>) -> BTreeMap<String, u32> {
        cart.map(|c| {
            c.items
                .iter()
                .map(|i| (i.product_id.to_string(), i.quantity.get()))
                .collect()
        })
        .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_guest_add_sums_into_one_line() {
        let mut session = CartSession::new(guest_store(), FakeRemote::default());

        session.add_to_cart("P", 2).await.unwrap();
        session.add_to_cart("P", 3).await.unwrap();

        let cart = session.cart().unwrap();
        assert!(cart.is_guest());
        assert_eq!(cart.items, vec![item("P", 5)]);
        assert_eq!(session.item_count(), 5);
        assert_eq!(session.remote().add_calls(), 0);
    }

    #[tokio::test]
    async fn test_validation_happens_before_io() {
        let mut session = CartSession::new(guest_store(), FakeRemote::default());
        session.authenticate().await.unwrap();

        for quantity in [0, -1, i64::from(u32::MAX) + 1] {
            let err = session.add_to_cart("P", quantity).await.unwrap_err();
            assert!(matches!(err, CartError::Validation(_)), "{quantity}: {err}");
        }
        let err = session.add_to_cart("   ", 1).await.unwrap_err();
        assert!(matches!(err, CartError::Validation(_)));
        assert_eq!(session.remote().add_calls(), 0);
    }

    #[tokio::test]
    async fn test_guest_remove_absent_is_noop() {
        let mut session = CartSession::new(guest_store(), FakeRemote::default());
        session.add_to_cart("a", 1).await.unwrap();
        let before = session.cart().cloned();

        session.remove_from_cart("ghost").await.unwrap();
        assert_eq!(lines(session.cart()), lines(before.as_ref()));
    }

    #[tokio::test]
    async fn test_empty_guest_cart_is_absent() {
        let mut session = CartSession::new(guest_store(), FakeRemote::default());
        assert!(session.cart().is_none());
        assert_eq!(session.item_count(), 0);

        session.add_to_cart("a", 1).await.unwrap();
        session.remove_from_cart("a").await.unwrap();
        assert!(session.cart().is_none());
    }

    #[tokio::test]
    async fn test_login_merges_guest_cart() {
        let local = guest_store();
        let remote = Arc::new(FakeRemote::with_items(&[("sku-1", 1)]));
        let mut session = CartSession::new(local.clone(), remote.clone());

        session.add_to_cart("sku-1", 1).await.unwrap();
        session.add_to_cart("sku-2", 2).await.unwrap();

        let outcome = session.authenticate().await.unwrap();
        assert!(matches!(outcome, ReconcileOutcome::Merged(_)));
        assert!(session.is_authenticated());
        assert!(local.load().is_empty());

        assert_eq!(remote.quantity("sku-1"), Some(2));
        assert_eq!(remote.quantity("sku-2"), Some(2));
        assert_eq!(
            lines(session.cart()),
            BTreeMap::from([("sku-1".to_string(), 2), ("sku-2".to_string(), 2)])
        );
        assert_eq!(session.item_count(), 4);
    }

    #[tokio::test]
    async fn test_authenticate_runs_once() {
        let remote = Arc::new(FakeRemote::default());
        let mut session = CartSession::new(guest_store(), remote.clone());

        assert!(session.authenticate().await.is_some());
        assert!(session.authenticate().await.is_none());
        assert_eq!(remote.fetch_calls(), 1);
    }

    #[tokio::test]
    async fn test_skipped_merge_keeps_guest_cart_and_retries_on_refresh() {
        let local = guest_store();
        let remote = Arc::new(FakeRemote::with_items(&[("sku-1", 1)]));
        let mut session = CartSession::new(local.clone(), remote.clone());
        session.add_to_cart("sku-2", 2).await.unwrap();

        remote.fail_fetch(true);
        let outcome = session.authenticate().await.unwrap();
        assert!(matches!(outcome, ReconcileOutcome::Skipped { .. }));
        assert_eq!(
            session.state(),
            &SessionState::Authenticated {
                cart: None,
                pending_merge: true
            }
        );
        assert_eq!(local.load(), vec![item("sku-2", 2)]);

        remote.fail_fetch(false);
        session.refresh().await.unwrap();
        assert!(local.load().is_empty());
        assert_eq!(remote.quantity("sku-2"), Some(2));
        assert_eq!(
            session.state(),
            &SessionState::Authenticated {
                cart: session.cart().cloned(),
                pending_merge: false
            }
        );
    }

    #[tokio::test]
    async fn test_authenticated_routes_to_server() {
        let local = guest_store();
        let remote = Arc::new(FakeRemote::default());
        let mut session = CartSession::new(local.clone(), remote.clone());
        session.authenticate().await.unwrap();

        session.add_to_cart("a", 3).await.unwrap();
        session.remove_from_cart("a").await.unwrap();
        session.add_to_cart("b", 1).await.unwrap();

        assert!(local.load().is_empty());
        assert_eq!(remote.add_calls(), 2);
        assert_eq!(remote.remove_calls(), 1);
        assert_eq!(lines(session.cart()), BTreeMap::from([("b".to_string(), 1)]));
    }

    #[tokio::test]
    async fn test_failed_refresh_hides_cart() {
        let remote = Arc::new(FakeRemote::with_items(&[("a", 1)]));
        let mut session = CartSession::new(guest_store(), remote.clone());
        session.authenticate().await.unwrap();
        assert_eq!(session.item_count(), 1);

        remote.fail_fetch(true);
        assert!(session.refresh().await.is_err());
        assert!(session.cart().is_none());
        assert_eq!(session.item_count(), 0);
    }

    #[tokio::test]
    async fn test_logout_starts_fresh_guest_cart() {
        let local = guest_store();
        let remote = Arc::new(FakeRemote::default());
        let mut session = CartSession::new(local.clone(), remote.clone());
        session.add_to_cart("a", 1).await.unwrap();
        session.authenticate().await.unwrap();

        session.logout();
        assert!(!session.is_authenticated());
        assert!(session.cart().is_none());

        session.add_to_cart("z", 1).await.unwrap();
        assert_eq!(local.load(), vec![item("z", 1)]);
        assert_eq!(remote.quantity("z"), None);
    }

    #[tokio::test]
    async fn test_mutations_rejected_mid_merge() {
        let mut session = CartSession::new(guest_store(), FakeRemote::default());
        // A merge future dropped before completion leaves this state behind
        session.state = SessionState::Authenticating;

        assert!(matches!(
            session.add_to_cart("a", 1).await,
            Err(CartError::Reconciling)
        ));
        assert!(matches!(
            session.remove_from_cart("a").await,
            Err(CartError::Reconciling)
        ));
        assert!(matches!(session.clear().await, Err(CartError::Reconciling)));
        assert!(session.authenticate().await.is_none());

        session.refresh().await.unwrap();
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn test_clear() {
        let mut session = CartSession::new(guest_store(), FakeRemote::default());
        session.add_to_cart("a", 1).await.unwrap();
        session.clear().await.unwrap();
        assert!(session.cart().is_none());
        assert!(session.local().load().is_empty());
    }

    #[tokio::test]
    async fn test_guest_add_survives_storage_write_failure() {
        let backing = Arc::new(FailingStore::default());
        backing.fail_set(true);
        let mut session = CartSession::new(GuestCartStore::new(backing), FakeRemote::default());

        session.add_to_cart("P", 2).await.unwrap();

        let view = session.view(Utc::now());
        assert_eq!(view.items, vec![item("P", 2)]);
        assert_eq!(view.item_count, 2);
        assert!(view.is_guest);
    }

    #[tokio::test]
    async fn test_guest_clear_survives_storage_remove_failure() {
        let backing = Arc::new(FailingStore::default());
        let mut session =
            CartSession::new(GuestCartStore::new(backing.clone()), FakeRemote::default());
        session.add_to_cart("P", 1).await.unwrap();

        backing.fail_remove(true);
        session.clear().await.unwrap();

        assert!(session.cart().is_none());
    }

    #[tokio::test]
    async fn test_restore_with_token_merges_leftovers() {
        let local = guest_store();
        local.save(&[item("left", 2)]);
        let remote = Arc::new(FakeRemote::default());

        let session = CartSession::restore(local.clone(), remote.clone(), true).await;
        assert!(session.is_authenticated());
        assert!(local.load().is_empty());
        assert_eq!(remote.quantity("left"), Some(2));
    }

    #[tokio::test]
    async fn test_restore_without_token_is_guest() {
        let local = guest_store();
        local.save(&[item("left", 2)]);

        let session = CartSession::restore(local, FakeRemote::default(), false).await;
        assert!(!session.is_authenticated());
        assert_eq!(session.item_count(), 2);
        assert_eq!(session.remote().fetch_calls(), 0);
    }
}
