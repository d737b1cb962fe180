//! Order placement.
//!
//! Guests must leave a name and an email address with their order; signed-in
//! shoppers are identified by their token. Input is checked before the order
//! is sent, and a placed order empties the cart.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::{info, instrument};

use shopfront_core::{CartItem, OrderId};

use crate::api::types::{NewOrder, Order};
use crate::api::{Access, ApiClient};
use crate::cart::{CartSession, RemoteCart};
use crate::error::{CartError, add_breadcrumb};

/// Loose `local@domain.tld` shape check for guest contact emails.
static GUEST_EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid regex"));

/// Errors that can occur while placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Your cart is empty")]
    EmptyCart,

    #[error("Shipping address is required")]
    MissingShippingAddress,

    #[error("Email and name are required for guest orders")]
    MissingGuestContact,

    #[error("Please enter a valid email address")]
    InvalidGuestEmail,

    #[error(transparent)]
    Api(#[from] CartError),
}

/// Contact details for a guest order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuestContact {
    pub email: String,
    pub name: String,
}

/// A validated order ready to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    items: Vec<CartItem>,
    shipping_address: String,
    guest: Option<GuestContact>,
}

impl CheckoutRequest {
    /// Validate order input.
    ///
    /// `guest` must be `Some` exactly when the shopper is signed out; it is
    /// ignored for signed-in shoppers.
    ///
    /// # Errors
    ///
    /// Returns the first failing check, in this order: empty cart, blank
    /// shipping address, missing guest name or email, malformed guest email.
    pub fn new(
        items: Vec<CartItem>,
        shipping_address: &str,
        signed_in: bool,
        guest: Option<GuestContact>,
    ) -> Result<Self, CheckoutError> {
        if items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let shipping_address = shipping_address.trim();
        if shipping_address.is_empty() {
            return Err(CheckoutError::MissingShippingAddress);
        }

        let guest = if signed_in {
            None
        } else {
            let contact = guest.unwrap_or_default();
            let email = contact.email.trim();
            let name = contact.name.trim();
            if email.is_empty() || name.is_empty() {
                return Err(CheckoutError::MissingGuestContact);
            }
            if !GUEST_EMAIL_RE.is_match(email) {
                return Err(CheckoutError::InvalidGuestEmail);
            }
            Some(GuestContact {
                email: email.to_string(),
                name: name.to_string(),
            })
        };

        Ok(Self {
            items,
            shipping_address: shipping_address.to_string(),
            guest,
        })
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn shipping_address(&self) -> &str {
        &self.shipping_address
    }

    #[must_use]
    pub const fn guest(&self) -> Option<&GuestContact> {
        self.guest.as_ref()
    }

    fn body(&self) -> NewOrder<'_> {
        NewOrder {
            items: &self.items,
            shipping_address: &self.shipping_address,
            guest_email: self.guest.as_ref().map(|g| g.email.as_str()),
            guest_name: self.guest.as_ref().map(|g| g.name.as_str()),
        }
    }
}

// =============================================================================
// OrderClient
// =============================================================================

/// Client for the orders endpoints.
#[derive(Debug, Clone)]
pub struct OrderClient {
    api: ApiClient,
}

impl OrderClient {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Place an order.
    ///
    /// Guest orders are sent without a token.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip_all, fields(lines = request.items.len(), guest = request.guest.is_some()))]
    pub async fn create(&self, request: &CheckoutRequest) -> Result<Order, CartError> {
        let access = if request.guest.is_some() {
            Access::Anonymous
        } else {
            Access::Required
        };
        let order: Order = self.api.post("/orders", &request.body(), access).await?;
        info!(order_id = %order.id, total = %order.total, "Order placed");
        Ok(order)
    }

    /// Fetch an order by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, id), fields(order_id = %id))]
    pub async fn get(&self, id: &OrderId) -> Result<Order, CartError> {
        let path = format!("/orders/{}", urlencoding::encode(id.as_str()));
        self.api.get(&path, Access::Optional).await
    }
}

impl<R: RemoteCart> CartSession<R> {
    /// Place an order for the current cart, then empty the cart.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any request, or the API error from
    /// order creation. A failure to reload the cart afterwards is not an
    /// error: the order exists either way.
    pub async fn checkout(
        &mut self,
        orders: &OrderClient,
        shipping_address: &str,
        guest: Option<GuestContact>,
    ) -> Result<Order, CheckoutError> {
        if matches!(self.state(), crate::cart::SessionState::Authenticating) {
            return Err(CartError::Reconciling.into());
        }

        let items = self.cart().map(|cart| cart.items.clone()).unwrap_or_default();
        let request =
            CheckoutRequest::new(items, shipping_address, self.is_authenticated(), guest)?;

        let order = orders.create(&request).await?;
        add_breadcrumb("checkout", "Order placed", Some(&[("order_id", order.id.as_str())]));

        if let Err(e) = self.clear().await {
            tracing::warn!(error = %e, "Failed to reload cart after checkout");
        }
        Ok(order)
    }
}
