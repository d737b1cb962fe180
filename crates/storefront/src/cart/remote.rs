//! Server-side cart of the signed-in shopper.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;

use shopfront_core::{Cart, ProductId, Quantity};

use crate::api::types::{AddItemRequest, RemoveItemRequest};
use crate::api::{Access, ApiClient};
use crate::error::Result;

/// Access to the authenticated shopper's server cart.
///
/// Implementations are stateless; the backend owns the cart and resolves
/// ordering between concurrent writes.
#[async_trait]
pub trait RemoteCart: Send + Sync {
    /// The cart of the current bearer identity.
    async fn fetch_current(&self) -> Result<Cart>;

    /// Increment (or create) the line for `product_id`.
    async fn add_item(&self, product_id: &ProductId, quantity: Quantity) -> Result<Cart>;

    /// Delete the line for `product_id`. Deleting an absent line is a no-op.
    async fn remove_item(&self, product_id: &ProductId) -> Result<Cart>;
}

#[async_trait]
impl<T: RemoteCart + ?Sized> RemoteCart for Arc<T> {
    async fn fetch_current(&self) -> Result<Cart> {
        (**self).fetch_current().await
    }

    async fn add_item(&self, product_id: &ProductId, quantity: Quantity) -> Result<Cart> {
        (**self).add_item(product_id, quantity).await
    }

    async fn remove_item(&self, product_id: &ProductId) -> Result<Cart> {
        (**self).remove_item(product_id).await
    }
}

/// [`RemoteCart`] over the REST backend.
#[derive(Debug, Clone)]
pub struct RemoteCartClient {
    api: ApiClient,
}

impl RemoteCartClient {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl RemoteCart for RemoteCartClient {
    #[instrument(skip(self))]
    async fn fetch_current(&self) -> Result<Cart> {
        self.api.get("/cart/me", Access::Required).await
    }

    #[instrument(skip(self, product_id, quantity), fields(product_id = %product_id, quantity = quantity.get()))]
    async fn add_item(&self, product_id: &ProductId, quantity: Quantity) -> Result<Cart> {
        self.api
            .post(
                "/cart",
                &AddItemRequest {
                    product_id,
                    quantity: quantity.get(),
                },
                Access::Required,
            )
            .await
    }

    #[instrument(skip(self, product_id), fields(product_id = %product_id))]
    async fn remove_item(&self, product_id: &ProductId) -> Result<Cart> {
        self.api
            .delete("/cart/item", &RemoveItemRequest { product_id }, Access::Required)
            .await
    }
}
