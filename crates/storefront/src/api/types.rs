//! Wire types for the storefront REST backend.
//!
//! Cart types live in `shopfront-core` because the guest store and the
//! reconciliation engine share them; everything here is only exchanged
//! with the backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopfront_core::{CartItem, OrderId, OrderStatus, Price, ProductId, StoreId, UserId};

// =============================================================================
// Envelope
// =============================================================================

/// Response envelope wrapping every backend payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the backend considers the request successful.
    #[serde(default)]
    pub success: bool,
    /// Payload (absent or null on failure and for empty responses).
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    /// Structured failure details.
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
    /// Flat failure message used by the auth endpoints.
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Best available failure reason.
    #[must_use]
    pub fn failure_message(&self) -> String {
        self.error
            .as_ref()
            .map(|e| e.message.clone())
            .or_else(|| self.message.clone())
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "API request failed".to_string())
    }
}

/// Failure details inside an [`ApiResponse`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    /// Human-readable reason.
    pub message: String,
    /// HTTP status the backend associated with the failure.
    #[serde(default)]
    pub status_code: Option<u16>,
}

// =============================================================================
// Cart Requests
// =============================================================================

/// Body of `POST /cart`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest<'a> {
    pub product_id: &'a ProductId,
    pub quantity: u32,
}

/// Body of `DELETE /cart/item`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveItemRequest<'a> {
    pub product_id: &'a ProductId,
}

// =============================================================================
// Product Types
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    /// Retailer store offering the product.
    #[serde(default)]
    pub store_id: Option<StoreId>,
    pub name: String,
    pub description: String,
    pub price: Price,
    /// Units in stock.
    pub stock: i64,
    pub category: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub long_description: Option<String>,
    /// Main product image.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Smaller image for listings.
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

impl Product {
    /// Image for listings: the thumbnail, falling back to the main image.
    #[must_use]
    pub fn thumbnail(&self) -> Option<&str> {
        self.thumbnail_url
            .as_deref()
            .or(self.image_url.as_deref())
            .filter(|url| !url.is_empty())
    }

    /// Whether at least one unit is available.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

// =============================================================================
// Retailer Types
// =============================================================================

/// A retailer's store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub owner_id: Option<UserId>,
}

/// Payload of `POST /backoffice/uploads/products`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUpload {
    pub image_url: String,
    pub thumbnail_url: String,
    pub public_id: String,
}

// =============================================================================
// Order Types
// =============================================================================

/// A line of a placed order, priced at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub price: Price,
    pub subtotal: Price,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    /// Ordering user (`None` for guest checkouts).
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub items: Vec<OrderItem>,
    pub total: Price,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub shipping_address: String,
}

/// Body of `POST /orders`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder<'a> {
    pub items: &'a [CartItem],
    pub shipping_address: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_name: Option<&'a str>,
}

// =============================================================================
// Auth Types
// =============================================================================

/// An authenticated shopper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub status: Option<String>,
}

/// Payload of `POST /auth/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

/// Payload of `POST /auth/register`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegisterResponse {
    pub id: UserId,
    pub email: String,
    pub name: String,
}
