//! Retailer back office: the signed-in user's stores and their products.
//!
//! Every call needs a bearer token. Payloads are checked before anything is
//! sent: text fields are trimmed, blank optional fields are dropped, and a
//! product can never be created with a negative price or stock.

use serde::Serialize;
use tracing::{info, instrument};

use shopfront_core::{Price, ProductId, StoreId};

use crate::api::types::{ImageUpload, Product, Store};
use crate::api::{Access, ApiClient};
use crate::error::{CartError, Result, add_breadcrumb};

/// Category used when a new product is given none.
pub const DEFAULT_CATEGORY: &str = "General";

fn required(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CartError::Validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

fn non_negative_price(price: Price) -> Result<Price> {
    if price.is_negative() {
        return Err(CartError::Validation(
            "price cannot be negative".to_string(),
        ));
    }
    Ok(price)
}

fn non_negative_stock(stock: i64) -> Result<i64> {
    if stock < 0 {
        return Err(CartError::Validation(
            "stock cannot be negative".to_string(),
        ));
    }
    Ok(stock)
}

// =============================================================================
// Store Payloads
// =============================================================================

/// Body of `POST /stores`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStore {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl NewStore {
    /// Trimmed copy, with blank optional fields removed.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Validation` for a blank name.
    pub fn validated(&self) -> Result<Self> {
        Ok(Self {
            name: required("name", &self.name)?,
            description: optional(self.description.as_deref()),
            image_url: optional(self.image_url.as_deref()),
            phone: optional(self.phone.as_deref()),
            address: optional(self.address.as_deref()),
        })
    }
}

/// Body of `PUT /stores/{id}`. Only present fields are changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl StoreUpdate {
    /// Trimmed copy.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Validation` if nothing would change or the new
    /// name is blank.
    pub fn validated(&self) -> Result<Self> {
        let update = Self {
            name: self.name.as_deref().map(|n| required("name", n)).transpose()?,
            description: self.description.as_deref().map(|v| v.trim().to_string()),
            image_url: self.image_url.as_deref().map(|v| v.trim().to_string()),
            phone: self.phone.as_deref().map(|v| v.trim().to_string()),
            address: self.address.as_deref().map(|v| v.trim().to_string()),
        };
        if update == Self::default() {
            return Err(CartError::Validation("nothing to update".to_string()));
        }
        Ok(update)
    }
}

// =============================================================================
// Product Payloads
// =============================================================================

/// Body of `POST /backoffice/stores/{storeId}/products`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Price,
    pub stock: i64,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_description: Option<String>,
}

impl NewProduct {
    /// Trimmed copy. A blank category becomes [`DEFAULT_CATEGORY`].
    ///
    /// # Errors
    ///
    /// Returns `CartError::Validation` for a blank name or description, or a
    /// negative price or stock.
    pub fn validated(&self) -> Result<Self> {
        let category = self.category.trim();
        Ok(Self {
            name: required("name", &self.name)?,
            description: required("description", &self.description)?,
            price: non_negative_price(self.price)?,
            stock: non_negative_stock(self.stock)?,
            category: if category.is_empty() {
                DEFAULT_CATEGORY.to_string()
            } else {
                category.to_string()
            },
            image_url: optional(self.image_url.as_deref()),
            thumbnail_url: optional(self.thumbnail_url.as_deref()),
            long_description: optional(self.long_description.as_deref()),
        })
    }
}

/// Body of `PUT /backoffice/products/{productId}`. Only present fields are
/// changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_description: Option<String>,
}

impl ProductUpdate {
    /// Trimmed copy.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Validation` if nothing would change, a required
    /// field is set blank, or the price or stock is negative.
    pub fn validated(&self) -> Result<Self> {
        let update = Self {
            name: self.name.as_deref().map(|v| required("name", v)).transpose()?,
            description: self
                .description
                .as_deref()
                .map(|v| required("description", v))
                .transpose()?,
            price: self.price.map(non_negative_price).transpose()?,
            stock: self.stock.map(non_negative_stock).transpose()?,
            category: self
                .category
                .as_deref()
                .map(|v| required("category", v))
                .transpose()?,
            image_url: self.image_url.as_deref().map(|v| v.trim().to_string()),
            thumbnail_url: self.thumbnail_url.as_deref().map(|v| v.trim().to_string()),
            long_description: self.long_description.as_deref().map(|v| v.trim().to_string()),
        };
        if update == Self::default() {
            return Err(CartError::Validation("nothing to update".to_string()));
        }
        Ok(update)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadImage<'a> {
    image_data_url: &'a str,
}

// =============================================================================
// StoreClient
// =============================================================================

/// Client for the signed-in retailer's stores.
#[derive(Debug, Clone)]
pub struct StoreClient {
    api: ApiClient,
}

impl StoreClient {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Stores owned by the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Auth` when signed out, or any other API error.
    #[instrument(skip(self))]
    pub async fn list_mine(&self) -> Result<Vec<Store>> {
        self.api.get("/stores/mine", Access::Required).await
    }

    /// Open a new store.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Validation` before any request for a blank name,
    /// `CartError::Auth` when signed out, or any other API error.
    #[instrument(skip_all)]
    pub async fn create(&self, store: &NewStore) -> Result<Store> {
        let body = store.validated()?;
        let created: Store = self.api.post("/stores", &body, Access::Required).await?;
        add_breadcrumb("backoffice", "Store created", Some(&[("store_id", created.id.as_str())]));
        info!(store_id = %created.id, "Store created");
        Ok(created)
    }

    /// Change some of a store's details.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Validation` before any request for an empty or
    /// invalid update, or the API error.
    #[instrument(skip(self, changes), fields(store_id = %id))]
    pub async fn update(&self, id: &StoreId, changes: &StoreUpdate) -> Result<Store> {
        let body = changes.validated()?;
        let path = format!("/stores/{}", urlencoding::encode(id.as_str()));
        let updated: Store = self.api.put(&path, &body, Access::Required).await?;
        info!("Store updated");
        Ok(updated)
    }
}

// =============================================================================
// StoreProductClient
// =============================================================================

/// Client for the products of the signed-in retailer's stores.
#[derive(Debug, Clone)]
pub struct StoreProductClient {
    api: ApiClient,
}

impl StoreProductClient {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Products of one store.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Auth` when signed out, or any other API error.
    #[instrument(skip(self, store_id), fields(store_id = %store_id))]
    pub async fn list(&self, store_id: &StoreId) -> Result<Vec<Product>> {
        let path = products_path(store_id);
        self.api.get(&path, Access::Required).await
    }

    /// Add a product to a store.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Validation` before any request for an invalid
    /// product, or the API error.
    #[instrument(skip(self, store_id, product), fields(store_id = %store_id))]
    pub async fn create(&self, store_id: &StoreId, product: &NewProduct) -> Result<Product> {
        let body = product.validated()?;
        let created: Product = self
            .api
            .post(&products_path(store_id), &body, Access::Required)
            .await?;
        add_breadcrumb(
            "backoffice",
            "Product created",
            Some(&[("product_id", created.id.as_str())]),
        );
        info!(product_id = %created.id, "Product created");
        Ok(created)
    }

    /// Change some of a product's details.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Validation` before any request for an empty or
    /// invalid update, or the API error.
    #[instrument(skip(self, changes), fields(product_id = %id))]
    pub async fn update(&self, id: &ProductId, changes: &ProductUpdate) -> Result<Product> {
        let body = changes.validated()?;
        let path = format!("/backoffice/products/{}", urlencoding::encode(id.as_str()));
        let updated: Product = self.api.put(&path, &body, Access::Required).await?;
        info!("Product updated");
        Ok(updated)
    }

    /// Upload a product image given as a `data:image/...` URL.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Validation` before any request if `data_url` is not
    /// an image data URL, or the API error.
    #[instrument(skip_all, fields(bytes = data_url.len()))]
    pub async fn upload_image(&self, data_url: &str) -> Result<ImageUpload> {
        if !data_url.starts_with("data:image/") {
            return Err(CartError::Validation(
                "please select an image file (e.g. JPEG, PNG)".to_string(),
            ));
        }
        self.api
            .post(
                "/backoffice/uploads/products",
                &UploadImage {
                    image_data_url: data_url,
                },
                Access::Required,
            )
            .await
    }
}

fn products_path(store_id: &StoreId) -> String {
    format!(
        "/backoffice/stores/{}/products",
        urlencoding::encode(store_id.as_str())
    )
}
