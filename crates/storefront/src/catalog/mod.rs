//! Product catalog client.
//!
//! Products and listings are cached with `moka` for the configured TTL
//! (5 minutes by default). Fetching a listing also warms the per-product
//! entries, so pricing a cart right after browsing costs no requests.

mod cache;

use std::sync::Arc;

use moka::future::Cache;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use shopfront_core::{Cart, Price, ProductId, Quantity};

use crate::api::types::Product;
use crate::api::{Access, ApiClient};
use crate::config::ClientConfig;
use crate::error::Result;

use cache::{CacheKey, CacheValue};

// =============================================================================
// CatalogClient
// =============================================================================

/// Read-only access to the product catalog.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
}

struct CatalogClientInner {
    api: ApiClient,
    cache: Cache<CacheKey, CacheValue>,
}

impl CatalogClient {
    #[must_use]
    pub fn new(api: ApiClient, config: &ClientConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.product_cache_ttl)
            .build();

        Self {
            inner: Arc::new(CatalogClientInner { api, cache }),
        }
    }

    /// List products, optionally restricted to one category.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list(&self, category: Option<&str>) -> Result<Arc<Vec<Product>>> {
        let category = category
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from);
        let cache_key = CacheKey::Products {
            category: category.clone(),
        };

        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product listing");
            return Ok(products);
        }

        let path = category.as_deref().map_or_else(
            || "/products".to_string(),
            |c| format!("/products?category={}", urlencoding::encode(c)),
        );
        let products: Arc<Vec<Product>> =
            Arc::new(self.inner.api.get(&path, Access::Optional).await?);

        for product in products.iter() {
            self.inner
                .cache
                .insert(
                    CacheKey::Product(product.id.clone()),
                    CacheValue::Product(Box::new(product.clone())),
                )
                .await;
        }
        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(Arc::clone(&products)))
            .await;

        Ok(products)
    }

    /// Fetch one product.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Server` (404) for an unknown product, or any other
    /// API error.
    #[instrument(skip(self, id), fields(product_id = %id))]
    pub async fn get(&self, id: &ProductId) -> Result<Product> {
        let cache_key = CacheKey::Product(id.clone());

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let path = format!("/products/{}", urlencoding::encode(id.as_str()));
        let product: Product = self.inner.api.get(&path, Access::Optional).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Drop every cached entry.
    pub fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
    }

    /// Price every line of `cart` with current catalog prices.
    ///
    /// Lines whose product cannot be loaded, or whose amount overflows, are
    /// left out of the total and listed in [`PricedCart::missing`].
    #[instrument(skip_all)]
    pub async fn price_cart(&self, cart: &Cart) -> PricedCart {
        let mut priced = PricedCart::default();

        for item in &cart.items {
            match self.get(&item.product_id).await {
                Ok(product) => priced.push(product, item.quantity),
                Err(e) => {
                    warn!(product_id = %item.product_id, error = %e, "Failed to load cart product");
                    priced.missing.push(item.product_id.clone());
                }
            }
        }

        priced
    }
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("cached_entries", &self.inner.cache.entry_count())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Pricing
// =============================================================================

/// A cart line with its product details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PricedLine {
    pub product: Product,
    pub quantity: Quantity,
    pub line_total: Price,
}

impl PricedLine {
    /// Price `quantity` units of `product`, or `None` if the amount overflows.
    #[must_use]
    pub fn new(product: Product, quantity: Quantity) -> Option<Self> {
        let line_total = product.price.checked_times(quantity)?;
        Some(Self {
            product,
            quantity,
            line_total,
        })
    }
}

/// A cart priced against the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PricedCart {
    pub lines: Vec<PricedLine>,
    pub total: Price,
    /// Products that could not be loaded or priced.
    pub missing: Vec<ProductId>,
}

impl PricedCart {
    fn push(&mut self, product: Product, quantity: Quantity) {
        let id = product.id.clone();
        let priced = PricedLine::new(product, quantity)
            .and_then(|line| Some((self.total.checked_add(line.line_total)?, line)));

        match priced {
            Some((total, line)) => {
                self.total = total;
                self.lines.push(line);
            }
            None => {
                warn!(product_id = %id, quantity = %quantity, "Cart line amount overflows, leaving it unpriced");
                self.missing.push(id);
            }
        }
    }
}
