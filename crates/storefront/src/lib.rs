//! Shopfront storefront client library.
//!
//! Everything a shopper-facing front end needs to talk to the Shopfront REST
//! backend: a cart that works signed out and signed in ([`CartSession`]),
//! the login-time merge of the two, authentication, the product catalog and
//! order placement. Retailers manage their stores through `backoffice`.
//!
//! # Modules
//!
//! - `api` - HTTP client and wire types
//! - `auth` - Login, registration and bearer token storage
//! - `backoffice` - Retailer stores and their products
//! - `cart` - Guest cart, server cart, reconciliation and the cart session
//! - `catalog` - Cached product lookups and cart pricing
//! - `checkout` - Order validation and placement
//! - `config` - Environment configuration
//! - `storage` - Durable client-side key-value storage

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod auth;
pub mod backoffice;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod error;
pub mod storage;

pub use api::{Access, ApiClient};
pub use auth::{AuthService, TokenStore};
pub use backoffice::{StoreClient, StoreProductClient};
pub use cart::{CartSession, CartView, GuestCartStore, RemoteCart, RemoteCartClient};
pub use catalog::CatalogClient;
pub use checkout::{CheckoutError, CheckoutRequest, GuestContact, OrderClient};
pub use config::ClientConfig;
pub use error::{CartError, Result};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
