//! Shopfront Core - Shared types library.
//!
//! This crate provides the domain types used across all Shopfront components:
//! - `storefront` - Cart session, reconciliation and REST clients
//! - `cli` - Command-line shopper client
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no storage. This keeps it lightweight and allows it to be used
//! anywhere, including in tests that fake the backend.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, quantities, carts, prices, emails, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
