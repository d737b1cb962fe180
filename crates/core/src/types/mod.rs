//! Core types for Shopfront.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod email;
pub mod id;
pub mod price;
pub mod quantity;
pub mod status;

pub use cart::{Cart, CartItem, CartOwner, GUEST_OWNER, total_quantity};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{Price, PriceParseError};
pub use quantity::{Quantity, QuantityError};
pub use status::*;
