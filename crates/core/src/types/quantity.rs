//! Cart line quantities.
//!
//! A cart line always holds at least one unit. Removing a product deletes
//! the line instead of storing a zero, so zero is not representable here.

use core::fmt;
use core::num::NonZeroU32;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when building a [`Quantity`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantityError {
    /// Quantity was zero.
    #[error("quantity must be a positive integer (got 0)")]
    Zero,
    /// Quantity was negative.
    #[error("quantity must be a positive integer (got {0})")]
    Negative(i64),
    /// Quantity does not fit in 32 bits.
    #[error("quantity must fit in 32 bits (got {got})")]
    TooLarge {
        /// The rejected value.
        got: u64,
    },
}

/// A positive number of units on a cart line.
///
/// ## Examples
///
/// ```
/// use shopfront_core::Quantity;
///
/// let two = Quantity::new(2).unwrap();
/// let three = Quantity::new(3).unwrap();
/// assert_eq!(two.checked_add(three).map(Quantity::get), Some(5));
/// assert_eq!(Quantity::MAX.checked_add(two), None);
///
/// assert!(Quantity::new(0).is_err());
/// assert!(Quantity::try_from(-1_i64).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u32")]
pub struct Quantity(NonZeroU32);

impl Quantity {
    /// A single unit.
    pub const ONE: Self = Self(NonZeroU32::MIN);

    /// The largest representable quantity.
    pub const MAX: Self = Self(NonZeroU32::MAX);

    /// Create a quantity from a raw count.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::Zero`] for zero.
    pub fn new(count: u32) -> Result<Self, QuantityError> {
        NonZeroU32::new(count).map(Self).ok_or(QuantityError::Zero)
    }

    /// Get the raw count.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// Add two quantities, or `None` past [`Quantity::MAX`].
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0.get()) {
            Some(sum) => Some(Self(sum)),
            None => None,
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u64> for Quantity {
    type Error = QuantityError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        let count = u32::try_from(value).map_err(|_| QuantityError::TooLarge { got: value })?;
        Self::new(count)
    }
}

impl TryFrom<i64> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        let unsigned = u64::try_from(value).map_err(|_| QuantityError::Negative(value))?;
        Self::try_from(unsigned)
    }
}

impl From<Quantity> for u32 {
    fn from(quantity: Quantity) -> Self {
        quantity.get()
    }
}

impl From<Quantity> for u64 {
    fn from(quantity: Quantity) -> Self {
        Self::from(quantity.get())
    }
}
