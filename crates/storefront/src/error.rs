//! Unified error handling with Sentry integration.
//!
//! Every client operation returns `Result<T, CartError>`. Transport and
//! backend failures can be reported to Sentry with [`report`]; input and
//! credential problems are the shopper's to fix and are never reported.

use reqwest::StatusCode;
use thiserror::Error;

use shopfront_core::{EmailError, IdError, QuantityError};

use crate::storage::StorageError;

/// Error type for cart, auth, catalog and order operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Bad input, rejected before any I/O.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing or rejected credential.
    #[error("Auth error: {0}")]
    Auth(String),

    /// Transport failure (connect, timeout, TLS, ...).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Backend answered with a failure envelope or an unreadable body.
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// A credential could not be persisted.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// A login merge is still running for this session.
    #[error("Cart reconciliation in progress")]
    Reconciling,
}

impl CartError {
    /// Build a server error from an HTTP status and message.
    #[must_use]
    pub fn server(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Server {
            status: status.as_u16(),
            message: message.into(),
        }
    }

    /// Whether this error indicates a fault outside the shopper's control.
    #[must_use]
    pub const fn is_reportable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Server { .. } | Self::Storage(_)
        )
    }
}

impl From<QuantityError> for CartError {
    fn from(err: QuantityError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<IdError> for CartError {
    fn from(err: IdError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<EmailError> for CartError {
    fn from(err: EmailError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Result type alias for `CartError`.
pub type Result<T> = std::result::Result<T, CartError>;

/// Capture a reportable error to Sentry and log it.
///
/// Validation, auth and reconciliation errors are logged at debug level only.
pub fn report(err: &CartError) {
    if err.is_reportable() {
        let event_id = sentry::capture_error(err);
        tracing::error!(
            error = %err,
            sentry_event_id = %event_id,
            "Request error"
        );
    } else {
        tracing::debug!(error = %err, "Request rejected");
    }
}

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for shopper actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of cart
/// actions leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "sku-1")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_error_display() {
        let err = CartError::Validation("quantity must be a positive integer (got 0)".to_string());
        assert_eq!(
            err.to_string(),
            "Validation error: quantity must be a positive integer (got 0)"
        );

        let err = CartError::server(StatusCode::BAD_REQUEST, "Product out of stock");
        assert_eq!(err.to_string(), "Server error (400): Product out of stock");
    }

    #[test]
    fn test_reportable_errors() {
        assert!(CartError::server(StatusCode::BAD_GATEWAY, "down").is_reportable());
        assert!(
            CartError::Storage(StorageError::Unavailable("quota".to_string())).is_reportable()
        );
        assert!(!CartError::Validation("bad".to_string()).is_reportable());
        assert!(!CartError::Auth("no token".to_string()).is_reportable());
        assert!(!CartError::Reconciling.is_reportable());
    }

    #[test]
    fn test_quantity_error_maps_to_validation() {
        let err: CartError = QuantityError::Zero.into();
        assert!(matches!(err, CartError::Validation(_)));
    }

    #[test]
    fn test_id_error_maps_to_validation() {
        let err: CartError = IdError::Empty.into();
        assert!(matches!(err, CartError::Validation(msg) if msg == "id cannot be empty"));
    }
}
