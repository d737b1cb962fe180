//! Bearer token persistence.
//!
//! The token is stored as a JSON string, like every other document in client
//! storage.

use std::sync::Arc;

use secrecy::SecretString;
use tracing::warn;

use crate::storage::{KeyValueStore, StorageError};

/// Storage key holding the bearer token.
pub const TOKEN_KEY: &str = "shopfront.auth_token";

/// Reads and writes the bearer token in client storage.
#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The stored token, if any.
    ///
    /// Unreadable storage or a document that is not a JSON string is
    /// treated as signed out.
    #[must_use]
    pub fn get(&self) -> Option<SecretString> {
        let raw = match self.store.get(TOKEN_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "Failed to read auth token");
                return None;
            }
        };

        match serde_json::from_str::<String>(&raw) {
            Ok(token) => Some(token.trim().to_string())
                .filter(|t| !t.is_empty())
                .map(SecretString::from),
            Err(e) => {
                warn!(error = %e, "Stored auth token is not a JSON string; ignoring it");
                None
            }
        }
    }

    /// Persist `token`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the token cannot be written.
    pub fn set(&self, token: &str) -> Result<(), StorageError> {
        let json = serde_json::to_string(token)?;
        self.store.set(TOKEN_KEY, &json)
    }

    /// Remove the stored token. Failures are logged.
    pub fn clear(&self) {
        if let Err(e) = self.store.remove(TOKEN_KEY) {
            warn!(error = %e, "Failed to remove auth token");
        }
    }

    /// Whether a token is stored.
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.get().is_some()
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("present", &self.is_present())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_token_roundtrip() {
        let tokens = TokenStore::new(Arc::new(MemoryStore::new()));
        assert!(!tokens.is_present());

        tokens.set("abc.def").unwrap();
        assert_eq!(tokens.get().unwrap().expose_secret(), "abc.def");

        tokens.clear();
        assert!(tokens.get().is_none());
    }

    #[test]
    fn test_token_stored_as_json_string() {
        let store = Arc::new(MemoryStore::new());
        let tokens = TokenStore::new(store.clone());

        tokens.set("abc\"def").unwrap();

        assert_eq!(
            store.get(TOKEN_KEY).unwrap().as_deref(),
            Some(r#""abc\"def""#)
        );
        assert_eq!(tokens.get().unwrap().expose_secret(), "abc\"def");
    }

    #[test]
    fn test_blank_token_is_absent() {
        let store = Arc::new(MemoryStore::new());
        store.set(TOKEN_KEY, r#""  ""#).unwrap();
        let tokens = TokenStore::new(store);
        assert!(!tokens.is_present());
    }

    #[test]
    fn test_non_json_token_is_absent() {
        let store = Arc::new(MemoryStore::new());
        store.set(TOKEN_KEY, "raw-token").unwrap();
        let tokens = TokenStore::new(store);
        assert!(!tokens.is_present());
    }

    #[test]
    fn test_debug_hides_token() {
        let tokens = TokenStore::new(Arc::new(MemoryStore::new()));
        tokens.set("secret-value").unwrap();
        assert!(!format!("{tokens:?}").contains("secret-value"));
    }
}
