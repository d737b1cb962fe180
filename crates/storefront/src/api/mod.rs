//! HTTP client for the storefront REST backend.
//!
//! Every endpoint answers with the [`ApiResponse`] envelope. [`ApiClient`]
//! unwraps it, attaches the bearer token when the call needs one and tags
//! each request with an `x-request-id` so backend logs can be correlated.

pub mod types;

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::auth::TokenStore;
use crate::config::ClientConfig;
use crate::error::{CartError, Result};

pub use types::{ApiErrorBody, ApiResponse};

/// Header carrying the per-request correlation ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Whether a call sends the stored bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Never send a token (login, register, password reset).
    Anonymous,
    /// Send the token if one is stored.
    Optional,
    /// Fail with [`CartError::Auth`] before any I/O if no token is stored.
    Required,
}

// =============================================================================
// ApiClient
// =============================================================================

/// Shared client for the REST backend.
///
/// Cheap to clone; clones share the connection pool and token store.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    base_url: String,
    tokens: TokenStore,
}

impl ApiClient {
    /// Create a client for `config.api_url`.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Network` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig, tokens: TokenStore) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                http,
                base_url: config.api_url.clone(),
                tokens,
            }),
        })
    }

    /// Backend base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Token store used for authenticated calls.
    #[must_use]
    pub fn tokens(&self) -> &TokenStore {
        &self.inner.tokens
    }

    /// `GET {base}{path}`.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::execute`].
    pub async fn get<T: DeserializeOwned>(&self, path: &str, access: Access) -> Result<T> {
        let builder = self.request(Method::GET, path, access)?;
        self.execute(builder, &Method::GET, path).await
    }

    /// `POST {base}{path}` with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::execute`].
    pub async fn post<B, T>(&self, path: &str, body: &B, access: Access) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::POST, path, access)?.json(body);
        self.execute(builder, &Method::POST, path).await
    }

    /// `PUT {base}{path}` with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::execute`].
    pub async fn put<B, T>(&self, path: &str, body: &B, access: Access) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::PUT, path, access)?.json(body);
        self.execute(builder, &Method::PUT, path).await
    }

    /// `DELETE {base}{path}` with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::execute`].
    pub async fn delete<B, T>(&self, path: &str, body: &B, access: Access) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::DELETE, path, access)?.json(body);
        self.execute(builder, &Method::DELETE, path).await
    }

    fn request(&self, method: Method, path: &str, access: Access) -> Result<RequestBuilder> {
        let token = match access {
            Access::Anonymous => None,
            Access::Optional => self.inner.tokens.get(),
            Access::Required => Some(
                self.inner
                    .tokens
                    .get()
                    .ok_or_else(|| CartError::Auth("not authenticated".to_string()))?,
            ),
        };

        let url = format!("{}{path}", self.inner.base_url);
        let mut builder = self
            .inner
            .http
            .request(method, url)
            .header(REQUEST_ID_HEADER, Uuid::new_v4().to_string());

        if let Some(token) = token {
            builder = builder.bearer_auth(token.expose_secret());
        }

        Ok(builder)
    }

    /// Send a request and unwrap the response envelope.
    ///
    /// # Errors
    ///
    /// - `CartError::Network` if the request cannot be sent or the body read
    /// - `CartError::Auth` on HTTP 401
    /// - `CartError::Server` on any other failure status, a `success: false`
    ///   envelope, or a body that is not the expected JSON
    #[instrument(skip(self, builder, method), fields(method = %method))]
    async fn execute<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        method: &Method,
        path: &str,
    ) -> Result<T> {
        let response = builder.send().await?;
        let status = response.status();

        // Get response body as text first for better error diagnostics
        let body = response.text().await?;

        let envelope: ApiResponse<serde_json::Value> = if body.trim().is_empty() {
            ApiResponse {
                success: status.is_success(),
                data: None,
                error: None,
                message: None,
            }
        } else {
            match serde_json::from_str(&body) {
                Ok(envelope) => envelope,
                Err(_) if status == StatusCode::UNAUTHORIZED => {
                    return Err(CartError::Auth("not authenticated".to_string()));
                }
                Err(e) => {
                    tracing::error!(
                        status = %status,
                        error = %e,
                        body = %body.chars().take(500).collect::<String>(),
                        "Failed to parse API response"
                    );
                    return Err(CartError::server(status, "invalid response body"));
                }
            }
        };

        if status == StatusCode::UNAUTHORIZED {
            debug!(status = %status, "API rejected credentials");
            return Err(CartError::Auth(envelope.failure_message()));
        }

        if !status.is_success() || !envelope.success {
            let message = envelope.failure_message();
            tracing::error!(
                status = %status,
                message = %message,
                "API request failed"
            );
            return Err(CartError::server(status, message));
        }

        let data = envelope.data.unwrap_or(serde_json::Value::Null);
        serde_json::from_value(data).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "API payload did not match the expected shape"
            );
            CartError::server(status, "invalid response body")
        })
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn client() -> ApiClient {
        let config = ClientConfig::for_api("http://127.0.0.1:9/api").unwrap();
        let tokens = TokenStore::new(Arc::new(MemoryStore::new()));
        ApiClient::new(&config, tokens).unwrap()
    }

    #[tokio::test]
    async fn test_required_access_without_token_fails_before_io() {
        let api = client();
        let result: Result<serde_json::Value> = api.get("/cart/me", Access::Required).await;
        assert!(matches!(result, Err(CartError::Auth(msg)) if msg == "not authenticated"));
    }

    #[test]
    fn test_request_attaches_request_id_and_token() {
        let api = client();
        api.tokens().set("tok-123").unwrap();

        let request = api
            .request(Method::GET, "/cart/me", Access::Required)
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(request.url().as_str(), "http://127.0.0.1:9/api/cart/me");
        let request_id = request.headers().get(REQUEST_ID_HEADER).unwrap();
        assert!(Uuid::parse_str(request_id.to_str().unwrap()).is_ok());
        assert_eq!(
            request.headers().get("authorization").unwrap(),
            "Bearer tok-123"
        );
    }

    #[test]
    fn test_anonymous_request_omits_token() {
        let api = client();
        api.tokens().set("tok-123").unwrap();

        let request = api
            .request(Method::POST, "/auth/login", Access::Anonymous)
            .unwrap()
            .build()
            .unwrap();
        assert!(request.headers().get("authorization").is_none());
    }
}
