//! Shopper authentication against the REST backend.
//!
//! The backend issues a bearer token on login; it is kept in
//! [`TokenStore`] and attached by [`ApiClient`] to every authenticated
//! call. Cart merging after login is the cart session's job, not this
//! module's.

mod token;

pub use token::{TOKEN_KEY, TokenStore};

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::IgnoredAny;
use tracing::{info, instrument};

use shopfront_core::Email;

use crate::api::types::{LoginResponse, RegisterResponse, User};
use crate::api::{Access, ApiClient};
use crate::error::{CartError, Result, clear_sentry_user, set_sentry_user};

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct Registration<'a> {
    email: &'a str,
    password: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
struct ForgotPassword<'a> {
    email: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResetPassword<'a> {
    token: &'a str,
    new_password: &'a str,
}

/// Authentication service.
#[derive(Debug, Clone)]
pub struct AuthService {
    api: ApiClient,
}

impl AuthService {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Whether a bearer token is stored.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.api.tokens().is_present()
    }

    /// Log in with email and password and store the issued token.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Validation` for a malformed email or empty password,
    /// `CartError::Auth` for rejected credentials, and `CartError::Storage` if
    /// the token cannot be saved.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<User> {
        let email = Email::parse(email)?;
        require_password(password)?;

        let response: LoginResponse = self
            .api
            .post(
                "/auth/login",
                &Credentials {
                    email: email.as_str(),
                    password: password.expose_secret(),
                },
                Access::Anonymous,
            )
            .await?;

        self.api.tokens().set(&response.token)?;
        set_sentry_user(&response.user.id, Some(&response.user.email));
        info!(user_id = %response.user.id, "Logged in");

        Ok(response.user)
    }

    /// Create an account. Does not log in.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Validation` for a malformed email, blank name or a
    /// password shorter than [`MIN_PASSWORD_LENGTH`], and `CartError::Server`
    /// if the backend refuses the registration.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        email: &str,
        password: &SecretString,
        name: &str,
    ) -> Result<RegisterResponse> {
        let email = Email::parse(email)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(CartError::Validation("name cannot be empty".to_string()));
        }
        if password.expose_secret().chars().count() < MIN_PASSWORD_LENGTH {
            return Err(CartError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }

        self.api
            .post(
                "/auth/register",
                &Registration {
                    email: email.as_str(),
                    password: password.expose_secret(),
                    name,
                },
                Access::Anonymous,
            )
            .await
    }

    /// Forget the stored token.
    pub fn logout(&self) {
        self.api.tokens().clear();
        clear_sentry_user();
        info!("Logged out");
    }

    /// Fetch the signed-in user.
    ///
    /// A rejected token is removed so later calls see the session as signed out.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Auth` if no token is stored or the backend rejects it.
    #[instrument(skip(self))]
    pub async fn current_user(&self) -> Result<User> {
        match self.api.get::<User>("/auth/me", Access::Required).await {
            Ok(user) => {
                set_sentry_user(&user.id, Some(&user.email));
                Ok(user)
            }
            Err(err @ CartError::Auth(_)) => {
                self.api.tokens().clear();
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Confirm an email address with the token from the verification mail.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Validation` for a blank token and `CartError::Server`
    /// if the backend rejects it.
    #[instrument(skip(self, token))]
    pub async fn verify_email(&self, token: &str) -> Result<()> {
        let token = token.trim();
        if token.is_empty() {
            return Err(CartError::Validation(
                "verification token cannot be empty".to_string(),
            ));
        }
        let path = format!("/auth/verify/{}", urlencoding::encode(token));
        let _: IgnoredAny = self.api.get(&path, Access::Anonymous).await?;
        Ok(())
    }

    /// Ask the backend to mail a password reset link.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Validation` for a malformed email.
    #[instrument(skip(self))]
    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        let email = Email::parse(email)?;
        let _: IgnoredAny = self
            .api
            .post(
                "/auth/forgot-password",
                &ForgotPassword {
                    email: email.as_str(),
                },
                Access::Anonymous,
            )
            .await?;
        Ok(())
    }

    /// Set a new password using a reset token.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Validation` for a blank token or a password shorter
    /// than [`MIN_PASSWORD_LENGTH`].
    #[instrument(skip(self, token, new_password))]
    pub async fn reset_password(&self, token: &str, new_password: &SecretString) -> Result<()> {
        let token = token.trim();
        if token.is_empty() {
            return Err(CartError::Validation(
                "reset token cannot be empty".to_string(),
            ));
        }
        if new_password.expose_secret().chars().count() < MIN_PASSWORD_LENGTH {
            return Err(CartError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }

        let _: IgnoredAny = self
            .api
            .post(
                "/auth/reset-password",
                &ResetPassword {
                    token,
                    new_password: new_password.expose_secret(),
                },
                Access::Anonymous,
            )
            .await?;
        Ok(())
    }
}

fn require_password(password: &SecretString) -> Result<()> {
    if password.expose_secret().is_empty() {
        return Err(CartError::Validation("password cannot be empty".to_string()));
    }
    Ok(())
}
