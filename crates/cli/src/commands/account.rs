//! `sf-cli login|logout|whoami|register|verify-email|password`.

use secrecy::SecretString;

use shopfront_storefront::CartError;

use super::Context;
use super::cart::print_cart;

/// Sign in, merge the guest cart and print the account cart.
///
/// # Errors
///
/// Returns a validation error for malformed input, or the backend's refusal.
#[allow(clippy::print_stdout)]
pub async fn login(ctx: &Context, email: &str, password: SecretString) -> Result<(), CartError> {
    let user = ctx.auth.login(email, &password).await?;
    println!("Signed in as {} <{}>", user.name, user.email);

    let session = ctx.session().await;
    print_cart(ctx, &session).await;
    Ok(())
}

/// Forget the stored token.
#[allow(clippy::print_stdout)]
pub fn logout(ctx: &Context) {
    ctx.auth.logout();
    println!("Signed out");
}

/// Print the signed-in account.
///
/// # Errors
///
/// Returns `CartError::Auth` when signed out or the token was rejected.
#[allow(clippy::print_stdout)]
pub async fn whoami(ctx: &Context) -> Result<(), CartError> {
    let user = ctx.auth.current_user().await?;
    println!("{} <{}>", user.name, user.email);
    if !user.email_verified {
        println!("Email address not verified yet");
    }
    Ok(())
}

/// Create an account.
///
/// # Errors
///
/// Returns a validation error for malformed input, or the backend's refusal.
#[allow(clippy::print_stdout)]
pub async fn register(
    ctx: &Context,
    email: &str,
    name: &str,
    password: SecretString,
) -> Result<(), CartError> {
    let account = ctx.auth.register(email, &password, name).await?;
    println!("Created account for {}", account.email);
    println!("Check your inbox to verify the address, then run `sf-cli login`.");
    Ok(())
}

/// Confirm an email address.
///
/// # Errors
///
/// Returns a validation error for a blank token, or the backend's refusal.
#[allow(clippy::print_stdout)]
pub async fn verify_email(ctx: &Context, token: &str) -> Result<(), CartError> {
    ctx.auth.verify_email(token).await?;
    println!("Email address verified");
    Ok(())
}

/// Request a password reset mail.
///
/// # Errors
///
/// Returns a validation error for a malformed email, or the API error.
#[allow(clippy::print_stdout)]
pub async fn forgot_password(ctx: &Context, email: &str) -> Result<(), CartError> {
    ctx.auth.forgot_password(email).await?;
    println!("If an account exists for {email}, a reset link is on its way.");
    Ok(())
}

/// Set a new password with the token from the reset mail.
///
/// # Errors
///
/// Returns a validation error for a blank token or short password, or the
/// backend's refusal.
#[allow(clippy::print_stdout)]
pub async fn reset_password(
    ctx: &Context,
    token: &str,
    new_password: SecretString,
) -> Result<(), CartError> {
    ctx.auth.reset_password(token, &new_password).await?;
    println!("Password updated. Run `sf-cli login` with the new password.");
    Ok(())
}
