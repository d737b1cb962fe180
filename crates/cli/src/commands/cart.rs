//! `sf-cli cart` commands.

use chrono::Utc;

use shopfront_storefront::cart::CartView;
use shopfront_storefront::{CartError, CartSession, RemoteCart};

use super::Context;

/// Print the cart with current catalog prices.
///
/// # Errors
///
/// Returns an error if the signed-in cart cannot be loaded.
pub async fn show(ctx: &Context) -> Result<(), CartError> {
    let mut session = ctx.session().await;
    if session.is_authenticated() && session.cart().is_none() {
        // Login-time fetch failed; retry so the error reaches the shopper
        session.refresh().await?;
    }
    print_cart(ctx, &session).await;
    Ok(())
}

/// Add a product and print the cart.
///
/// # Errors
///
/// Returns a validation error for a bad product ID or quantity, or the
/// server error while signed in.
pub async fn add(ctx: &Context, product_id: &str, quantity: i64) -> Result<(), CartError> {
    let mut session = ctx.session().await;
    session.add_to_cart(product_id, quantity).await?;
    tracing::info!(product_id, quantity, "Added to cart");
    print_cart(ctx, &session).await;
    Ok(())
}

/// Remove a product and print the cart.
///
/// # Errors
///
/// Returns a validation error for a blank product ID, or the server error
/// while signed in.
pub async fn remove(ctx: &Context, product_id: &str) -> Result<(), CartError> {
    let mut session = ctx.session().await;
    session.remove_from_cart(product_id).await?;
    print_cart(ctx, &session).await;
    Ok(())
}

/// Empty the guest cart, or reload the account cart.
///
/// # Errors
///
/// Returns the server error while signed in.
pub async fn clear(ctx: &Context) -> Result<(), CartError> {
    let mut session = ctx.session().await;
    session.clear().await?;
    print_cart(ctx, &session).await;
    Ok(())
}

#[allow(clippy::print_stdout)]
pub(super) async fn print_cart<R: RemoteCart>(ctx: &Context, session: &CartSession<R>) {
    let view: CartView = session.view(Utc::now());
    let owner = if session.is_authenticated() {
        "Account cart"
    } else {
        "Guest cart"
    };

    let Some(cart) = session.cart() else {
        println!("{owner}: empty");
        return;
    };

    println!("{owner} ({} items)", view.item_count);
    let priced = ctx.catalog.price_cart(cart).await;
    for line in &priced.lines {
        println!(
            "  {:<24} x{:<4} {:>10}",
            line.product.name,
            line.quantity.get(),
            line.line_total.to_string()
        );
    }
    for product_id in &priced.missing {
        if let Some(quantity) = cart.quantity_of(product_id) {
            println!(
                "  {:<24} x{:<4} {:>10}",
                product_id.as_str(),
                quantity.get(),
                "(unavailable)"
            );
        }
    }
    println!("  {:<24} {:>16}", "Total", priced.total.to_string());

    if let Some(label) = view.countdown_label(ctx.config.show_cart_timer) {
        println!("{label}");
    }
}
