//! `sf-cli checkout`.

use shopfront_storefront::{CheckoutError, GuestContact};

use super::Context;

/// Place an order for the current cart.
///
/// # Errors
///
/// Returns a validation error for missing details, or the API error.
#[allow(clippy::print_stdout)]
pub async fn place(
    ctx: &Context,
    address: &str,
    email: Option<String>,
    name: Option<String>,
) -> Result<(), CheckoutError> {
    let mut session = ctx.session().await;

    let guest = (email.is_some() || name.is_some()).then(|| GuestContact {
        email: email.unwrap_or_default(),
        name: name.unwrap_or_default(),
    });

    let order = session.checkout(&ctx.orders, address, guest).await?;

    println!("Order {} placed ({})", order.id, order.status);
    for item in &order.items {
        println!(
            "  {:<24} x{:<4} {:>10}",
            item.product_name,
            item.quantity,
            item.subtotal.to_string()
        );
    }
    println!("  {:<24} {:>16}", "Total", order.total.to_string());
    println!("Ships to: {}", order.shipping_address);
    Ok(())
}
