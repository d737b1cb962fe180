//! `sf-cli products` commands.

use shopfront_core::ProductId;
use shopfront_storefront::CartError;

use super::Context;

/// Print the catalog, optionally for one category.
///
/// # Errors
///
/// Returns an error if the API request fails.
#[allow(clippy::print_stdout)]
pub async fn list(ctx: &Context, category: Option<&str>) -> Result<(), CartError> {
    let products = ctx.catalog.list(category).await?;
    if products.is_empty() {
        println!("No products found");
        return Ok(());
    }

    for product in products.iter() {
        let stock = if product.in_stock() {
            format!("{} in stock", product.stock)
        } else {
            "out of stock".to_string()
        };
        println!(
            "{:<16} {:<32} {:>10}  {}",
            product.id.as_str(),
            product.name,
            product.price.to_string(),
            stock
        );
    }
    Ok(())
}

/// Print one product.
///
/// # Errors
///
/// Returns a validation error for a blank ID, or the API error.
#[allow(clippy::print_stdout)]
pub async fn show(ctx: &Context, product_id: &str) -> Result<(), CartError> {
    let id = ProductId::parse(product_id)?;
    let product = ctx.catalog.get(&id).await?;

    println!("{} ({})", product.name, product.id);
    println!("Price:    {}", product.price);
    println!("Category: {}", product.category);
    println!("Stock:    {}", product.stock);
    if let Some(image) = product.thumbnail() {
        println!("Image:    {image}");
    }
    println!();
    println!(
        "{}",
        product
            .long_description
            .as_deref()
            .unwrap_or(&product.description)
    );
    Ok(())
}
