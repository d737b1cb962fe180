//! `sf-cli stores` commands for retailers.

use shopfront_core::{ProductId, StoreId};
use shopfront_storefront::CartError;
use shopfront_storefront::api::types::{Product, Store};
use shopfront_storefront::backoffice::{NewProduct, NewStore, ProductUpdate, StoreUpdate};

use super::Context;

#[allow(clippy::print_stdout)]
fn print_store(store: &Store) {
    println!("{:<16} {}", store.id.as_str(), store.name);
    for (label, value) in [
        ("Description", &store.description),
        ("Phone", &store.phone),
        ("Address", &store.address),
    ] {
        if let Some(value) = value {
            println!("  {label}: {value}");
        }
    }
}

#[allow(clippy::print_stdout)]
fn print_product(product: &Product) {
    println!(
        "{:<16} {:<32} {:>10}  {:<12} stock {}",
        product.id.as_str(),
        product.name,
        product.price.to_string(),
        product.category,
        product.stock
    );
}

/// Print the signed-in user's stores.
///
/// # Errors
///
/// Returns `CartError::Auth` when signed out, or the API error.
#[allow(clippy::print_stdout)]
pub async fn list(ctx: &Context) -> Result<(), CartError> {
    let stores = ctx.stores.list_mine().await?;
    if stores.is_empty() {
        println!("You have no stores yet");
    }
    stores.iter().for_each(print_store);
    Ok(())
}

/// Open a store.
///
/// # Errors
///
/// Returns a validation error for a blank name, or the API error.
#[allow(clippy::print_stdout)]
pub async fn create(ctx: &Context, store: &NewStore) -> Result<(), CartError> {
    let created = ctx.stores.create(store).await?;
    println!("Created store");
    print_store(&created);
    Ok(())
}

/// Change a store's details.
///
/// # Errors
///
/// Returns a validation error for an empty update, or the API error.
#[allow(clippy::print_stdout)]
pub async fn update(ctx: &Context, store_id: &str, changes: &StoreUpdate) -> Result<(), CartError> {
    let id = StoreId::parse(store_id)?;
    let updated = ctx.stores.update(&id, changes).await?;
    println!("Updated store");
    print_store(&updated);
    Ok(())
}

/// Print a store's products.
///
/// # Errors
///
/// Returns a validation error for a blank ID, or the API error.
#[allow(clippy::print_stdout)]
pub async fn products(ctx: &Context, store_id: &str) -> Result<(), CartError> {
    let id = StoreId::parse(store_id)?;
    let products = ctx.store_products.list(&id).await?;
    if products.is_empty() {
        println!("No products in this store");
    }
    products.iter().for_each(print_product);
    Ok(())
}

/// Add a product to a store.
///
/// # Errors
///
/// Returns a validation error for an invalid product, or the API error.
#[allow(clippy::print_stdout)]
pub async fn add_product(
    ctx: &Context,
    store_id: &str,
    product: &NewProduct,
) -> Result<(), CartError> {
    let id = StoreId::parse(store_id)?;
    let created = ctx.store_products.create(&id, product).await?;
    println!("Created product");
    print_product(&created);
    Ok(())
}

/// Change a product's details.
///
/// # Errors
///
/// Returns a validation error for an empty or invalid update, or the API
/// error.
#[allow(clippy::print_stdout)]
pub async fn update_product(
    ctx: &Context,
    product_id: &str,
    changes: &ProductUpdate,
) -> Result<(), CartError> {
    let id = ProductId::parse(product_id)?;
    let updated = ctx.store_products.update(&id, changes).await?;
    println!("Updated product");
    print_product(&updated);
    Ok(())
}
