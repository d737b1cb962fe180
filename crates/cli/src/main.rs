//! Shopfront CLI - shop from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog
//! sf-cli products list --category kitchen
//!
//! # Fill a guest cart
//! sf-cli cart add sku-1 --quantity 2
//! sf-cli cart show
//!
//! # Sign in; the guest cart is merged into the account cart
//! SHOPFRONT_PASSWORD=... sf-cli login -e shopper@example.com
//!
//! # Place the order
//! sf-cli checkout --address "1 Main St, Springfield"
//! ```
//!
//! # Commands
//!
//! - `cart show|add|remove|clear` - Inspect and edit the cart
//! - `login`, `logout`, `whoami`, `register` - Account management
//! - `verify-email`, `password forgot|reset` - Email and password recovery
//! - `products list|show` - Browse the catalog
//! - `checkout` - Place an order for the current cart
//! - `stores list|create|update|products|add-product|update-product` - Retailer back office
//!
//! State (guest cart, bearer token) lives in `SHOPFRONT_DATA_DIR`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shopfront_core::Price;
use shopfront_storefront::backoffice::{NewProduct, NewStore, ProductUpdate, StoreUpdate};
use shopfront_storefront::error::{CartError, report};
use shopfront_storefront::{CheckoutError, ClientConfig};

mod commands;

#[derive(Parser)]
#[command(name = "sf-cli")]
#[command(author, version, about = "Shopfront shopper CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and edit the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Sign in and merge the guest cart into the account cart
    Login {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long, env = "SHOPFRONT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out (the server cart stays on the server)
    Logout,
    /// Show the signed-in account
    Whoami,
    /// Create an account
    Register {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Account password
        #[arg(short, long, env = "SHOPFRONT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Confirm an email address with the token from the verification mail
    VerifyEmail {
        /// Verification token
        token: String,
    },
    /// Recover a forgotten password
    Password {
        #[command(subcommand)]
        action: PasswordAction,
    },
    /// Browse the catalog
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// Place an order for the current cart
    Checkout {
        /// Shipping address
        #[arg(short, long)]
        address: String,

        /// Contact email (required when signed out)
        #[arg(short, long)]
        email: Option<String>,

        /// Contact name (required when signed out)
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Manage your stores and their products
    Stores {
        #[command(subcommand)]
        action: StoresAction,
    },
}

#[derive(Subcommand)]
enum PasswordAction {
    /// Mail a reset link
    Forgot {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
    /// Set a new password with the token from the reset mail
    Reset {
        /// Reset token
        token: String,

        /// New password
        #[arg(short, long, env = "SHOPFRONT_NEW_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart with current prices
    Show,
    /// Add a product
    Add {
        /// Product ID
        product_id: String,

        /// Number of units
        #[arg(short, long, default_value_t = 1, allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a product
    Remove {
        /// Product ID
        product_id: String,
    },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum ProductsAction {
    /// List products
    List {
        /// Only this category
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Show one product
    Show {
        /// Product ID
        product_id: String,
    },
}

#[derive(Subcommand)]
enum StoresAction {
    /// List your stores
    List,
    /// Open a store
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        image_url: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
    },
    /// Change a store's details
    Update {
        /// Store ID
        store_id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        image_url: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
    },
    /// List a store's products
    Products {
        /// Store ID
        store_id: String,
    },
    /// Add a product to a store
    AddProduct {
        /// Store ID
        store_id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        /// Unit price, e.g. 12.50
        #[arg(long)]
        price: Price,
        #[arg(long, allow_negative_numbers = true)]
        stock: i64,
        /// Defaults to "General"
        #[arg(long, default_value = "")]
        category: String,
        #[arg(long)]
        image_url: Option<String>,
        #[arg(long)]
        long_description: Option<String>,
    },
    /// Change a product's details
    UpdateProduct {
        /// Product ID
        product_id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        price: Option<Price>,
        #[arg(long, allow_negative_numbers = true)]
        stock: Option<i64>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        image_url: Option<String>,
        #[arg(long)]
        long_description: Option<String>,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[allow(clippy::print_stderr)]
fn exit_with(message: &str, code: i32) -> ! {
    eprintln!("{message}");
    std::process::exit(code);
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load configuration from environment (needed for Sentry init)
    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => exit_with(&format!("Configuration error: {e}"), 2),
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let sentry_guard = init_sentry(&config);

    // Logs go to stderr so command output stays clean on stdout
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shopfront_storefront=info,shopfront_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli, config).await {
        if let Some(cart_error) = e.downcast_ref::<CartError>() {
            report(cart_error);
        } else if let Some(CheckoutError::Api(cart_error)) = e.downcast_ref::<CheckoutError>() {
            report(cart_error);
        }
        // Flush pending Sentry events; process::exit skips destructors
        drop(sentry_guard);
        exit_with(&format!("Error: {e}"), 1);
    }
}

async fn run(cli: Cli, config: ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = commands::Context::new(config)?;

    match cli.command {
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&ctx).await?,
            CartAction::Add {
                product_id,
                quantity,
            } => commands::cart::add(&ctx, &product_id, quantity).await?,
            CartAction::Remove { product_id } => commands::cart::remove(&ctx, &product_id).await?,
            CartAction::Clear => commands::cart::clear(&ctx).await?,
        },
        Commands::Login { email, password } => {
            commands::account::login(&ctx, &email, password.into()).await?;
        }
        Commands::Logout => commands::account::logout(&ctx),
        Commands::Whoami => commands::account::whoami(&ctx).await?,
        Commands::Register {
            email,
            name,
            password,
        } => commands::account::register(&ctx, &email, &name, password.into()).await?,
        Commands::VerifyEmail { token } => commands::account::verify_email(&ctx, &token).await?,
        Commands::Password { action } => match action {
            PasswordAction::Forgot { email } => {
                commands::account::forgot_password(&ctx, &email).await?;
            }
            PasswordAction::Reset { token, password } => {
                commands::account::reset_password(&ctx, &token, password.into()).await?;
            }
        },
        Commands::Products { action } => match action {
            ProductsAction::List { category } => {
                commands::products::list(&ctx, category.as_deref()).await?;
            }
            ProductsAction::Show { product_id } => {
                commands::products::show(&ctx, &product_id).await?;
            }
        },
        Commands::Checkout {
            address,
            email,
            name,
        } => commands::checkout::place(&ctx, &address, email, name).await?,
        Commands::Stores { action } => run_stores(&ctx, action).await?,
    }
    Ok(())
}

async fn run_stores(ctx: &commands::Context, action: StoresAction) -> Result<(), CartError> {
    match action {
        StoresAction::List => commands::stores::list(ctx).await,
        StoresAction::Create {
            name,
            description,
            image_url,
            phone,
            address,
        } => {
            let store = NewStore {
                name,
                description,
                image_url,
                phone,
                address,
            };
            commands::stores::create(ctx, &store).await
        }
        StoresAction::Update {
            store_id,
            name,
            description,
            image_url,
            phone,
            address,
        } => {
            let changes = StoreUpdate {
                name,
                description,
                image_url,
                phone,
                address,
            };
            commands::stores::update(ctx, &store_id, &changes).await
        }
        StoresAction::Products { store_id } => commands::stores::products(ctx, &store_id).await,
        StoresAction::AddProduct {
            store_id,
            name,
            description,
            price,
            stock,
            category,
            image_url,
            long_description,
        } => {
            let product = NewProduct {
                name,
                description,
                price,
                stock,
                category,
                image_url,
                thumbnail_url: None,
                long_description,
            };
            commands::stores::add_product(ctx, &store_id, &product).await
        }
        StoresAction::UpdateProduct {
            product_id,
            name,
            description,
            price,
            stock,
            category,
            image_url,
            long_description,
        } => {
            let changes = ProductUpdate {
                name,
                description,
                price,
                stock,
                category,
                image_url,
                thumbnail_url: None,
                long_description,
            };
            commands::stores::update_product(ctx, &product_id, &changes).await
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_add_product() {
        let cli = Cli::try_parse_from([
            "sf-cli", "stores", "add-product", "store-1", "--name", "Mug", "--description",
            "Ceramic", "--price", "12.50", "--stock", "4",
        ])
        .unwrap();

        let Commands::Stores {
            action: StoresAction::AddProduct { price, category, .. },
        } = cli.command
        else {
            panic!("expected stores add-product");
        };
        assert_eq!(price, Price::from_cents(1250));
        assert!(category.is_empty());
    }

    #[test]
    fn test_parse_rejects_bad_price() {
        let result = Cli::try_parse_from([
            "sf-cli", "stores", "update-product", "sku-1", "--price", "cheap",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_password_reset() {
        let cli = Cli::try_parse_from([
            "sf-cli", "password", "reset", "reset-1", "--password", "battery staple",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Password {
                action: PasswordAction::Reset { ref token, .. }
            } if token == "reset-1"
        ));
    }
}
