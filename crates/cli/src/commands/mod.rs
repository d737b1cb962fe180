//! Command implementations.
//!
//! Each invocation rebuilds the cart session from client storage: a stored
//! token means the shopper is signed in, and any guest lines still on disk
//! are merged into the account cart before the command runs.

pub mod account;
pub mod cart;
pub mod checkout;
pub mod products;
pub mod stores;

use std::sync::Arc;

use shopfront_storefront::cart::{MergeReport, ReconcileOutcome};
use shopfront_storefront::{
    ApiClient, AuthService, CartError, CartSession, CatalogClient, ClientConfig, FileStore,
    GuestCartStore, KeyValueStore, OrderClient, RemoteCartClient, StoreClient,
    StoreProductClient, TokenStore,
};

/// Clients shared by all commands.
pub struct Context {
    pub config: ClientConfig,
    pub auth: AuthService,
    pub catalog: CatalogClient,
    pub orders: OrderClient,
    pub stores: StoreClient,
    pub store_products: StoreProductClient,
    api: ApiClient,
    tokens: TokenStore,
    guest: GuestCartStore,
}

impl Context {
    /// Build the clients over `config.data_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, CartError> {
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(&config.data_dir));
        let tokens = TokenStore::new(Arc::clone(&store));
        let api = ApiClient::new(&config, tokens.clone())?;

        Ok(Self {
            auth: AuthService::new(api.clone()),
            catalog: CatalogClient::new(api.clone(), &config),
            orders: OrderClient::new(api.clone()),
            stores: StoreClient::new(api.clone()),
            store_products: StoreProductClient::new(api.clone()),
            guest: GuestCartStore::new(store),
            config,
            api,
            tokens,
        })
    }

    /// Restore the cart session.
    ///
    /// A token the backend no longer accepts is dropped and the session
    /// continues signed out.
    pub async fn session(&self) -> CartSession<RemoteCartClient> {
        let mut session =
            CartSession::new(self.guest.clone(), RemoteCartClient::new(self.api.clone()));
        if !self.tokens.is_present() {
            return session;
        }

        match session.authenticate().await {
            Some(ReconcileOutcome::Skipped {
                error: CartError::Auth(_),
            }) => {
                tracing::warn!("Stored session expired; continuing as guest");
                self.tokens.clear();
                session.logout();
            }
            Some(ReconcileOutcome::Skipped { error }) => {
                tracing::warn!(error = %error, "Guest cart not merged yet; will retry");
            }
            Some(ReconcileOutcome::Merged(report)) => print_merge(&report),
            None => {}
        }
        session
    }
}

/// Tell the shopper about guest lines that were merged or refused.
#[allow(clippy::print_stdout)]
fn print_merge(report: &MergeReport) {
    if report.attempted == 0 {
        return;
    }
    if report.is_complete() {
        println!(
            "Merged {} product(s) from your guest cart into your account.",
            report.attempted
        );
    } else {
        println!("Some items from your guest cart could not be added:");
        for (product_id, error) in &report.failed {
            println!("  {product_id}: {error}");
        }
    }
}
