//! End-to-end tests for the Shopfront client.
//!
//! [`FakeBackend`] serves the storefront REST API from an in-process `axum`
//! router on an ephemeral port, with just enough behavior to exercise the
//! real reqwest clients: bearer tokens, password resets, per-user carts, a
//! small catalog, orders and the retailer back office. Knobs on the backend
//! simulate outages and stock rejections.
//!
//! [`Shopper`] wires the client library over a temporary data directory, so
//! each test gets its own guest cart and token file.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopfront-integration-tests
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::{Duration, Utc};
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::{Value, json};
use tempfile::TempDir;

use shopfront_storefront::api::types::User;
use shopfront_storefront::{
    ApiClient, AuthService, CartError, CartSession, CatalogClient, ClientConfig, FileStore,
    GuestCartStore, KeyValueStore, OrderClient, RemoteCartClient, StoreClient,
    StoreProductClient, TokenStore,
};

// =============================================================================
// Fake Backend
// =============================================================================

#[derive(Debug, Clone)]
struct Account {
    id: String,
    email: String,
    password: String,
    name: String,
}

#[derive(Debug, Clone)]
struct Listing {
    store_id: String,
    name: String,
    description: String,
    price: f64,
    stock: i64,
    category: String,
    image_url: Option<String>,
    thumbnail_url: Option<String>,
    long_description: Option<String>,
}

#[derive(Debug, Default)]
struct BackendState {
    accounts: Vec<Account>,
    sessions: HashMap<String, String>,
    reset_tokens: HashMap<String, String>,
    stores: Vec<Value>,
    carts: HashMap<String, BTreeMap<String, u32>>,
    products: BTreeMap<String, Listing>,
    orders: Vec<Value>,
    out_of_stock: HashSet<String>,
    unavailable: bool,
    cart_ttl: Option<Duration>,
    hits: HashMap<String, usize>,
    next_id: u64,
}

impl BackendState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn cart_json(&self, user_id: &str) -> Value {
        let items: Vec<Value> = self
            .carts
            .get(user_id)
            .map(|lines| {
                lines
                    .iter()
                    .map(|(product_id, quantity)| {
                        json!({ "productId": product_id, "quantity": quantity })
                    })
                    .collect()
            })
            .unwrap_or_default();
        let now = Utc::now();

        json!({
            "id": format!("cart-{user_id}"),
            "userId": user_id,
            "items": items,
            "updatedAt": now.to_rfc3339(),
            "expiresAt": self.cart_ttl.map(|ttl| (now + ttl).to_rfc3339()),
        })
    }

    fn product_json(id: &str, listing: &Listing) -> Value {
        json!({
            "id": id,
            "storeId": listing.store_id,
            "name": listing.name,
            "description": listing.description,
            "price": listing.price,
            "stock": listing.stock,
            "category": listing.category,
            "createdAt": "2026-01-01T00:00:00Z",
            "imageUrl": listing.image_url,
            "thumbnailUrl": listing.thumbnail_url,
            "longDescription": listing.long_description,
        })
    }

    fn user_json(account: &Account) -> Value {
        json!({
            "id": account.id,
            "email": account.email,
            "name": account.name,
            "emailVerified": true,
            "status": "active",
        })
    }

    fn user_for(&self, headers: &HeaderMap) -> Result<String, Response> {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .and_then(|token| self.sessions.get(token))
            .cloned()
            .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "Invalid or expired token"))
    }

    /// Index of `store_id` if `user_id` owns it.
    fn owned_store(&self, user_id: &str, store_id: &str) -> Result<usize, Response> {
        let (index, store) = self
            .stores
            .iter()
            .enumerate()
            .find(|(_, store)| store["id"] == store_id)
            .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Store not found"))?;
        if store["ownerId"] != user_id {
            return Err(fail(StatusCode::FORBIDDEN, "You do not own this store"));
        }
        Ok(index)
    }
}

/// In-process storefront backend.
///
/// Dropping the value stops the server.
pub struct FakeBackend {
    state: Arc<Mutex<BackendState>>,
    url: String,
    server: tokio::task::JoinHandle<()>,
}

impl FakeBackend {
    /// Start the backend on `127.0.0.1` with an ephemeral port.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start() -> Self {
        let state = Arc::new(Mutex::new(BackendState::default()));
        let app = router(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake backend");
        let addr = listener.local_addr().expect("Failed to read local address");
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            state,
            url: format!("http://{addr}/api"),
            server,
        }
    }

    /// Base URL clients should be configured with.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    fn lock(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an account and return its user ID.
    pub fn add_account(&self, email: &str, password: &str, name: &str) -> String {
        let mut state = self.lock();
        let id = state.next_id("user");
        state.accounts.push(Account {
            id: id.clone(),
            email: email.to_string(),
            password: password.to_string(),
            name: name.to_string(),
        });
        id
    }

    /// Add a product to the catalog. `price` is in dollars.
    pub fn add_product(&self, id: &str, name: &str, price: f64, stock: i64, category: &str) {
        self.lock().products.insert(
            id.to_string(),
            Listing {
                store_id: "store-1".to_string(),
                name: name.to_string(),
                description: format!("{name} description"),
                price,
                stock,
                category: category.to_string(),
                image_url: None,
                thumbnail_url: Some(format!("/images/{id}.png")),
                long_description: None,
            },
        );
    }

    /// Open a store owned by `owner_id` and return its ID.
    pub fn add_store(&self, owner_id: &str, name: &str) -> String {
        let mut state = self.lock();
        let id = state.next_id("store");
        state.stores.push(json!({
            "id": id,
            "ownerId": owner_id,
            "name": name,
            "createdAt": Utc::now().to_rfc3339(),
        }));
        id
    }

    /// The pending password reset token mailed to `email`, if any.
    #[must_use]
    pub fn reset_token(&self, email: &str) -> Option<String> {
        let state = self.lock();
        let user_id = &state.accounts.iter().find(|a| a.email == email)?.id;
        state
            .reset_tokens
            .iter()
            .find(|(_, owner)| *owner == user_id)
            .map(|(token, _)| token.clone())
    }

    /// Replace a user's server cart.
    pub fn set_cart(&self, user_id: &str, lines: &[(&str, u32)]) {
        let lines = lines
            .iter()
            .map(|(product_id, quantity)| ((*product_id).to_string(), *quantity))
            .collect();
        self.lock().carts.insert(user_id.to_string(), lines);
    }

    /// A user's server cart as `(product_id, quantity)` pairs, sorted by product.
    #[must_use]
    pub fn cart(&self, user_id: &str) -> Vec<(String, u32)> {
        self.lock()
            .carts
            .get(user_id)
            .map(|lines| lines.iter().map(|(id, q)| (id.clone(), *q)).collect())
            .unwrap_or_default()
    }

    /// Make every endpoint answer 503.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Refuse `POST /cart` for a product with 400 "Product out of stock".
    pub fn mark_out_of_stock(&self, product_id: &str) {
        self.lock().out_of_stock.insert(product_id.to_string());
    }

    /// Give server carts an expiration `ttl` from now.
    pub fn set_cart_ttl(&self, ttl: Duration) {
        self.lock().cart_ttl = Some(ttl);
    }

    /// Invalidate every issued token.
    pub fn revoke_sessions(&self) {
        self.lock().sessions.clear();
    }

    /// Orders placed so far.
    #[must_use]
    pub fn orders(&self) -> Vec<Value> {
        self.lock().orders.clone()
    }

    /// How many times `METHOD /path` was requested, e.g. `"POST /cart"`.
    #[must_use]
    pub fn hits(&self, route: &str) -> usize {
        self.lock().hits.get(route).copied().unwrap_or(0)
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

type Shared = Arc<Mutex<BackendState>>;

fn router(state: Shared) -> Router {
    let api = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/me", get(me))
        .route("/auth/verify/{token}", get(verify_email))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
        .route("/cart/me", get(cart_me))
        .route("/cart", post(cart_add))
        .route("/cart/item", delete(cart_remove))
        .route("/products", get(list_products))
        .route("/products/{id}", get(get_product))
        .route("/orders", post(create_order))
        .route("/orders/{id}", get(get_order))
        .route("/stores/mine", get(my_stores))
        .route("/stores", post(create_store))
        .route("/stores/{id}", put(update_store))
        .route(
            "/backoffice/stores/{id}/products",
            get(store_products).post(create_store_product),
        )
        .route("/backoffice/products/{id}", put(update_store_product))
        .route("/backoffice/uploads/products", post(upload_product_image))
        .layer(middleware::from_fn_with_state(Arc::clone(&state), gate))
        .with_state(state);

    Router::new().nest("/api", api)
}

fn lock(state: &Shared) -> MutexGuard<'_, BackendState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn ok(data: Value) -> Response {
    Json(json!({ "success": true, "data": data })).into_response()
}

fn fail(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({
            "success": false,
            "error": { "message": message, "statusCode": status.as_u16() },
        })),
    )
        .into_response()
}

/// Count the request and short-circuit with 503 during a simulated outage.
async fn gate(State(state): State<Shared>, request: Request, next: Next) -> Response {
    let route = format!(
        "{} {}",
        request.method(),
        request.uri().path().trim_start_matches("/api")
    );
    let unavailable = {
        let mut state = lock(&state);
        *state.hits.entry(route).or_default() += 1;
        state.unavailable
    };

    if unavailable {
        return fail(StatusCode::SERVICE_UNAVAILABLE, "Service unavailable");
    }
    next.run(request).await
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

async fn login(State(state): State<Shared>, Json(body): Json<Credentials>) -> Response {
    let mut state = lock(&state);
    let Some(account) = state
        .accounts
        .iter()
        .find(|a| a.email == body.email && a.password == body.password)
        .cloned()
    else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "message": "Invalid credentials" })),
        )
            .into_response();
    };

    let token = state.next_id("token");
    state.sessions.insert(token.clone(), account.id.clone());
    ok(json!({ "token": token, "user": BackendState::user_json(&account) }))
}

#[derive(Deserialize)]
struct Registration {
    email: String,
    password: String,
    name: String,
}

async fn register(State(state): State<Shared>, Json(body): Json<Registration>) -> Response {
    let mut state = lock(&state);
    if state.accounts.iter().any(|a| a.email == body.email) {
        return fail(StatusCode::CONFLICT, "Email already registered");
    }
    let id = state.next_id("user");
    state.accounts.push(Account {
        id: id.clone(),
        email: body.email.clone(),
        password: body.password,
        name: body.name.clone(),
    });
    (
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": { "id": id, "email": body.email, "name": body.name },
        })),
    )
        .into_response()
}

async fn me(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let state = lock(&state);
    let user_id = match state.user_for(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    state
        .accounts
        .iter()
        .find(|a| a.id == user_id)
        .map_or_else(
            || fail(StatusCode::NOT_FOUND, "User not found"),
            |account| ok(BackendState::user_json(account)),
        )
}

async fn verify_email(Path(token): Path<String>) -> Response {
    if token == "valid-token" {
        ok(json!({ "message": "Email verified" }))
    } else {
        fail(StatusCode::BAD_REQUEST, "Invalid verification token")
    }
}

#[derive(Deserialize)]
struct ForgotPassword {
    email: String,
}

async fn forgot_password(
    State(state): State<Shared>,
    Json(body): Json<ForgotPassword>,
) -> Response {
    let mut state = lock(&state);
    let user_id = state
        .accounts
        .iter()
        .find(|a| a.email == body.email)
        .map(|a| a.id.clone());
    if let Some(user_id) = user_id {
        let token = state.next_id("reset");
        state.reset_tokens.insert(token, user_id);
    }
    ok(json!({ "message": "If the email exists, a reset link has been sent" }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResetPassword {
    token: String,
    new_password: String,
}

async fn reset_password(
    State(state): State<Shared>,
    Json(body): Json<ResetPassword>,
) -> Response {
    let mut state = lock(&state);
    let Some(user_id) = state.reset_tokens.remove(&body.token) else {
        return fail(StatusCode::BAD_REQUEST, "Invalid or expired reset token");
    };
    if let Some(account) = state.accounts.iter_mut().find(|a| a.id == user_id) {
        account.password = body.new_password;
    }
    ok(json!({ "message": "Password has been reset" }))
}

async fn cart_me(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let state = lock(&state);
    match state.user_for(&headers) {
        Ok(user_id) => ok(state.cart_json(&user_id)),
        Err(response) => response,
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddItem {
    product_id: String,
    quantity: u32,
}

async fn cart_add(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<AddItem>,
) -> Response {
    let mut state = lock(&state);
    let user_id = match state.user_for(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    if !state.products.contains_key(&body.product_id) {
        return fail(StatusCode::NOT_FOUND, "Product not found");
    }
    if state.out_of_stock.contains(&body.product_id) {
        return fail(StatusCode::BAD_REQUEST, "Product out of stock");
    }

    *state
        .carts
        .entry(user_id.clone())
        .or_default()
        .entry(body.product_id)
        .or_default() += body.quantity;
    ok(state.cart_json(&user_id))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoveItem {
    product_id: String,
}

async fn cart_remove(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<RemoveItem>,
) -> Response {
    let mut state = lock(&state);
    let user_id = match state.user_for(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    if let Some(lines) = state.carts.get_mut(&user_id) {
        lines.remove(&body.product_id);
    }
    ok(state.cart_json(&user_id))
}

#[derive(Deserialize)]
struct ProductFilter {
    category: Option<String>,
}

async fn list_products(
    State(state): State<Shared>,
    Query(filter): Query<ProductFilter>,
) -> Response {
    let state = lock(&state);
    let products: Vec<Value> = state
        .products
        .iter()
        .filter(|(_, listing)| {
            filter
                .category
                .as_deref()
                .is_none_or(|category| listing.category == category)
        })
        .map(|(id, listing)| BackendState::product_json(id, listing))
        .collect();
    ok(Value::Array(products))
}

async fn get_product(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let state = lock(&state);
    state.products.get(&id).map_or_else(
        || fail(StatusCode::NOT_FOUND, "Product not found"),
        |listing| ok(BackendState::product_json(&id, listing)),
    )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewOrder {
    items: Vec<AddItem>,
    shipping_address: String,
    guest_email: Option<String>,
    guest_name: Option<String>,
}

async fn create_order(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<NewOrder>,
) -> Response {
    let mut state = lock(&state);
    let user_id = if body.guest_email.is_some() {
        None
    } else {
        match state.user_for(&headers) {
            Ok(id) => Some(id),
            Err(response) => return response,
        }
    };

    let mut lines = Vec::new();
    let mut total = 0.0;
    for item in &body.items {
        let Some(listing) = state.products.get(&item.product_id) else {
            return fail(StatusCode::BAD_REQUEST, "Product not found");
        };
        let subtotal = listing.price * f64::from(item.quantity);
        total += subtotal;
        lines.push(json!({
            "productId": item.product_id,
            "productName": listing.name,
            "quantity": item.quantity,
            "price": listing.price,
            "subtotal": subtotal,
        }));
    }

    let id = state.next_id("order");
    let order = json!({
        "id": id,
        "userId": user_id,
        "items": lines,
        "total": total,
        "status": "pending",
        "createdAt": Utc::now().to_rfc3339(),
        "shippingAddress": body.shipping_address,
        "guestEmail": body.guest_email,
        "guestName": body.guest_name,
    });
    state.orders.push(order.clone());
    if let Some(user_id) = &user_id {
        state.carts.remove(user_id);
    }

    (
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": order })),
    )
        .into_response()
}

async fn get_order(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let state = lock(&state);
    state
        .orders
        .iter()
        .find(|order| order.get("id").and_then(Value::as_str) == Some(id.as_str()))
        .cloned()
        .map_or_else(|| fail(StatusCode::NOT_FOUND, "Order not found"), ok)
}

// =============================================================================
// Back Office Handlers
// =============================================================================

const STORE_FIELDS: [&str; 5] = ["name", "description", "imageUrl", "phone", "address"];

/// Copy the non-null `fields` of `changes` onto `target`.
fn patch(target: &mut Value, changes: &Value, fields: &[&str]) {
    for field in fields {
        if let Some(value) = changes.get(*field).filter(|v| !v.is_null()) {
            target[*field] = value.clone();
        }
    }
}

async fn my_stores(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let state = lock(&state);
    let user_id = match state.user_for(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let stores: Vec<Value> = state
        .stores
        .iter()
        .filter(|store| store["ownerId"] == user_id.as_str())
        .cloned()
        .collect();
    ok(Value::Array(stores))
}

async fn create_store(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = lock(&state);
    let user_id = match state.user_for(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    if body["name"].as_str().is_none_or(|name| name.trim().is_empty()) {
        return fail(StatusCode::BAD_REQUEST, "Name is required");
    }

    let mut store = json!({
        "id": state.next_id("store"),
        "ownerId": user_id,
        "createdAt": Utc::now().to_rfc3339(),
    });
    patch(&mut store, &body, &STORE_FIELDS);
    state.stores.push(store.clone());
    (
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": store })),
    )
        .into_response()
}

async fn update_store(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut state = lock(&state);
    let index = match state
        .user_for(&headers)
        .and_then(|user_id| state.owned_store(&user_id, &id))
    {
        Ok(index) => index,
        Err(response) => return response,
    };
    let Some(store) = state.stores.get_mut(index) else {
        return fail(StatusCode::NOT_FOUND, "Store not found");
    };
    patch(store, &body, &STORE_FIELDS);
    ok(store.clone())
}

async fn store_products(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let state = lock(&state);
    if let Err(response) = state
        .user_for(&headers)
        .and_then(|user_id| state.owned_store(&user_id, &id))
    {
        return response;
    }
    let products: Vec<Value> = state
        .products
        .iter()
        .filter(|(_, listing)| listing.store_id == id)
        .map(|(product_id, listing)| BackendState::product_json(product_id, listing))
        .collect();
    ok(Value::Array(products))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListingFields {
    name: Option<String>,
    description: Option<String>,
    price: Option<f64>,
    stock: Option<i64>,
    category: Option<String>,
    image_url: Option<String>,
    thumbnail_url: Option<String>,
    long_description: Option<String>,
}

impl ListingFields {
    fn check(&self) -> Result<(), Response> {
        if self.price.is_some_and(|price| price < 0.0) || self.stock.is_some_and(|stock| stock < 0)
        {
            return Err(fail(
                StatusCode::BAD_REQUEST,
                "Price and stock must be non-negative",
            ));
        }
        Ok(())
    }

    fn apply(self, listing: &mut Listing) {
        if let Some(name) = self.name {
            listing.name = name;
        }
        if let Some(description) = self.description {
            listing.description = description;
        }
        if let Some(price) = self.price {
            listing.price = price;
        }
        if let Some(stock) = self.stock {
            listing.stock = stock;
        }
        if let Some(category) = self.category {
            listing.category = category;
        }
        listing.image_url = self.image_url.or(listing.image_url.take());
        listing.thumbnail_url = self.thumbnail_url.or(listing.thumbnail_url.take());
        listing.long_description = self.long_description.or(listing.long_description.take());
    }
}

async fn create_store_product(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(store_id): Path<String>,
    Json(body): Json<ListingFields>,
) -> Response {
    let mut state = lock(&state);
    if let Err(response) = state
        .user_for(&headers)
        .and_then(|user_id| state.owned_store(&user_id, &store_id))
        .and_then(|_| body.check())
    {
        return response;
    }
    let (Some(name), Some(description), Some(price), Some(stock), Some(category)) = (
        body.name.clone(),
        body.description.clone(),
        body.price,
        body.stock,
        body.category.clone(),
    ) else {
        return fail(
            StatusCode::BAD_REQUEST,
            "Name, description, price, stock and category are required",
        );
    };

    let mut listing = Listing {
        store_id,
        name,
        description,
        price,
        stock,
        category,
        image_url: None,
        thumbnail_url: None,
        long_description: None,
    };
    body.apply(&mut listing);
    let id = state.next_id("product");
    let product = BackendState::product_json(&id, &listing);
    state.products.insert(id, listing);
    (
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": product })),
    )
        .into_response()
}

async fn update_store_product(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<ListingFields>,
) -> Response {
    let mut state = lock(&state);
    let user_id = match state.user_for(&headers) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };
    let Some(store_id) = state.products.get(&id).map(|l| l.store_id.clone()) else {
        return fail(StatusCode::NOT_FOUND, "Product not found");
    };
    if let Err(response) = state
        .owned_store(&user_id, &store_id)
        .and_then(|_| body.check())
    {
        return response;
    }

    let Some(listing) = state.products.get_mut(&id) else {
        return fail(StatusCode::NOT_FOUND, "Product not found");
    };
    body.apply(listing);
    ok(BackendState::product_json(&id, listing))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageData {
    image_data_url: String,
}

async fn upload_product_image(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<ImageData>,
) -> Response {
    let mut state = lock(&state);
    if let Err(response) = state.user_for(&headers) {
        return response;
    }
    if !body.image_data_url.starts_with("data:image/") {
        return fail(StatusCode::BAD_REQUEST, "Invalid image data");
    }
    let id = state.next_id("img");
    ok(json!({
        "imageUrl": format!("https://cdn.example.com/{id}.png"),
        "thumbnailUrl": format!("https://cdn.example.com/{id}-thumb.png"),
        "publicId": id,
    }))
}

// =============================================================================
// Shopper
// =============================================================================

/// The client library wired over a temporary data directory.
pub struct Shopper {
    pub config: ClientConfig,
    pub store: Arc<dyn KeyValueStore>,
    pub tokens: TokenStore,
    pub guest: GuestCartStore,
    pub api: ApiClient,
    pub auth: AuthService,
    pub catalog: CatalogClient,
    pub orders: OrderClient,
    pub stores: StoreClient,
    pub store_products: StoreProductClient,
    _data_dir: TempDir,
}

impl Shopper {
    /// Build a signed-out shopper pointed at `backend`.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory or HTTP client cannot be created.
    #[must_use]
    pub fn new(backend: &FakeBackend) -> Self {
        let data_dir = TempDir::new().expect("Failed to create data dir");
        let mut config = ClientConfig::for_api(backend.url()).expect("Invalid backend URL");
        config.data_dir = data_dir.path().to_path_buf();

        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(&config.data_dir));
        let tokens = TokenStore::new(Arc::clone(&store));
        let api = ApiClient::new(&config, tokens.clone()).expect("Failed to build API client");

        Self {
            auth: AuthService::new(api.clone()),
            catalog: CatalogClient::new(api.clone(), &config),
            orders: OrderClient::new(api.clone()),
            stores: StoreClient::new(api.clone()),
            store_products: StoreProductClient::new(api.clone()),
            guest: GuestCartStore::new(Arc::clone(&store)),
            config,
            store,
            tokens,
            api,
            _data_dir: data_dir,
        }
    }

    /// A fresh signed-out cart session over this shopper's storage.
    #[must_use]
    pub fn session(&self) -> CartSession<RemoteCartClient> {
        CartSession::new(self.guest.clone(), RemoteCartClient::new(self.api.clone()))
    }

    /// Log in with a plain-text password.
    ///
    /// # Errors
    ///
    /// Returns the error from [`AuthService::login`].
    pub async fn login(&self, email: &str, password: &str) -> Result<User, CartError> {
        self.auth
            .login(email, &SecretString::from(password.to_string()))
            .await
    }
}
