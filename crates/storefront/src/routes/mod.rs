//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                             - Liveness check
//! GET  /health/ready                       - Readiness check (database ping)
//!
//! # Auth (stricter rate limit)
//! POST /v1/auth/register                   - Register and activate
//! POST /v1/auth/register/otp               - Email a registration code
//! POST /v1/auth/register/verify            - Confirm the code, create the account
//! POST /v1/auth/login                      - Issue a bearer token
//! POST /v1/auth/forgot-password            - Email a reset link
//! POST /v1/auth/reset-password             - Set a new password
//!
//! # Users (bearer token)
//! GET    /v1/users/userdata                - Own profile
//! GET    /v1/users                         - All accounts (admin)
//! DELETE /v1/users/{id}                    - Delete an account (admin)
//! GET    /v1/users/addresses               - Address book
//! POST   /v1/users/addresses               - Add an address
//! PUT    /v1/users/addresses/{addressId}   - Edit an address
//! DELETE /v1/users/addresses/{addressId}   - Remove an address
//! PATCH  /v1/users/addresses/{addressId}/default - Make an address the default
//!
//! # Products
//! GET    /v1/products                      - Filtered, paginated listing
//! GET    /v1/products/slug/{slug}          - Product by slug
//! GET    /v1/products/brand/{brand}        - Products of one brand
//! GET    /v1/products/{id}                 - Product by id
//! POST   /v1/products                      - Create (admin, multipart)
//! PUT    /v1/products/{id}                 - Update (admin, multipart)
//! DELETE /v1/products/{id}                 - Delete (admin)
//!
//! # Orders (bearer token)
//! POST  /v1/orders                         - Place an order
//! GET   /v1/orders/my-orders               - Own orders
//! GET   /v1/orders/{id}                    - One order (owner or admin)
//! PATCH /v1/orders/{id}/request-cancel     - Ask for cancellation
//! GET   /v1/orders/admin/list              - All orders (admin)
//! PATCH /v1/orders/admin/{id}/status       - Change status (admin)
//!
//! # Shipping and payments
//! GET  /v1/shipping/check-pincode/{pin}    - COD serviceability
//! POST /v1/payments/webhook                - Gateway callback
//! ```

pub mod auth;
pub mod orders;
pub mod payments;
pub mod products;
pub mod shipping;
pub mod users;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::{delete, get, patch, post, put},
};

use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/register/otp", post(auth::request_otp))
        .route("/register/verify", post(auth::verify_otp))
        .route("/login", post(auth::login))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
        .layer(auth_rate_limiter())
}

/// Create the user and address book routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::list))
        .route("/userdata", get(users::userdata))
        .route(
            "/addresses",
            get(users::list_addresses).post(users::add_address),
        )
        .route(
            "/addresses/{address_id}",
            put(users::update_address).delete(users::delete_address),
        )
        .route(
            "/addresses/{address_id}/default",
            patch(users::set_default_address),
        )
        .route("/{id}", delete(users::delete))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route("/slug/{slug}", get(products::show_by_slug))
        .route("/brand/{brand}", get(products::by_brand))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::delete),
        )
        .layer(DefaultBodyLimit::max(products::MAX_FORM_BYTES))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(orders::create))
        .route("/my-orders", get(orders::my_orders))
        .route("/admin/list", get(orders::admin_list))
        .route("/admin/{id}/status", patch(orders::update_status))
        .route("/{id}", get(orders::show))
        .route("/{id}/request-cancel", patch(orders::request_cancel))
}

/// Create all `/v1` routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .merge(
            Router::new()
                .nest("/users", user_routes())
                .nest("/products", product_routes())
                .nest("/orders", order_routes())
                .route(
                    "/shipping/check-pincode/{pin}",
                    get(shipping::check_pincode),
                )
                .route("/payments/webhook", post(payments::webhook))
                .layer(api_rate_limiter()),
        )
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/v1", api_routes())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
