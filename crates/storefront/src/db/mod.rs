//! Database operations for the storefront `PostgreSQL` database.
//!
//! ## Tables
//!
//! - `users` - Accounts with their address book (JSONB) and reset token state
//! - `pending_users` - Registrations waiting for OTP verification
//! - `products` - Catalog, with per-size stock (JSONB)
//! - `orders` - Orders with line item and shipping snapshots (JSONB)
//!
//! # Store traits
//!
//! Services talk to the database through the `*Store` traits below so the
//! order engine and account flows can run against in-memory stores in tests.
//! The `*Repository` types are the `PostgreSQL` implementations.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p hoi-cli -- migrate
//! ```

pub mod orders;
pub mod pending_users;
pub mod products;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use hoi_core::{Email, OrderId, OrderStatus, ProductId, UserId};

use crate::models::{
    NewOrder, NewUser, Order, PendingUser, Product, ProductDetails, SavedAddress, SizeStock, User,
};

pub use orders::OrderRepository;
pub use pending_users::PendingUserRepository;
pub use products::{ProductFilter, ProductRepository};
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique violation to `Conflict`, anything else to `Database`.
    pub(crate) fn from_insert(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::Conflict(format!("{what} already exists"));
        }
        Self::Database(err)
    }
}

/// Highest page number a listing will honour.
pub const MAX_PAGE: i64 = 1_000_000;

/// One page of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// 1-based page number.
    pub page: i64,
    pub limit: i64,
}

impl Pagination {
    /// Build a page request, clamping page to 1..=`MAX_PAGE` and limit to 1..=100.
    #[must_use]
    pub fn new(page: Option<i64>, limit: Option<i64>, default_limit: i64) -> Self {
        Self {
            page: page.unwrap_or(1).clamp(1, MAX_PAGE),
            limit: limit.unwrap_or(default_limit).clamp(1, 100),
        }
    }

    #[must_use]
    pub const fn offset(&self) -> i64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    /// Number of pages needed for `total` rows.
    #[must_use]
    pub const fn total_pages(&self, total: i64) -> i64 {
        (total + self.limit - 1) / self.limit
    }
}

/// Account persistence.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// Find the account whose unexpired reset token hashes to `token_hash`.
    async fn find_by_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, RepositoryError>;

    /// Returns `Conflict` when the email is taken.
    async fn create(&self, user: &NewUser) -> Result<User, RepositoryError>;

    async fn list(&self) -> Result<Vec<User>, RepositoryError>;

    /// Returns `false` when no such account existed.
    async fn delete(&self, id: UserId) -> Result<bool, RepositoryError>;

    async fn save_addresses(
        &self,
        id: UserId,
        addresses: &[SavedAddress],
    ) -> Result<(), RepositoryError>;

    async fn set_reset_token(
        &self,
        id: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// Replace the password hash and clear any reset token.
    async fn update_password(&self, id: UserId, password_hash: &str)
    -> Result<(), RepositoryError>;

    async fn set_role(&self, id: UserId, role: hoi_core::Role) -> Result<(), RepositoryError>;
}

/// OTP registration persistence.
#[async_trait]
pub trait PendingUserStore: Send + Sync {
    /// Insert or replace the pending registration for this email.
    async fn upsert(&self, pending: &PendingUser) -> Result<(), RepositoryError>;

    async fn find(&self, email: &Email) -> Result<Option<PendingUser>, RepositoryError>;

    /// Count one wrong code and return the new total.
    async fn record_failed_attempt(&self, email: &Email) -> Result<i32, RepositoryError>;

    async fn delete(&self, email: &Email) -> Result<(), RepositoryError>;
}

/// Catalog persistence.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError>;

    /// Fetch every product in `ids` that exists, in no particular order.
    async fn find_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError>;

    /// Newest first, with the total number of matches.
    async fn list(
        &self,
        filter: &ProductFilter,
        page: Pagination,
    ) -> Result<(Vec<Product>, i64), RepositoryError>;

    /// Case-insensitive exact brand match, newest first.
    async fn list_by_brand(&self, brand: &str) -> Result<Vec<Product>, RepositoryError>;

    /// Returns `Conflict` when the slug is taken.
    async fn insert(&self, details: &ProductDetails) -> Result<Product, RepositoryError>;

    async fn update(
        &self,
        id: ProductId,
        details: &ProductDetails,
    ) -> Result<Option<Product>, RepositoryError>;

    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError>;

    /// Overwrite the stock counters of one product.
    async fn save_stock(
        &self,
        id: ProductId,
        total_stock: i32,
        sizes: &[SizeStock],
    ) -> Result<(), RepositoryError>;
}

/// Order persistence.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: &NewOrder) -> Result<Order, RepositoryError>;

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    async fn find_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<Order>, RepositoryError>;

    /// All orders of one account, newest first.
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError>;

    /// Newest first, optionally filtered by status, with the total number of matches.
    async fn list(
        &self,
        status: Option<OrderStatus>,
        page: Pagination,
    ) -> Result<(Vec<Order>, i64), RepositoryError>;

    /// Persist the mutable parts of an order: statuses, gateway references
    /// and cancellation state. Snapshots and totals never change.
    async fn save(&self, order: &Order) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
