//! Document persistence for the storefront.
//!
//! # Collections
//!
//! - `users` - Registered accounts (Argon2 password hashes)
//! - `products` - Perfume catalog; `rating` is derived from reviews
//! - `reviews` - Product reviews, indexed by product
//! - `carts` - One cart per user, replaced wholesale on every write
//!
//! Every collection sits behind an `async_trait` repository so the same
//! services run against `PostgreSQL` in production and [`MemoryStore`] in
//! tests or `STOREFRONT_STORAGE=memory`.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p essence-cli -- migrate
//! ```

pub mod carts;
pub mod memory;
pub mod products;
pub mod reviews;
pub mod seed;
pub mod users;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use essence_core::{Cart, CartItem, Email, Product, ProductId, Review, ReviewId, ReviewPatch, UserId};

use crate::models::user::User;

pub use carts::PgCartRepository;
pub use memory::MemoryStore;
pub use products::PgProductRepository;
pub use reviews::PgReviewRepository;
pub use users::PgUserRepository;

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

// =============================================================================
// Repository traits
// =============================================================================

/// Per-user cart storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// The stored cart for `user_id`, if one was ever written.
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<Cart>, RepositoryError>;

    /// Replace the user's items, creating the cart on first write.
    ///
    /// `updated_at` is set to `now` on both paths; `created_at` is kept when
    /// the cart already exists.
    async fn replace(
        &self,
        user_id: &UserId,
        items: &[CartItem],
        now: DateTime<Utc>,
    ) -> Result<Cart, RepositoryError>;
}

/// Review storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn insert(&self, review: &Review) -> Result<(), RepositoryError>;

    /// All reviews of a product, newest first.
    async fn find_by_product(&self, product_id: &ProductId) -> Result<Vec<Review>, RepositoryError>;

    /// Apply `patch` and return the updated review, or `None` if absent.
    async fn update(
        &self,
        id: &ReviewId,
        patch: &ReviewPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Review>, RepositoryError>;

    /// Delete and return the review, or `None` if absent.
    async fn delete(&self, id: &ReviewId) -> Result<Option<Review>, RepositoryError>;
}

/// Product catalog storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError>;

    /// First product with exactly this name.
    async fn find_by_name(&self, name: &str) -> Result<Option<Product>, RepositoryError>;

    async fn insert(&self, product: &Product) -> Result<(), RepositoryError>;

    /// Overwrite the derived rating. Returns `false` if the product is gone.
    async fn set_rating(&self, id: &ProductId, rating: Decimal) -> Result<bool, RepositoryError>;
}

/// Account storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// Insert a new account.
    ///
    /// Returns `RepositoryError::Conflict` if the email is taken.
    async fn insert(&self, user: &User) -> Result<(), RepositoryError>;
}

// =============================================================================
// Repository bundle
// =============================================================================

/// The set of repositories the application runs against.
#[derive(Clone)]
pub struct Repositories {
    pub carts: Arc<dyn CartRepository>,
    pub reviews: Arc<dyn ReviewRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub users: Arc<dyn UserRepository>,
    pool: Option<PgPool>,
}

impl Repositories {
    /// Repositories backed by a `PostgreSQL` pool.
    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            carts: Arc::new(PgCartRepository::new(pool.clone())),
            reviews: Arc::new(PgReviewRepository::new(pool.clone())),
            products: Arc::new(PgProductRepository::new(pool.clone())),
            users: Arc::new(PgUserRepository::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// Repositories backed by one shared [`MemoryStore`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_memory(Arc::new(MemoryStore::default()))
    }

    /// Repositories backed by an existing [`MemoryStore`].
    #[must_use]
    pub fn from_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            carts: store.clone(),
            reviews: store.clone(),
            products: store.clone(),
            users: store,
            pool: None,
        }
    }

    /// The `PostgreSQL` pool, when running against one.
    #[must_use]
    pub const fn pool(&self) -> Option<&PgPool> {
        self.pool.as_ref()
    }

    /// Check that storage is reachable.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the database does not answer.
    pub async fn ping(&self) -> Result<(), RepositoryError> {
        if let Some(pool) = &self.pool {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
        Ok(())
    }
}

/// Map a unique-constraint violation to `Conflict`, anything else to `Database`.
pub(crate) fn map_unique_violation(err: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(err)
}

/// Decode a `JSONB` column into a typed value, reporting corruption.
pub(crate) fn decode_json<T: serde::de::DeserializeOwned>(
    value: serde_json::Value,
    column: &str,
) -> Result<T, RepositoryError> {
    serde_json::from_value(value)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid {column} in database: {e}")))
}

/// Encode a value for a `JSONB` column.
pub(crate) fn encode_json<T: serde::Serialize>(
    value: &T,
    column: &str,
) -> Result<serde_json::Value, RepositoryError> {
    serde_json::to_value(value)
        .map_err(|e| RepositoryError::DataCorruption(format!("cannot encode {column}: {e}")))
}
