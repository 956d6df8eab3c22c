//! Database operations for the shop `PostgreSQL` database.
//!
//! ## Tables
//!
//! - `users` - Shop accounts (login by one-time code)
//! - `verification_codes` - One-time login codes
//! - `addresses` - Saved shipping addresses, one default per user
//! - `categories`, `products` - Catalog
//! - `cart_items`, `wishlist_items` - Per-user lists
//! - `orders`, `order_items` - Orders and their lines
//! - `tracking_pixels`, `settings` - Admin-managed site configuration
//! - `tower_sessions.session` - Session storage (created by the session store)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p vitrina-cli -- migrate
//! ```
//!
//! Queries are built at runtime with `sqlx::query_as` and `FromRow` row
//! types, so the workspace builds without a live database.

pub mod addresses;
pub mod cart;
pub mod catalog;
pub mod orders;
pub mod pixels;
pub mod settings;
pub mod users;
pub mod verification;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use addresses::AddressRepository;
pub use cart::{CartRepository, WishlistRepository};
pub use catalog::{CategoryRepository, ProductFilter, ProductRepository};
pub use orders::{OrderListFilter, OrderRepository};
pub use pixels::TrackingPixelRepository;
pub use settings::SettingsRepository;
pub use users::{Contact, UserRepository};
pub use verification::{CodeCheck, VerificationRepository};

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

    /// Constraint violation (e.g., duplicate slug).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique-violation into [`RepositoryError::Conflict`], anything
    /// else into [`RepositoryError::Database`].
    pub(crate) fn unique(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::Conflict(format!("{what} already exists"));
        }
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_foreign_key_violation()
        {
            return Self::Conflict(format!("{what} references a missing record"));
        }
        Self::Database(err)
    }
}

/// Parse a TEXT column into a domain enum, reporting bad values as
/// corruption.
pub(crate) fn parse_column<T>(value: &str) -> Result<T, RepositoryError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| RepositoryError::DataCorruption(format!("{e}")))
}

/// Decode a `NUMERIC(12,2)` column into [`Money`](vitrina_core::Money).
pub(crate) fn money_column(
    value: rust_decimal::Decimal,
) -> Result<vitrina_core::Money, RepositoryError> {
    vitrina_core::Money::new(value)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid amount {value}: {e}")))
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
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
