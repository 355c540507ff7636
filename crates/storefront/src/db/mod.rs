//! Database operations for storefront `PostgreSQL`.
//!
//! # Database: `marigold_storefront`
//!
//! ## Tables
//!
//! - `users` - Site accounts (argon2 password hashes)
//! - `addresses` - User shipping addresses, at most one default each
//! - `cart_lines` - Persisted cart and wishlist lines per user
//! - `products` / `variants` - Catalog with sale price windows
//! - `promotions` - Promo codes (percentage or fixed)
//! - `shipping_rates` - Shipping tiers with free-shipping thresholds
//! - `tower_sessions.session` - Session storage (created by the session store)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p marigold-cli -- migrate
//! ```
//!
//! All queries are runtime-checked (`sqlx::query` / `query_as`); no database
//! is needed at compile time.

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub mod addresses;
pub mod carts;
pub mod catalog;
pub mod promotions;
pub mod shipping;
pub mod users;

pub use addresses::AddressRepository;
pub use carts::{CartRepository, CollectionKind};
pub use catalog::CatalogRepository;
pub use promotions::{PromotionRepository, PromotionRow};
pub use shipping::{ShippingRate, ShippingRepository};
pub use users::UserRepository;

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Underlying database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored value failed domain validation on read.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Uniqueness or ownership conflict.
    #[error("conflict: {0}")]
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
