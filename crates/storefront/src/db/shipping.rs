//! Shipping rate lookups.

use rust_decimal::Decimal;
use sqlx::PgPool;

use super::RepositoryError;

/// A configured shipping tier.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ShippingRate {
    /// Stable identifier selected at checkout (e.g., `standard`, `express`).
    pub shipping_type: String,
    /// Human-readable label.
    pub label: String,
    /// Cost before any free-shipping threshold.
    pub cost: Decimal,
    /// Delivery estimate shown to the customer (e.g., "3-5 business days").
    pub delivery_window: String,
    /// Order total at which this tier becomes free, if any.
    pub free_over: Option<Decimal>,
}

/// Repository for shipping rates.
pub struct ShippingRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ShippingRepository<'a> {
    /// Create a new shipping repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All configured shipping tiers, cheapest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<ShippingRate>, RepositoryError> {
        let rows = sqlx::query_as::<_, ShippingRate>(
            r"
            SELECT shipping_type, label, cost, delivery_window, free_over
            FROM shipping_rates
            ORDER BY cost ASC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}
