//! Promotion (promo code) lookups.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use super::RepositoryError;

/// A promotion row. `kind` is either `percentage` (with `percent` set and an
/// optional `product_ids` scope) or `fixed` (with `amount` set).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PromotionRow {
    pub id: i32,
    pub code: String,
    pub kind: String,
    pub percent: Option<Decimal>,
    pub amount: Option<Decimal>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    /// Product scope for percentage promotions; NULL means all products.
    pub product_ids: Option<Vec<i32>>,
}

impl PromotionRow {
    /// Whether the promotion window is active at `now`.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        if self.starts_at.is_some_and(|start| now < start) {
            return false;
        }
        if self.ends_at.is_some_and(|end| now >= end) {
            return false;
        }
        true
    }
}

/// Repository for promotion lookups.
pub struct PromotionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PromotionRepository<'a> {
    /// Create a new promotion repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Look up a promotion by its canonical (normalized) code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_code(&self, code: &str) -> Result<Option<PromotionRow>, RepositoryError> {
        let row = sqlx::query_as::<_, PromotionRow>(
            r"
            SELECT id, code, kind, percent, amount, starts_at, ends_at, product_ids
            FROM promotions
            WHERE code = $1
            ",
        )
        .bind(code)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn promo(starts: Option<i64>, ends: Option<i64>) -> PromotionRow {
        let now = Utc::now();
        PromotionRow {
            id: 1,
            code: "SAVE10".to_owned(),
            kind: "fixed".to_owned(),
            percent: None,
            amount: Some(Decimal::from(10)),
            starts_at: starts.map(|h| now + Duration::hours(h)),
            ends_at: ends.map(|h| now + Duration::hours(h)),
            product_ids: None,
        }
    }

    #[test]
    fn test_window_checks() {
        let now = Utc::now();
        assert!(promo(None, None).is_active(now));
        assert!(promo(Some(-1), Some(1)).is_active(now));
        assert!(!promo(Some(1), None).is_active(now));
        assert!(!promo(None, Some(-1)).is_active(now));
    }
}
