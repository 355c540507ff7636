//! Catalog lookups for cart enrichment.
//!
//! Cart persistence stores only identity and quantity; prices and display
//! data are re-fetched from the catalog on every read. Enrichment is batched:
//! one query for the whole cart, never one per line.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use marigold_core::{LineDetail, LineKey, LineSet, ProductId, VariantId};

use super::RepositoryError;

#[derive(sqlx::FromRow)]
struct CatalogRow {
    product_id: i32,
    variant_id: i32,
    product_name: String,
    variant_name: String,
    variant_color: Option<String>,
    image_url: Option<String>,
    unit_price: Decimal,
    sale_price: Option<Decimal>,
    sale_starts_at: Option<DateTime<Utc>>,
    sale_ends_at: Option<DateTime<Utc>>,
    available: bool,
}

impl CatalogRow {
    /// The sale price, if its window is active at `now`.
    fn active_sale_price(&self, now: DateTime<Utc>) -> Option<Decimal> {
        let price = self.sale_price?;
        if self.sale_starts_at.is_some_and(|start| now < start) {
            return None;
        }
        if self.sale_ends_at.is_some_and(|end| now >= end) {
            return None;
        }
        Some(price)
    }
}

/// Repository for catalog reads.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Join persisted lines with live catalog data.
    ///
    /// Lines whose variant no longer exists or whose product is unavailable
    /// are skipped with a warning rather than failing the whole cart.
    /// Sale windows are resolved here: `LineDetail::sale_price` is only set
    /// while the sale is active.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn line_details(&self, lines: &LineSet) -> Result<Vec<LineDetail>, RepositoryError> {
        if lines.is_empty() {
            return Ok(Vec::new());
        }

        let product_ids: Vec<i32> = lines.iter().map(|l| l.key.product_id.as_i32()).collect();
        let variant_ids: Vec<i32> = lines.iter().map(|l| l.key.variant_id.as_i32()).collect();

        let rows = sqlx::query_as::<_, CatalogRow>(
            r"
            SELECT p.id AS product_id,
                   v.id AS variant_id,
                   p.name AS product_name,
                   v.name AS variant_name,
                   v.color AS variant_color,
                   v.image_url,
                   v.unit_price,
                   v.sale_price,
                   v.sale_starts_at,
                   v.sale_ends_at,
                   p.available
            FROM variants v
            JOIN products p ON p.id = v.product_id
            WHERE p.id = ANY($1) AND v.id = ANY($2)
            ",
        )
        .bind(&product_ids)
        .bind(&variant_ids)
        .fetch_all(self.pool)
        .await?;

        // The ANY() pair is a superset match; key exactly here.
        let mut by_key: HashMap<LineKey, CatalogRow> = rows
            .into_iter()
            .map(|r| {
                (
                    LineKey::new(ProductId::new(r.product_id), VariantId::new(r.variant_id)),
                    r,
                )
            })
            .collect();

        let now = Utc::now();
        let mut details = Vec::with_capacity(lines.len());
        for line in lines.iter() {
            let Some(row) = by_key.remove(&line.key) else {
                tracing::warn!(
                    product_id = %line.key.product_id,
                    variant_id = %line.key.variant_id,
                    "cart line references unknown variant, skipping"
                );
                continue;
            };
            if !row.available {
                tracing::warn!(
                    product_id = %line.key.product_id,
                    product_name = %row.product_name,
                    "cart line references unavailable product, skipping"
                );
                continue;
            }
            let sale_price = row.active_sale_price(now);
            details.push(LineDetail {
                key: line.key,
                quantity: line.quantity,
                product_name: row.product_name,
                variant_name: row.variant_name,
                variant_color: row.variant_color,
                image_url: row.image_url,
                unit_price: row.unit_price,
                sale_price,
            });
        }

        Ok(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn row(sale: Option<i64>, starts: Option<i64>, ends: Option<i64>) -> CatalogRow {
        let now = Utc::now();
        CatalogRow {
            product_id: 1,
            variant_id: 1,
            product_name: "Mug".to_owned(),
            variant_name: "Large".to_owned(),
            variant_color: None,
            image_url: None,
            unit_price: Decimal::from(20),
            sale_price: sale.map(Decimal::from),
            sale_starts_at: starts.map(|h| now + Duration::hours(h)),
            sale_ends_at: ends.map(|h| now + Duration::hours(h)),
            available: true,
        }
    }

    #[test]
    fn test_sale_window_active() {
        let now = Utc::now();
        // started an hour ago, ends in an hour
        assert_eq!(
            row(Some(15), Some(-1), Some(1)).active_sale_price(now),
            Some(Decimal::from(15))
        );
        // open-ended sale
        assert_eq!(
            row(Some(15), None, None).active_sale_price(now),
            Some(Decimal::from(15))
        );
    }

    #[test]
    fn test_sale_window_inactive() {
        let now = Utc::now();
        // not started yet
        assert_eq!(row(Some(15), Some(1), Some(2)).active_sale_price(now), None);
        // already ended
        assert_eq!(
            row(Some(15), Some(-2), Some(-1)).active_sale_price(now),
            None
        );
        // no sale price at all
        assert_eq!(row(None, Some(-1), Some(1)).active_sale_price(now), None);
    }
}
