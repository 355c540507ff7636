//! Promo code evaluation.
//!
//! Codes are normalized (trimmed, uppercased) before lookup so `" save10 "`
//! and `"SAVE10"` resolve to the same promotion. Evaluation is pure given a
//! promotion row and the current enriched lines; the resulting [`AppliedPromo`]
//! is stored in the session and re-evaluated against live prices at checkout.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use marigold_core::{Discount, LineDetail, LineDiscount};

use crate::db::{PromotionRepository, PromotionRow, RepositoryError};

/// Promo evaluation failure. Business-rule variants carry the message shown
/// to the shopper verbatim.
#[derive(Debug, Error)]
pub enum PromoError {
    #[error("Enter a promo code")]
    Empty,

    #[error("This promo code is not valid")]
    Unknown,

    #[error("This promo code has expired")]
    Expired,

    #[error("This promo code does not apply to any item in your cart")]
    NotApplicable,

    /// The stored promotion row is internally inconsistent.
    #[error("malformed promotion: {0}")]
    Malformed(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// A successfully applied promotion, held in the session between the apply
/// call and checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedPromo {
    /// Canonical (normalized) code, echoed back to the client.
    pub code: String,
    pub discount: Discount,
}

/// Evaluates promo codes against the current cart contents.
pub struct PromotionEvaluator<'a> {
    pool: &'a PgPool,
}

impl<'a> PromotionEvaluator<'a> {
    /// Create a new evaluator.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Apply a promo code to the given enriched cart lines.
    ///
    /// # Errors
    ///
    /// Returns a business-rule [`PromoError`] for empty, unknown, expired, or
    /// not-applicable codes, `PromoError::Repository` on database failure.
    #[instrument(skip(self, lines))]
    pub async fn apply_code(
        &self,
        code: &str,
        lines: &[LineDetail],
    ) -> Result<AppliedPromo, PromoError> {
        let code = normalize_code(code);
        if code.is_empty() {
            return Err(PromoError::Empty);
        }

        let repo = PromotionRepository::new(self.pool);
        let promo = repo.find_by_code(&code).await?.ok_or(PromoError::Unknown)?;

        let discount = evaluate(&promo, lines, Utc::now())?;
        Ok(AppliedPromo {
            code: promo.code,
            discount,
        })
    }
}

/// Normalize a user-entered code to its canonical form.
fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Evaluate an active promotion against enriched lines.
fn evaluate(
    promo: &PromotionRow,
    lines: &[LineDetail],
    now: DateTime<Utc>,
) -> Result<Discount, PromoError> {
    if !promo.is_active(now) {
        return Err(PromoError::Expired);
    }

    match promo.kind.as_str() {
        "fixed" => {
            let amount = promo
                .amount
                .ok_or_else(|| PromoError::Malformed(format!("fixed promo {} has no amount", promo.id)))?;
            if lines.is_empty() {
                return Err(PromoError::NotApplicable);
            }
            Ok(Discount::Fixed { amount })
        }
        "percentage" => {
            let percent = promo.percent.ok_or_else(|| {
                PromoError::Malformed(format!("percentage promo {} has no percent", promo.id))
            })?;
            let discounted: Vec<LineDiscount> = lines
                .iter()
                .filter(|line| in_scope(promo, line))
                .map(|line| LineDiscount {
                    key: line.key,
                    discounted_unit_price: discounted_price(line.effective_unit_price(), percent),
                })
                .collect();
            if discounted.is_empty() {
                return Err(PromoError::NotApplicable);
            }
            Ok(Discount::PerLine { lines: discounted })
        }
        other => Err(PromoError::Malformed(format!(
            "promo {} has unknown kind {other:?}",
            promo.id
        ))),
    }
}

/// Whether a line falls inside the promotion's product scope.
fn in_scope(promo: &PromotionRow, line: &LineDetail) -> bool {
    promo
        .product_ids
        .as_ref()
        .is_none_or(|ids| ids.contains(&line.key.product_id.as_i32()))
}

/// Apply a percentage discount to a unit price, rounded to cents.
fn discounted_price(unit_price: Decimal, percent: Decimal) -> Decimal {
    let factor = Decimal::ONE - percent / Decimal::from(100);
    (unit_price * factor).round_dp(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use marigold_core::{LineKey, ProductId, VariantId};

    fn line(product: i32, variant: i32, price: &str, sale: Option<&str>) -> LineDetail {
        LineDetail {
            key: LineKey::new(ProductId::new(product), VariantId::new(variant)),
            quantity: 1,
            product_name: "Shirt".to_owned(),
            variant_name: "M".to_owned(),
            variant_color: None,
            image_url: None,
            unit_price: price.parse().expect("price"),
            sale_price: sale.map(|s| s.parse().expect("sale price")),
        }
    }

    fn percentage(percent: &str, product_ids: Option<Vec<i32>>) -> PromotionRow {
        PromotionRow {
            id: 1,
            code: "TENOFF".to_owned(),
            kind: "percentage".to_owned(),
            percent: Some(percent.parse().expect("percent")),
            amount: None,
            starts_at: None,
            ends_at: None,
            product_ids,
        }
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  save10 "), "SAVE10");
        assert_eq!(normalize_code("\t"), "");
    }

    #[test]
    fn test_fixed_promo_applies_to_nonempty_cart() {
        let promo = PromotionRow {
            id: 2,
            code: "FIVE".to_owned(),
            kind: "fixed".to_owned(),
            percent: None,
            amount: Some(Decimal::from(5)),
            starts_at: None,
            ends_at: None,
            product_ids: None,
        };
        let lines = vec![line(1, 1, "20.00", None)];
        let discount = evaluate(&promo, &lines, Utc::now()).expect("apply");
        assert_eq!(
            discount,
            Discount::Fixed {
                amount: Decimal::from(5)
            }
        );

        assert!(matches!(
            evaluate(&promo, &[], Utc::now()),
            Err(PromoError::NotApplicable)
        ));
    }

    #[test]
    fn test_percentage_promo_scopes_to_product_set() {
        let promo = percentage("10", Some(vec![1]));
        let lines = vec![line(1, 1, "20.00", None), line(2, 2, "30.00", None)];
        let discount = evaluate(&promo, &lines, Utc::now()).expect("apply");
        match discount {
            Discount::PerLine { lines } => {
                assert_eq!(lines.len(), 1);
                assert_eq!(lines[0].key.product_id, ProductId::new(1));
                assert_eq!(lines[0].discounted_unit_price, "18.00".parse().unwrap());
            }
            other => panic!("expected per-line discount, got {other:?}"),
        }
    }

    #[test]
    fn test_percentage_promo_discounts_the_sale_price() {
        let promo = percentage("50", None);
        let lines = vec![line(1, 1, "40.00", Some("20.00"))];
        let discount = evaluate(&promo, &lines, Utc::now()).expect("apply");
        match discount {
            Discount::PerLine { lines } => {
                assert_eq!(lines[0].discounted_unit_price, "10.00".parse().unwrap());
            }
            other => panic!("expected per-line discount, got {other:?}"),
        }
    }

    #[test]
    fn test_percentage_promo_with_no_eligible_lines() {
        let promo = percentage("10", Some(vec![99]));
        let lines = vec![line(1, 1, "20.00", None)];
        assert!(matches!(
            evaluate(&promo, &lines, Utc::now()),
            Err(PromoError::NotApplicable)
        ));
    }

    #[test]
    fn test_expired_promo() {
        let mut promo = percentage("10", None);
        promo.ends_at = Some(Utc::now() - chrono::Duration::hours(1));
        let lines = vec![line(1, 1, "20.00", None)];
        assert!(matches!(
            evaluate(&promo, &lines, Utc::now()),
            Err(PromoError::Expired)
        ));
    }

    #[test]
    fn test_rounding_to_cents() {
        // 33.33% off 9.99 = 6.6603... -> 6.66
        assert_eq!(
            discounted_price("9.99".parse().unwrap(), "33.33".parse().unwrap()),
            "6.66".parse::<Decimal>().unwrap()
        );
    }
}
