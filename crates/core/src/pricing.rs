//! Discount shapes and pricing aggregation.
//!
//! The aggregator folds enriched cart lines and the applied discount into
//! subtotal and post-discount total. The discount is a tagged union rather
//! than a struct of optional fields so the precedence rule - per-line
//! discounts override a fixed amount - is explicit in the type.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::{LineDetail, LineKey};

/// A promo-derived unit price override for a single line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineDiscount {
    #[serde(flatten)]
    pub key: LineKey,
    /// The discounted unit price for the line (not a delta).
    pub discounted_unit_price: Decimal,
}

/// The discount currently applied to a cart.
///
/// A promotion yields exactly one variant. `PerLine` substitutes unit prices
/// for matching lines; `Fixed` subtracts from the subtotal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Discount {
    /// No promotion applied.
    #[default]
    None,
    /// Fixed amount off the cart subtotal.
    Fixed { amount: Decimal },
    /// Per-line unit price overrides (percentage promotions resolve to these).
    PerLine { lines: Vec<LineDiscount> },
}

impl Discount {
    /// Whether any discount is applied.
    #[must_use]
    pub const fn is_some(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// The discounted unit price for a line, if this discount overrides it.
    #[must_use]
    pub fn unit_price_for(&self, key: &LineKey) -> Option<Decimal> {
        match self {
            Self::PerLine { lines } => lines
                .iter()
                .find(|d| d.key == *key)
                .map(|d| d.discounted_unit_price),
            _ => None,
        }
    }
}

/// Derived cart totals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CartTotals {
    /// Sum of base effective prices (sale-aware, promo-unaware).
    pub subtotal: Decimal,
    /// Subtotal after the applied discount. Never negative.
    pub total: Decimal,
}

impl CartTotals {
    /// An empty cart's totals.
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            subtotal: Decimal::ZERO,
            total: Decimal::ZERO,
        }
    }

    /// Checkout grand total: post-discount total plus the selected shipping cost.
    #[must_use]
    pub fn grand_total(&self, shipping_cost: Decimal) -> Decimal {
        self.total + shipping_cost
    }
}

/// Compute subtotal and post-discount total for a cart.
///
/// Per line, the base effective price is the active sale price if any, else
/// the catalog price. A `PerLine` discount substitutes unit prices for
/// matching lines and leaves the rest at their base price. A `Fixed` discount
/// subtracts from the subtotal, clamped at zero.
#[must_use]
pub fn compute_totals(lines: &[LineDetail], discount: &Discount) -> CartTotals {
    let subtotal: Decimal = lines
        .iter()
        .map(|l| l.effective_unit_price() * Decimal::from(l.quantity))
        .sum();

    let total = match discount {
        Discount::None => subtotal,
        Discount::Fixed { amount } => (subtotal - amount).max(Decimal::ZERO),
        Discount::PerLine { .. } => lines
            .iter()
            .map(|l| {
                let unit = discount
                    .unit_price_for(&l.key)
                    .unwrap_or_else(|| l.effective_unit_price());
                unit * Decimal::from(l.quantity)
            })
            .sum(),
    };

    CartTotals { subtotal, total }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ProductId, VariantId};

    fn line(p: i32, price: i64, sale: Option<i64>, qty: u32) -> LineDetail {
        LineDetail {
            key: LineKey::new(ProductId::new(p), VariantId::new(1)),
            quantity: qty,
            product_name: format!("Product {p}"),
            variant_name: "Default".to_owned(),
            variant_color: None,
            image_url: None,
            unit_price: Decimal::from(price),
            sale_price: sale.map(Decimal::from),
        }
    }

    #[test]
    fn test_no_discount_total_equals_subtotal() {
        // [{price: 10, qty: 2}, {price: 20, qty: 1}] -> 40
        let lines = vec![line(1, 10, None, 2), line(2, 20, None, 1)];
        let totals = compute_totals(&lines, &Discount::None);
        assert_eq!(totals.subtotal, Decimal::from(40));
        assert_eq!(totals.total, Decimal::from(40));
    }

    #[test]
    fn test_fixed_discount_subtracts_from_subtotal() {
        let lines = vec![line(1, 10, None, 2), line(2, 20, None, 1)];
        let totals = compute_totals(
            &lines,
            &Discount::Fixed {
                amount: Decimal::from(5),
            },
        );
        assert_eq!(totals.subtotal, Decimal::from(40));
        assert_eq!(totals.total, Decimal::from(35));
    }

    #[test]
    fn test_fixed_discount_clamps_at_zero() {
        let lines = vec![line(1, 10, None, 1)];
        let totals = compute_totals(
            &lines,
            &Discount::Fixed {
                amount: Decimal::from(100),
            },
        );
        assert_eq!(totals.total, Decimal::ZERO);
    }

    #[test]
    fn test_per_line_discount_substitutes_matching_lines() {
        let lines = vec![line(1, 10, None, 2), line(2, 20, None, 1)];
        let discount = Discount::PerLine {
            lines: vec![LineDiscount {
                key: LineKey::new(ProductId::new(2), VariantId::new(1)),
                discounted_unit_price: Decimal::from(15),
            }],
        };
        let totals = compute_totals(&lines, &discount);
        // 10*2 + 15*1
        assert_eq!(totals.subtotal, Decimal::from(40));
        assert_eq!(totals.total, Decimal::from(35));
    }

    #[test]
    fn test_sale_price_feeds_subtotal() {
        let lines = vec![line(1, 10, Some(8), 2), line(2, 20, None, 1)];
        let totals = compute_totals(&lines, &Discount::None);
        assert_eq!(totals.subtotal, Decimal::from(36));
        assert_eq!(totals.total, Decimal::from(36));
    }

    #[test]
    fn test_per_line_overrides_sale_price_too() {
        let lines = vec![line(1, 10, Some(8), 2)];
        let discount = Discount::PerLine {
            lines: vec![LineDiscount {
                key: LineKey::new(ProductId::new(1), VariantId::new(1)),
                discounted_unit_price: Decimal::from(6),
            }],
        };
        let totals = compute_totals(&lines, &discount);
        assert_eq!(totals.subtotal, Decimal::from(16));
        assert_eq!(totals.total, Decimal::from(12));
    }

    #[test]
    fn test_grand_total_adds_shipping() {
        let lines = vec![line(1, 10, None, 2)];
        let totals = compute_totals(&lines, &Discount::None);
        assert_eq!(
            totals.grand_total(Decimal::new(499, 2)),
            Decimal::new(2499, 2)
        );
    }

    #[test]
    fn test_empty_cart_is_zero() {
        let totals = compute_totals(&[], &Discount::None);
        assert_eq!(totals, CartTotals::zero());
    }

    #[test]
    fn test_discount_serde_tagging() {
        let json = serde_json::to_value(Discount::Fixed {
            amount: Decimal::from(5),
        })
        .expect("serialize");
        assert_eq!(json.get("kind").and_then(|v| v.as_str()), Some("fixed"));

        let none = serde_json::to_value(Discount::None).expect("serialize");
        assert_eq!(none.get("kind").and_then(|v| v.as_str()), Some("none"));
    }
}
