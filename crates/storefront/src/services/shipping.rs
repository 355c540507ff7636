//! Shipping option lookup with free-shipping thresholds.
//!
//! Rates change rarely, so the full table is cached with `moka` (5-minute
//! TTL). The free-shipping threshold is applied per request against the
//! order total, never cached.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use tracing::{debug, instrument};

use crate::db::{RepositoryError, ShippingRate, ShippingRepository};

/// A shipping option as offered for a specific order total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShippingOption {
    pub shipping_type: String,
    pub label: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub cost: Decimal,
    pub delivery_window: String,
}

/// Shipping rate service with an in-memory cache of the rate table.
#[derive(Clone)]
pub struct ShippingService {
    inner: Arc<ShippingServiceInner>,
}

struct ShippingServiceInner {
    pool: PgPool,
    cache: Cache<(), Arc<Vec<ShippingRate>>>,
}

impl ShippingService {
    /// Create a new shipping service.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(ShippingServiceInner { pool, cache }),
        }
    }

    /// Shipping options for an order of the given total, cheapest first.
    /// Tiers whose free-shipping threshold is met are offered at zero cost.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the rate table cannot be read.
    #[instrument(skip(self))]
    pub async fn options_for_total(
        &self,
        total: Decimal,
    ) -> Result<Vec<ShippingOption>, RepositoryError> {
        let rates = self.rates().await?;
        Ok(rates.iter().map(|rate| offer(rate, total)).collect())
    }

    /// Resolve a selected option by its `shipping_type` for an order total.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the rate table cannot be read.
    pub async fn find_option(
        &self,
        shipping_type: &str,
        total: Decimal,
    ) -> Result<Option<ShippingOption>, RepositoryError> {
        let rates = self.rates().await?;
        Ok(rates
            .iter()
            .find(|rate| rate.shipping_type == shipping_type)
            .map(|rate| offer(rate, total)))
    }

    async fn rates(&self) -> Result<Arc<Vec<ShippingRate>>, RepositoryError> {
        if let Some(rates) = self.inner.cache.get(&()).await {
            debug!("Cache hit for shipping rates");
            return Ok(rates);
        }

        let rates = Arc::new(ShippingRepository::new(&self.inner.pool).list_all().await?);
        self.inner.cache.insert((), Arc::clone(&rates)).await;
        Ok(rates)
    }
}

/// Turn a configured rate into the option offered for a given order total.
fn offer(rate: &ShippingRate, total: Decimal) -> ShippingOption {
    let free = rate.free_over.is_some_and(|threshold| total >= threshold);
    ShippingOption {
        shipping_type: rate.shipping_type.clone(),
        label: rate.label.clone(),
        cost: if free { Decimal::ZERO } else { rate.cost },
        delivery_window: rate.delivery_window.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(cost: &str, free_over: Option<&str>) -> ShippingRate {
        ShippingRate {
            shipping_type: "standard".to_owned(),
            label: "Standard".to_owned(),
            cost: cost.parse().expect("cost"),
            delivery_window: "3-5 business days".to_owned(),
            free_over: free_over.map(|f| f.parse().expect("threshold")),
        }
    }

    #[test]
    fn test_threshold_met_is_free() {
        let option = offer(&rate("5.99", Some("50.00")), "50.00".parse().unwrap());
        assert_eq!(option.cost, Decimal::ZERO);
    }

    #[test]
    fn test_threshold_not_met_keeps_cost() {
        let option = offer(&rate("5.99", Some("50.00")), "49.99".parse().unwrap());
        assert_eq!(option.cost, "5.99".parse::<Decimal>().unwrap());
    }

    #[test]
    fn test_no_threshold_always_charges() {
        let option = offer(&rate("12.50", None), "500.00".parse().unwrap());
        assert_eq!(option.cost, "12.50".parse::<Decimal>().unwrap());
    }
}
