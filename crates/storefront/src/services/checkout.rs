//! Checkout orchestration.
//!
//! Validates the shopper's inputs, re-derives every money amount from the
//! live catalog and the session's applied promo (client-sent prices are never
//! trusted), and hands off to the hosted payment provider. Validation
//! failures are collected into a field-keyed map and returned all at once so
//! the client can render inline messages; the provider is only called once
//! every check passes.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use marigold_core::{
    AddressId, CartTotals, CurrencyCode, Discount, Email, EmailError, LineDetail, Money, UserId,
    compute_totals,
};

use crate::db::{AddressRepository, CollectionKind};
use crate::error::AppError;
use crate::models::address::Address;
use crate::models::user::CurrentUser;
use crate::services::carts::CartService;
use crate::services::payments::{
    PaymentClient, PaymentLineItem, PaymentSession, PaymentSessionRequest,
};
use crate::services::promotions::{AppliedPromo, PromoError, PromotionEvaluator};
use crate::services::shipping::{ShippingOption, ShippingService};

/// Field-keyed validation failures, serialized as a flat JSON object.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct FieldErrors {
    errors: BTreeMap<&'static str, String>,
}

impl FieldErrors {
    /// Record a failure for a field. A later insert for the same field wins.
    pub fn insert(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.insert(field, message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Checkout submission from the client. Only identities and the contact
/// email cross the wire; prices are recomputed server-side.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub email: String,
    /// Explicit address choice; falls back to the default, then first, address.
    pub address_id: Option<AddressId>,
    /// Selected shipping tier (`shipping_type` from the options endpoint).
    pub shipping_type: Option<String>,
}

/// Successful handoff to the hosted payment page.
#[derive(Debug, Serialize)]
pub struct CheckoutHandoff {
    pub session_id: String,
    pub checkout_url: String,
}

/// Orchestrates validation, pricing, and the payment-provider handoff.
pub struct CheckoutOrchestrator<'a> {
    pool: &'a PgPool,
    payments: &'a PaymentClient,
    shipping: &'a ShippingService,
    base_url: &'a str,
}

impl<'a> CheckoutOrchestrator<'a> {
    /// Create a new orchestrator.
    #[must_use]
    pub const fn new(
        pool: &'a PgPool,
        payments: &'a PaymentClient,
        shipping: &'a ShippingService,
        base_url: &'a str,
    ) -> Self {
        Self {
            pool,
            payments,
            shipping,
            base_url,
        }
    }

    /// Run the full checkout: validate, price, and create a payment session.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for an empty cart,
    /// `AppError::Validation` with every field failure at once, and
    /// `AppError::Payment` when the provider call fails (the shopper may
    /// retry).
    #[instrument(skip(self, user, applied_promo, request), fields(user_id = %user.id))]
    pub async fn submit(
        &self,
        user: &CurrentUser,
        applied_promo: Option<&AppliedPromo>,
        request: &CheckoutRequest,
    ) -> Result<CheckoutHandoff, AppError> {
        let carts = CartService::new(self.pool);
        let lines = carts.fetch_user(user.id, CollectionKind::Cart).await?;
        let details = carts.enrich(&lines).await?;
        if details.is_empty() {
            return Err(AppError::BadRequest("Your cart is empty".to_owned()));
        }

        // Stale promos (expired since apply, cart changed) silently fall away
        // rather than blocking checkout.
        let discount = self.revalidate_promo(applied_promo, &details).await?;
        let totals = compute_totals(&details, &discount);

        let email = Email::parse(&request.email);
        let address = self.resolve_address(user.id, request.address_id).await?;
        let shipping = self
            .resolve_shipping(request.shipping_type.as_deref(), totals.total)
            .await?;

        let ValidatedInputs {
            email,
            address,
            shipping,
        } = validate_inputs(email, address, shipping).map_err(AppError::Validation)?;

        let session = self
            .create_session(&email, &details, &discount, &totals, &shipping)
            .await?;

        info!(
            session_id = %session.id,
            address_id = %address.id,
            shipping_type = %shipping.shipping_type,
            grand_total = %Money::usd(totals.grand_total(shipping.cost)),
            "Checkout handed off to payment provider"
        );

        Ok(CheckoutHandoff {
            session_id: session.id,
            checkout_url: session.url,
        })
    }

    /// Re-evaluate the session promo against the current cart. A promo that
    /// no longer applies degrades to no discount.
    async fn revalidate_promo(
        &self,
        applied: Option<&AppliedPromo>,
        details: &[LineDetail],
    ) -> Result<Discount, AppError> {
        let Some(applied) = applied else {
            return Ok(Discount::None);
        };

        let evaluator = PromotionEvaluator::new(self.pool);
        match evaluator.apply_code(&applied.code, details).await {
            Ok(promo) => Ok(promo.discount),
            Err(PromoError::Repository(e)) => Err(AppError::Database(e)),
            Err(e) => {
                warn!(code = %applied.code, error = %e, "Applied promo no longer valid, dropping");
                Ok(Discount::None)
            }
        }
    }

    /// Explicit choice first, then the default address, then the first one.
    async fn resolve_address(
        &self,
        user_id: UserId,
        address_id: Option<AddressId>,
    ) -> Result<Option<Address>, AppError> {
        let repo = AddressRepository::new(self.pool);
        let address = match address_id {
            Some(id) => repo.find_for_user(user_id, id).await?,
            None => repo.default_or_first(user_id).await?,
        };
        Ok(address)
    }

    async fn resolve_shipping(
        &self,
        shipping_type: Option<&str>,
        total: Decimal,
    ) -> Result<Option<ShippingOption>, AppError> {
        let Some(shipping_type) = shipping_type.filter(|s| !s.trim().is_empty()) else {
            return Ok(None);
        };
        Ok(self.shipping.find_option(shipping_type, total).await?)
    }

    async fn create_session(
        &self,
        email: &Email,
        details: &[LineDetail],
        discount: &Discount,
        totals: &CartTotals,
        shipping: &ShippingOption,
    ) -> Result<PaymentSession, AppError> {
        let request = PaymentSessionRequest {
            currency: CurrencyCode::USD,
            line_items: line_items(details, discount),
            shipping_label: shipping.label.clone(),
            shipping_amount: shipping.cost,
            discount_amount: fixed_discount_amount(totals, discount),
            customer_email: email.as_str().to_owned(),
            success_url: format!("{}/checkout/success", self.base_url),
            cancel_url: format!("{}/checkout", self.base_url),
            idempotency_key: Uuid::new_v4(),
        };

        Ok(self.payments.create_checkout_session(&request).await?)
    }
}

/// The resolved inputs checkout needs before the provider may be called.
struct ValidatedInputs {
    email: Email,
    address: Address,
    shipping: ShippingOption,
}

/// The validation gate. Every failing field is recorded before returning so
/// the client sees the complete error map in one response; the payment
/// provider is only reachable through the `Ok` arm.
fn validate_inputs(
    email: Result<Email, EmailError>,
    address: Option<Address>,
    shipping: Option<ShippingOption>,
) -> Result<ValidatedInputs, FieldErrors> {
    let mut errors = FieldErrors::default();

    let email = match email {
        Ok(email) => Some(email),
        Err(_) => {
            errors.insert("email", "Enter a valid email address");
            None
        }
    };
    if address.is_none() {
        errors.insert("address", "Select a shipping address");
    }
    if shipping.is_none() {
        errors.insert("shipping_option", "Select a shipping option");
    }

    match (email, address, shipping) {
        (Some(email), Some(address), Some(shipping)) => Ok(ValidatedInputs {
            email,
            address,
            shipping,
        }),
        _ => Err(errors),
    }
}

/// Provider line items. Per-line discounts are baked into the unit amounts;
/// a fixed discount travels separately as `discount_amount`.
fn line_items(details: &[LineDetail], discount: &Discount) -> Vec<PaymentLineItem> {
    details
        .iter()
        .map(|line| PaymentLineItem {
            name: format!("{} - {}", line.product_name, line.variant_name),
            unit_amount: discount
                .unit_price_for(&line.key)
                .unwrap_or_else(|| line.effective_unit_price()),
            quantity: line.quantity,
        })
        .collect()
}

/// The cart-level amount the provider should subtract. Only a fixed discount
/// produces one; it is capped at the subtotal, matching the clamped total.
fn fixed_discount_amount(totals: &CartTotals, discount: &Discount) -> Decimal {
    match discount {
        Discount::Fixed { .. } => totals.subtotal - totals.total,
        _ => Decimal::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use marigold_core::{LineDiscount, LineKey, ProductId, VariantId};

    fn address() -> Address {
        Address {
            id: AddressId::new(1),
            user_id: UserId::new(7),
            recipient: "Ada Lovelace".to_owned(),
            line1: "1 Analytical Way".to_owned(),
            line2: None,
            city: "Springfield".to_owned(),
            region: "IL".to_owned(),
            postal_code: "62701".to_owned(),
            country_code: "US".to_owned(),
            is_default: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn standard_shipping() -> ShippingOption {
        ShippingOption {
            shipping_type: "standard".to_owned(),
            label: "Standard".to_owned(),
            cost: "5.99".parse().expect("cost"),
            delivery_window: "3-5 business days".to_owned(),
        }
    }

    fn detail(product: i32, variant: i32, price: &str, quantity: u32) -> LineDetail {
        LineDetail {
            key: LineKey::new(ProductId::new(product), VariantId::new(variant)),
            quantity,
            product_name: "Mug".to_owned(),
            variant_name: "Blue".to_owned(),
            variant_color: Some("blue".to_owned()),
            image_url: None,
            unit_price: price.parse().expect("price"),
            sale_price: None,
        }
    }

    #[test]
    fn test_field_errors_serialize_flat() {
        let mut errors = FieldErrors::default();
        errors.insert("email", "Enter a valid email address");
        errors.insert("shipping_option", "Select a shipping option");

        let json = serde_json::to_value(&errors).expect("serialize");
        assert_eq!(json["email"], "Enter a valid email address");
        assert_eq!(json["shipping_option"], "Select a shipping option");
    }

    #[test]
    fn test_field_errors_last_insert_wins() {
        let mut errors = FieldErrors::default();
        errors.insert("email", "first");
        errors.insert("email", "second");
        let json = serde_json::to_value(&errors).expect("serialize");
        assert_eq!(json["email"], "second");
    }

    #[test]
    fn test_validation_collects_every_failing_field() {
        let result = validate_inputs(Email::parse("not-an-email"), None, None);

        let errors = result.err().expect("all three fields should fail");
        let json = serde_json::to_value(&errors).expect("serialize");
        let map = json.as_object().expect("flat object");
        assert_eq!(map.len(), 3);
        assert_eq!(json["email"], "Enter a valid email address");
        assert_eq!(json["address"], "Select a shipping address");
        assert_eq!(json["shipping_option"], "Select a shipping option");
    }

    #[test]
    fn test_validation_flags_only_failing_fields() {
        let result = validate_inputs(
            Email::parse("ada@example.com"),
            Some(address()),
            None,
        );

        let errors = result.err().expect("shipping is missing");
        let json = serde_json::to_value(&errors).expect("serialize");
        let map = json.as_object().expect("flat object");
        assert_eq!(map.len(), 1);
        assert_eq!(json["shipping_option"], "Select a shipping option");
    }

    #[test]
    fn test_validation_passes_resolved_inputs_through() {
        let validated = validate_inputs(
            Email::parse("ada@example.com"),
            Some(address()),
            Some(standard_shipping()),
        )
        .expect("valid inputs");

        assert_eq!(validated.email.as_str(), "ada@example.com");
        assert_eq!(validated.address.id, AddressId::new(1));
        assert_eq!(validated.shipping.shipping_type, "standard");
    }

    #[test]
    fn test_line_items_bake_in_per_line_discounts() {
        let details = vec![detail(1, 1, "20.00", 2), detail(2, 2, "10.00", 1)];
        let discount = Discount::PerLine {
            lines: vec![LineDiscount {
                key: details[0].key,
                discounted_unit_price: "15.00".parse().expect("price"),
            }],
        };

        let items = line_items(&details, &discount);
        assert_eq!(items[0].unit_amount, "15.00".parse().unwrap());
        assert_eq!(items[0].quantity, 2);
        assert_eq!(items[1].unit_amount, "10.00".parse().unwrap());
    }

    #[test]
    fn test_fixed_discount_amount_matches_clamped_total() {
        let details = vec![detail(1, 1, "10.00", 1)];
        let discount = Discount::Fixed {
            amount: "25.00".parse().expect("amount"),
        };
        let totals = compute_totals(&details, &discount);
        // Clamped: the provider must not try to subtract more than the subtotal.
        assert_eq!(
            fixed_discount_amount(&totals, &discount),
            "10.00".parse::<Decimal>().unwrap()
        );
    }

    #[test]
    fn test_no_cart_level_amount_for_per_line_discounts() {
        let details = vec![detail(1, 1, "10.00", 1)];
        let discount = Discount::PerLine {
            lines: vec![LineDiscount {
                key: details[0].key,
                discounted_unit_price: "8.00".parse().expect("price"),
            }],
        };
        let totals = compute_totals(&details, &discount);
        assert_eq!(fixed_discount_amount(&totals, &discount), Decimal::ZERO);
    }
}
