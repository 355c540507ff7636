//! Storefront services.
//!
//! Services own the business logic between the HTTP routes and the
//! repositories: cart reconciliation, promotion evaluation, checkout
//! orchestration, shipping tiers, and the payment provider client.

pub mod auth;
pub mod carts;
pub mod checkout;
pub mod payments;
pub mod promotions;
pub mod shipping;
