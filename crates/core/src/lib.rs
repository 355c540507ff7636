//! Marigold Core - Shared domain types and pure cart logic.
//!
//! This crate provides the types and calculations used across the Marigold
//! components:
//! - `storefront` - Public-facing storefront API
//! - `cli` - Command-line tools for migrations and seed data
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Cart line invariants, discount shapes, and
//! subtotal/total aggregation live here so they can be tested without a
//! running service.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, and money
//! - [`cart`] - Cart line identity, quantities, and collection invariants
//! - [`pricing`] - Discount shapes and pricing aggregation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod pricing;
pub mod types;

pub use cart::{LineDetail, LineKey, LineQuantity, LineSet};
pub use pricing::{CartTotals, Discount, LineDiscount, compute_totals};
pub use types::*;
