//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness check
//! GET  /health/ready                    - Readiness check (database ping)
//!
//! # Cart (guest or authenticated)
//! GET  /api/cart                        - Enriched cart with totals
//! POST /api/cart/add                    - Add/merge a line
//! POST /api/cart/update                 - Set a line quantity (<= 0 removes)
//! POST /api/cart/remove                 - Remove a line
//! POST /api/cart/clear                  - Empty the cart
//!
//! # Wishlist (guest or authenticated)
//! GET  /api/wishlist                    - Enriched wishlist
//! POST /api/wishlist/add                - Add a line
//! POST /api/wishlist/remove             - Remove a line
//! POST /api/wishlist/clear              - Empty the wishlist
//!
//! # Promotions
//! POST /api/promo/apply                 - Evaluate and apply a promo code
//! POST /api/promo/clear                 - Clear the applied discount
//!
//! # Checkout
//! GET  /api/checkout/shipping-options   - Options for an order total
//! POST /api/checkout/session            - Validate and hand off to payments
//!
//! # Auth
//! POST /api/auth/register               - Create account (merges guest cart)
//! POST /api/auth/login                  - Login (merges guest cart)
//! POST /api/auth/logout                 - Logout (flushes session)
//!
//! # Account (requires auth)
//! GET  /api/account                     - Profile with addresses
//! GET  /api/account/addresses           - Address list
//! POST /api/account/addresses/default   - Set the default address
//! ```
//!
//! Guest cart mutations answer with a `Set-Cookie` mirror of the new lines;
//! authenticated mutations persist to Postgres and set no cookie.

pub mod account;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod promo;
pub mod wishlist;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
}

/// Create the wishlist routes router.
pub fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(wishlist::show))
        .route("/add", post(wishlist::add))
        .route("/remove", post(wishlist::remove))
        .route("/clear", post(wishlist::clear))
}

/// Create the promo routes router (rate limited: codes are guessable).
pub fn promo_routes() -> Router<AppState> {
    Router::new()
        .route("/apply", post(promo::apply))
        .route("/clear", post(promo::clear))
        .layer(api_rate_limiter())
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/shipping-options", get(checkout::shipping_options))
        .route("/session", post(checkout::create_session))
}

/// Create the auth routes router (strictly rate limited).
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .layer(auth_rate_limiter())
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::profile))
        .route("/addresses", get(account::addresses))
        .route("/addresses/default", post(account::set_default_address))
}
