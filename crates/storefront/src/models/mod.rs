//! Domain models for the storefront.

pub mod address;
pub mod guest_cart;
pub mod user;

pub use address::Address;
pub use user::{CurrentUser, User};

/// Keys for values stored in the tower-sessions session.
pub mod session_keys {
    /// The authenticated user (`CurrentUser`).
    pub const CURRENT_USER: &str = "current_user";
    /// The applied promo code and its discount (`AppliedPromo`).
    ///
    /// Checkout-session-scoped: cleared on logout and via the promo clear
    /// endpoint so a stale discount cannot leak into a later session.
    pub const APPLIED_PROMO: &str = "applied_promo";
}
