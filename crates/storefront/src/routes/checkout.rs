//! Checkout route handlers.

use axum::{
    Json,
    extract::{Query, State},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::session_keys;
use crate::services::checkout::{CheckoutHandoff, CheckoutOrchestrator, CheckoutRequest};
use crate::services::promotions::AppliedPromo;
use crate::services::shipping::ShippingOption;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ShippingOptionsQuery {
    /// Order total the free-shipping thresholds are checked against.
    #[serde(default, with = "rust_decimal::serde::str")]
    pub total: Decimal,
}

/// `GET /api/checkout/shipping-options?total=49.99` - available options for
/// an order of the given total.
#[instrument(skip(state))]
pub async fn shipping_options(
    State(state): State<AppState>,
    Query(query): Query<ShippingOptionsQuery>,
) -> Result<Json<Vec<ShippingOption>>> {
    let options = state.shipping().options_for_total(query.total).await?;
    Ok(Json(options))
}

/// `POST /api/checkout/session` - validate the submission and hand off to
/// the hosted payment page. Requires login; guests are asked to sign in
/// before checkout.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create_session(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CheckoutHandoff>> {
    let applied: Option<AppliedPromo> = session.get(session_keys::APPLIED_PROMO).await?;

    let orchestrator = CheckoutOrchestrator::new(
        state.pool(),
        state.payments(),
        state.shipping(),
        &state.config().base_url,
    );
    let handoff = orchestrator.submit(&user, applied.as_ref(), &request).await?;

    Ok(Json(handoff))
}
