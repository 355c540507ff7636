//! Promo code route handlers.
//!
//! The applied discount lives in the session. A failed apply leaves whatever
//! was applied before untouched; clear always succeeds.

use axum::{Json, extract::State, http::HeaderMap};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use marigold_core::compute_totals;

use crate::db::CollectionKind;
use crate::error::Result;
use crate::middleware::OptionalAuth;
use crate::models::session_keys;
use crate::services::carts::CartService;
use crate::services::promotions::PromotionEvaluator;
use crate::state::AppState;

use super::cart::load_lines;

#[derive(Debug, Deserialize)]
pub struct ApplyPromoBody {
    pub code: String,
}

/// Body after a successful apply: the canonical code and the new totals.
#[derive(Debug, Serialize)]
pub struct ApplyPromoResponse {
    pub code: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub total: Decimal,
}

/// `POST /api/promo/apply` - evaluate a code against the current cart and
/// store the discount in the session.
#[instrument(skip_all)]
pub async fn apply(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    headers: HeaderMap,
    Json(body): Json<ApplyPromoBody>,
) -> Result<Json<ApplyPromoResponse>> {
    let lines = load_lines(&state, user.as_ref(), &headers, CollectionKind::Cart).await?;
    let details = CartService::new(state.pool()).enrich(&lines).await?;

    // Errors propagate before the session is touched, so a bad code cannot
    // clobber a previously applied one.
    let applied = PromotionEvaluator::new(state.pool())
        .apply_code(&body.code, &details)
        .await?;

    session
        .insert(session_keys::APPLIED_PROMO, &applied)
        .await?;

    let totals = compute_totals(&details, &applied.discount);
    Ok(Json(ApplyPromoResponse {
        code: applied.code,
        subtotal: totals.subtotal,
        total: totals.total,
    }))
}

/// `POST /api/promo/clear` - drop the applied discount.
#[instrument(skip_all)]
pub async fn clear(session: Session) -> Result<Json<serde_json::Value>> {
    session
        .remove::<crate::services::promotions::AppliedPromo>(session_keys::APPLIED_PROMO)
        .await?;
    Ok(Json(serde_json::json!({ "cleared": true })))
}
