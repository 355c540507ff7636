//! Wishlist route handlers.
//!
//! Same persistence and guest-mirror pattern as the cart (shared plumbing in
//! `routes::cart`), but wishlists carry no quantities worth pricing: the body
//! is the enriched line list and a count, no totals and no promo.

use axum::{
    Json,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::instrument;

use marigold_core::{LineDetail, LineSet};

use crate::db::CollectionKind;
use crate::error::Result;
use crate::middleware::OptionalAuth;
use crate::services::carts::CartService;
use crate::state::AppState;

use super::cart::{LineBody, apply_mutation, load_lines, respond};

/// Enriched wishlist body.
#[derive(Debug, Serialize)]
pub struct WishlistResponse {
    pub lines: Vec<LineDetail>,
    pub count: usize,
}

async fn wishlist_response(state: &AppState, lines: &LineSet) -> Result<WishlistResponse> {
    let details = CartService::new(state.pool()).enrich(lines).await?;
    Ok(WishlistResponse {
        count: details.len(),
        lines: details,
    })
}

/// `GET /api/wishlist` - the enriched wishlist.
#[instrument(skip_all)]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    headers: HeaderMap,
) -> Result<Response> {
    let lines = load_lines(&state, user.as_ref(), &headers, CollectionKind::Wishlist).await?;
    let body = wishlist_response(&state, &lines).await?;
    Ok(Json(body).into_response())
}

/// `POST /api/wishlist/add` - add a product variant (quantity pinned to 1).
#[instrument(skip_all, fields(product_id = %body.product_id, variant_id = %body.variant_id))]
pub async fn add(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    headers: HeaderMap,
    Json(body): Json<LineBody>,
) -> Result<Response> {
    let outcome = apply_mutation(
        &state,
        user.as_ref(),
        &headers,
        CollectionKind::Wishlist,
        |lines| {
            // A wishlist line is membership, not quantity.
            lines.set_quantity(body.key(), 1);
        },
    )
    .await?;

    let response = wishlist_response(&state, &outcome.lines).await?;
    Ok(respond(&response, outcome.set_cookie))
}

/// `POST /api/wishlist/remove` - drop a line.
#[instrument(skip_all, fields(product_id = %body.product_id, variant_id = %body.variant_id))]
pub async fn remove(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    headers: HeaderMap,
    Json(body): Json<LineBody>,
) -> Result<Response> {
    let outcome = apply_mutation(
        &state,
        user.as_ref(),
        &headers,
        CollectionKind::Wishlist,
        |lines| {
            lines.remove(&body.key());
        },
    )
    .await?;

    let response = wishlist_response(&state, &outcome.lines).await?;
    Ok(respond(&response, outcome.set_cookie))
}

/// `POST /api/wishlist/clear` - empty the wishlist.
#[instrument(skip_all)]
pub async fn clear(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    headers: HeaderMap,
) -> Result<Response> {
    let outcome = apply_mutation(
        &state,
        user.as_ref(),
        &headers,
        CollectionKind::Wishlist,
        LineSet::clear,
    )
    .await?;

    let response = wishlist_response(&state, &outcome.lines).await?;
    Ok(respond(&response, outcome.set_cookie))
}
