//! Cart route handlers.
//!
//! Every handler branches on authentication: logged-in carts are read and
//! written through Postgres, guest carts through the mirror cookie. Both
//! paths answer with the same enriched JSON body, so the client renders one
//! shape regardless of login state.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, header},
    response::{AppendHeaders, IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use marigold_core::{
    Discount, LineDetail, LineKey, LineSet, ProductId, VariantId, compute_totals,
};

use crate::db::CollectionKind;
use crate::error::Result;
use crate::middleware::OptionalAuth;
use crate::models::{CurrentUser, guest_cart, session_keys};
use crate::services::carts::CartService;
use crate::services::promotions::AppliedPromo;
use crate::state::AppState;

/// A line reference in a mutation request. `quantity` is absent for remove
/// and defaults to 1 for add; update treats anything at or below zero as
/// removal.
#[derive(Debug, Deserialize)]
pub struct LineBody {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    #[serde(default)]
    pub quantity: Option<i64>,
}

impl LineBody {
    pub(super) fn key(&self) -> LineKey {
        LineKey::new(self.product_id, self.variant_id)
    }

    /// The requested quantity clamped into `u32`, or `default` if absent.
    fn quantity_or(&self, default: u32) -> u32 {
        self.quantity.map_or(default, |q| {
            u32::try_from(q.max(0)).unwrap_or(u32::MAX)
        })
    }
}

/// Enriched cart body shared by every cart endpoint.
#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub lines: Vec<LineDetail>,
    pub total_quantity: u32,
    #[serde(with = "rust_decimal::serde::str")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub total: Decimal,
    pub promo_code: Option<String>,
}

// =============================================================================
// Shared guest/auth plumbing (also used by the wishlist routes)
// =============================================================================

/// The new line set after a mutation, plus the mirror `Set-Cookie` value for
/// guests (`None` for authenticated users).
pub(super) struct MutationOutcome {
    pub lines: LineSet,
    pub set_cookie: Option<String>,
}

/// Load the current lines for a collection: Postgres when logged in, the
/// mirror cookie otherwise.
pub(super) async fn load_lines(
    state: &AppState,
    user: Option<&CurrentUser>,
    headers: &HeaderMap,
    kind: CollectionKind,
) -> Result<LineSet> {
    match user {
        Some(user) => Ok(CartService::new(state.pool()).fetch_user(user.id, kind).await?),
        None => Ok(guest_cart::read_lines(headers, kind)),
    }
}

/// Apply one mutation to a collection and persist it on the right side.
///
/// Guests get a refreshed mirror cookie; an emptied collection gets an
/// explicitly expired one.
pub(super) async fn apply_mutation(
    state: &AppState,
    user: Option<&CurrentUser>,
    headers: &HeaderMap,
    kind: CollectionKind,
    mutate: impl FnOnce(&mut LineSet),
) -> Result<MutationOutcome> {
    match user {
        Some(user) => {
            let lines = CartService::new(state.pool())
                .mutate_user(user.id, kind, mutate)
                .await?;
            Ok(MutationOutcome {
                lines,
                set_cookie: None,
            })
        }
        None => {
            let mut lines = guest_cart::read_lines(headers, kind);
            mutate(&mut lines);

            let secure = state.config().is_secure();
            let cookie = if lines.is_empty() {
                guest_cart::expired_mirror_cookie(kind, secure)
            } else {
                guest_cart::mirror_cookie(kind, &lines, secure)
            };
            Ok(MutationOutcome {
                lines,
                set_cookie: Some(cookie),
            })
        }
    }
}

/// Attach an optional `Set-Cookie` to a JSON body.
pub(super) fn respond<T: Serialize>(body: &T, set_cookie: Option<String>) -> Response {
    match set_cookie {
        Some(cookie) => {
            (AppendHeaders([(header::SET_COOKIE, cookie)]), Json(body)).into_response()
        }
        None => Json(body).into_response(),
    }
}

/// Build the enriched cart body: live catalog data plus the session promo.
async fn cart_response(
    state: &AppState,
    session: &Session,
    lines: &LineSet,
) -> Result<CartResponse> {
    let details = CartService::new(state.pool()).enrich(lines).await?;
    let promo: Option<AppliedPromo> = session.get(session_keys::APPLIED_PROMO).await?;
    let discount = promo
        .as_ref()
        .map_or(Discount::None, |p| p.discount.clone());
    let totals = compute_totals(&details, &discount);

    Ok(CartResponse {
        total_quantity: lines.total_quantity(),
        lines: details,
        subtotal: totals.subtotal,
        total: totals.total,
        promo_code: promo.map(|p| p.code),
    })
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /api/cart` - the enriched cart with totals.
#[instrument(skip_all)]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    headers: HeaderMap,
) -> Result<Response> {
    let lines = load_lines(&state, user.as_ref(), &headers, CollectionKind::Cart).await?;
    let body = cart_response(&state, &session, &lines).await?;
    Ok(Json(body).into_response())
}

/// `POST /api/cart/add` - add a line, merging quantities for an existing key.
#[instrument(skip_all, fields(product_id = %body.product_id, variant_id = %body.variant_id))]
pub async fn add(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    headers: HeaderMap,
    Json(body): Json<LineBody>,
) -> Result<Response> {
    let quantity = body.quantity_or(1);
    let outcome = apply_mutation(&state, user.as_ref(), &headers, CollectionKind::Cart, |lines| {
        lines.add(body.key(), quantity);
    })
    .await?;

    let response = cart_response(&state, &session, &outcome.lines).await?;
    Ok(respond(&response, outcome.set_cookie))
}

/// `POST /api/cart/update` - set a line's quantity; zero or below removes it.
#[instrument(skip_all, fields(product_id = %body.product_id, variant_id = %body.variant_id))]
pub async fn update(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    headers: HeaderMap,
    Json(body): Json<LineBody>,
) -> Result<Response> {
    let quantity = body.quantity_or(0);
    let outcome = apply_mutation(&state, user.as_ref(), &headers, CollectionKind::Cart, |lines| {
        lines.set_quantity(body.key(), quantity);
    })
    .await?;

    let response = cart_response(&state, &session, &outcome.lines).await?;
    Ok(respond(&response, outcome.set_cookie))
}

/// `POST /api/cart/remove` - drop a line entirely.
#[instrument(skip_all, fields(product_id = %body.product_id, variant_id = %body.variant_id))]
pub async fn remove(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    headers: HeaderMap,
    Json(body): Json<LineBody>,
) -> Result<Response> {
    let outcome = apply_mutation(&state, user.as_ref(), &headers, CollectionKind::Cart, |lines| {
        lines.remove(&body.key());
    })
    .await?;

    let response = cart_response(&state, &session, &outcome.lines).await?;
    Ok(respond(&response, outcome.set_cookie))
}

/// `POST /api/cart/clear` - empty the cart. Guests get an expired mirror
/// cookie so the browser copy cannot survive the clear.
#[instrument(skip_all)]
pub async fn clear(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    headers: HeaderMap,
) -> Result<Response> {
    let outcome = apply_mutation(
        &state,
        user.as_ref(),
        &headers,
        CollectionKind::Cart,
        LineSet::clear,
    )
    .await?;

    let response = cart_response(&state, &session, &outcome.lines).await?;
    Ok(respond(&response, outcome.set_cookie))
}
