//! Authentication route handlers.
//!
//! Register and login both end the guest era for the browser: any guest
//! mirror cookies are folded into the account's stored collections, then
//! expired in the response so the merge cannot replay on the next request.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, header},
    response::{AppendHeaders, IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use crate::db::CollectionKind;
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{clear_current_user, set_current_user};
use crate::models::{CurrentUser, guest_cart};
use crate::services::auth::AuthService;
use crate::services::carts::CartService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CredentialsBody {
    pub email: String,
    pub password: String,
}

/// `POST /api/auth/register` - create an account and sign in.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Json(body): Json<CredentialsBody>,
) -> Result<Response> {
    let user = AuthService::new(state.pool())
        .register(&body.email, &body.password)
        .await?;
    info!(user_id = %user.id, "Account created");

    establish(&state, &session, &headers, CurrentUser::from(&user)).await
}

/// `POST /api/auth/login` - verify credentials and sign in.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Json(body): Json<CredentialsBody>,
) -> Result<Response> {
    let user = AuthService::new(state.pool())
        .login(&body.email, &body.password)
        .await?;

    establish(&state, &session, &headers, CurrentUser::from(&user)).await
}

/// `POST /api/auth/logout` - flush the session (user and applied promo) and
/// clear the Sentry user context.
#[instrument(skip_all)]
pub async fn logout(session: Session) -> Result<Json<serde_json::Value>> {
    clear_current_user(&session).await?;
    session.flush().await?;
    clear_sentry_user();
    Ok(Json(serde_json::json!({ "logged_out": true })))
}

/// Shared login/register tail: rotate the session id, store the user, merge
/// guest mirrors, and expire both mirror cookies in the response.
async fn establish(
    state: &AppState,
    session: &Session,
    headers: &HeaderMap,
    user: CurrentUser,
) -> Result<Response> {
    // New identity, new session id (fixation)
    session.cycle_id().await?;
    set_current_user(session, &user).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));

    let guest_cart = guest_cart::read_lines(headers, CollectionKind::Cart);
    let guest_wishlist = guest_cart::read_lines(headers, CollectionKind::Wishlist);
    // A failed merge must not undo the sign-in: the session already carries
    // the user, so log the loss and respond signed-in with the server cart.
    if let Err(error) = CartService::new(state.pool())
        .merge_on_login(user.id, &guest_cart, &guest_wishlist)
        .await
    {
        warn!(user_id = %user.id, %error, "Guest merge failed during sign-in, keeping stored collections");
    }

    let secure = state.config().is_secure();
    let expired = AppendHeaders([
        (
            header::SET_COOKIE,
            guest_cart::expired_mirror_cookie(CollectionKind::Cart, secure),
        ),
        (
            header::SET_COOKIE,
            guest_cart::expired_mirror_cookie(CollectionKind::Wishlist, secure),
        ),
    ]);

    Ok((expired, Json(user)).into_response())
}
