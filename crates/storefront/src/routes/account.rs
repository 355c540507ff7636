//! Account route handlers (all require authentication).

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use marigold_core::AddressId;

use crate::db::{AddressRepository, RepositoryError, UserRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{Address, User};
use crate::state::AppState;

/// Profile body: the account plus its addresses, default first.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub user: User,
    pub addresses: Vec<Address>,
}

#[derive(Debug, Deserialize)]
pub struct SetDefaultAddressBody {
    pub address_id: AddressId,
}

/// `GET /api/account` - the authenticated user's profile and addresses,
/// re-fetched so a stale session cannot serve stale data.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<AccountResponse>> {
    let stored = UserRepository::new(state.pool())
        .find_by_id(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("account".to_owned()))?;
    let addresses = AddressRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;

    Ok(Json(AccountResponse {
        user: stored,
        addresses,
    }))
}

/// `GET /api/account/addresses` - the user's addresses, default first.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn addresses(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Address>>> {
    let addresses = AddressRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;
    Ok(Json(addresses))
}

/// `POST /api/account/addresses/default` - make one address the default.
/// Ownership is enforced in the repository; a foreign id reads as not found.
#[instrument(skip_all, fields(user_id = %user.id, address_id = %body.address_id))]
pub async fn set_default_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<SetDefaultAddressBody>,
) -> Result<Json<Vec<Address>>> {
    let repo = AddressRepository::new(state.pool());
    match repo.set_default(user.id, body.address_id).await {
        Ok(()) => {}
        Err(RepositoryError::Conflict(_)) => {
            return Err(AppError::NotFound("address".to_owned()));
        }
        Err(e) => return Err(e.into()),
    }

    Ok(Json(repo.list_for_user(user.id).await?))
}
