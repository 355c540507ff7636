//! Cart reconciliation for authenticated users.
//!
//! Authenticated carts live in Postgres and are mutated read-modify-write:
//! fetch the stored set, apply one mutation, write the whole set back. The
//! enriched view is recomputed from the live catalog on every fetch so stale
//! prices never leave the server.
//!
//! Guest carts never touch this service; they live in mirror cookies (see
//! `models::guest_cart`) and are folded in once at login via
//! [`CartService::merge_on_login`].

use sqlx::PgPool;
use tracing::{info, instrument};

use marigold_core::{LineDetail, LineSet, UserId};

use crate::db::{CartRepository, CatalogRepository, CollectionKind, RepositoryError};

/// Server-side cart and wishlist operations for authenticated users.
pub struct CartService<'a> {
    pool: &'a PgPool,
}

impl<'a> CartService<'a> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Fetch a user's stored lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the read fails.
    pub async fn fetch_user(
        &self,
        user_id: UserId,
        kind: CollectionKind,
    ) -> Result<LineSet, RepositoryError> {
        CartRepository::new(self.pool).get(user_id, kind).await
    }

    /// Apply one mutation to a user's stored lines and persist the result.
    ///
    /// The whole collection is rewritten; last write wins.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the read or write fails.
    #[instrument(skip(self, mutate))]
    pub async fn mutate_user(
        &self,
        user_id: UserId,
        kind: CollectionKind,
        mutate: impl FnOnce(&mut LineSet),
    ) -> Result<LineSet, RepositoryError> {
        let repo = CartRepository::new(self.pool);
        let mut lines = repo.get(user_id, kind).await?;
        mutate(&mut lines);
        repo.replace(user_id, kind, &lines).await?;
        Ok(lines)
    }

    /// Enrich stored lines with live catalog data. Lines whose product or
    /// variant is gone from the catalog are silently dropped from the view.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the catalog read fails.
    pub async fn enrich(&self, lines: &LineSet) -> Result<Vec<LineDetail>, RepositoryError> {
        CatalogRepository::new(self.pool).line_details(lines).await
    }

    /// Fold guest mirror-cookie lines into a user's stored collections at
    /// login. Union by line identity; where both sides have a line the stored
    /// quantity wins (quantities are not summed). Guest-only lines keep their
    /// cookie order, appended after the stored lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any read or write fails.
    #[instrument(skip(self, guest_cart, guest_wishlist))]
    pub async fn merge_on_login(
        &self,
        user_id: UserId,
        guest_cart: &LineSet,
        guest_wishlist: &LineSet,
    ) -> Result<(), RepositoryError> {
        self.merge_collection(user_id, CollectionKind::Cart, guest_cart)
            .await?;
        self.merge_collection(user_id, CollectionKind::Wishlist, guest_wishlist)
            .await?;
        Ok(())
    }

    async fn merge_collection(
        &self,
        user_id: UserId,
        kind: CollectionKind,
        guest: &LineSet,
    ) -> Result<(), RepositoryError> {
        if guest.is_empty() {
            return Ok(());
        }

        let repo = CartRepository::new(self.pool);
        let mut stored = repo.get(user_id, kind).await?;
        let before = stored.len();
        stored.merge_from_guest(guest);

        info!(
            user_id = %user_id,
            kind = kind.as_str(),
            merged = stored.len() - before,
            "Merged guest lines at login"
        );
        repo.replace(user_id, kind, &stored).await
    }
}
