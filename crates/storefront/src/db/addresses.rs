//! Address repository.
//!
//! A user may hold several addresses with at most one marked default.
//! `set_default` clears the previous default in the same transaction so the
//! mutual-exclusion invariant can never be observed broken.

use sqlx::PgPool;

use marigold_core::{AddressId, UserId};

use super::RepositoryError;
use crate::models::address::Address;

/// Repository for user addresses.
pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    /// Create a new address repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List a user's addresses, default first, then oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Address>, RepositoryError> {
        let rows = sqlx::query_as::<_, Address>(
            r"
            SELECT id, user_id, recipient, line1, line2, city, region, postal_code,
                   country_code, is_default, created_at, updated_at
            FROM addresses
            WHERE user_id = $1
            ORDER BY is_default DESC, created_at ASC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Fetch one of the user's addresses by ID.
    ///
    /// Ownership is enforced in the query: an address belonging to another
    /// user is simply not found.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_for_user(
        &self,
        user_id: UserId,
        address_id: AddressId,
    ) -> Result<Option<Address>, RepositoryError> {
        let row = sqlx::query_as::<_, Address>(
            r"
            SELECT id, user_id, recipient, line1, line2, city, region, postal_code,
                   country_code, is_default, created_at, updated_at
            FROM addresses
            WHERE user_id = $1 AND id = $2
            ",
        )
        .bind(user_id)
        .bind(address_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// The user's default address, or the oldest one when no default is set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn default_or_first(
        &self,
        user_id: UserId,
    ) -> Result<Option<Address>, RepositoryError> {
        let row = sqlx::query_as::<_, Address>(
            r"
            SELECT id, user_id, recipient, line1, line2, city, region, postal_code,
                   country_code, is_default, created_at, updated_at
            FROM addresses
            WHERE user_id = $1
            ORDER BY is_default DESC, created_at ASC
            LIMIT 1
            ",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Mark one address as the default, clearing any previous default.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the address does not exist or
    /// does not belong to the user.
    /// Returns `RepositoryError::Database` if the transaction fails.
    pub async fn set_default(
        &self,
        user_id: UserId,
        address_id: AddressId,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            UPDATE addresses
            SET is_default = FALSE, updated_at = NOW()
            WHERE user_id = $1 AND is_default
            ",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let updated = sqlx::query(
            r"
            UPDATE addresses
            SET is_default = TRUE, updated_at = NOW()
            WHERE user_id = $1 AND id = $2
            ",
        )
        .bind(user_id)
        .bind(address_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(RepositoryError::Conflict(
                "address not found for user".to_owned(),
            ));
        }

        tx.commit().await?;
        Ok(())
    }
}
