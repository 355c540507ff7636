//! Persisted cart and wishlist lines.
//!
//! Both collections share one table and one persistence pattern: the client
//! of this repository always writes the whole line list, never a delta.
//! Last write wins; the blast radius is a single user's own cart, so no
//! optimistic-concurrency token is kept.

use sqlx::PgPool;

use marigold_core::{LineKey, LineQuantity, LineSet, ProductId, UserId, VariantId};

use super::RepositoryError;

/// Which persisted collection a query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    Cart,
    Wishlist,
}

impl CollectionKind {
    /// Database discriminator value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cart => "cart",
            Self::Wishlist => "wishlist",
        }
    }

    /// Guest mirror cookie name for this collection.
    #[must_use]
    pub const fn cookie_name(self) -> &'static str {
        match self {
            Self::Cart => "cart",
            Self::Wishlist => "wishlist",
        }
    }
}

#[derive(sqlx::FromRow)]
struct LineRow {
    product_id: i32,
    variant_id: i32,
    quantity: i32,
}

/// Repository for persisted cart/wishlist lines.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Fetch a user's lines in stored order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        user_id: UserId,
        kind: CollectionKind,
    ) -> Result<LineSet, RepositoryError> {
        let rows = sqlx::query_as::<_, LineRow>(
            r"
            SELECT product_id, variant_id, quantity
            FROM cart_lines
            WHERE user_id = $1 AND kind = $2
            ORDER BY position ASC
            ",
        )
        .bind(user_id)
        .bind(kind.as_str())
        .fetch_all(self.pool)
        .await?;

        let lines = rows
            .into_iter()
            .map(|r| {
                LineQuantity::new(
                    LineKey::new(ProductId::new(r.product_id), VariantId::new(r.variant_id)),
                    u32::try_from(r.quantity).unwrap_or(0),
                )
            })
            .collect();

        // sanitize drops any zero-quantity rows that should not exist
        Ok(LineSet::sanitize(lines))
    }

    /// Replace a user's lines with the given set (whole-collection write).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the transaction fails.
    pub async fn replace(
        &self,
        user_id: UserId,
        kind: CollectionKind,
        lines: &LineSet,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            DELETE FROM cart_lines
            WHERE user_id = $1 AND kind = $2
            ",
        )
        .bind(user_id)
        .bind(kind.as_str())
        .execute(&mut *tx)
        .await?;

        for (position, line) in lines.iter().enumerate() {
            sqlx::query(
                r"
                INSERT INTO cart_lines (user_id, kind, product_id, variant_id, quantity, position)
                VALUES ($1, $2, $3, $4, $5, $6)
                ",
            )
            .bind(user_id)
            .bind(kind.as_str())
            .bind(line.key.product_id)
            .bind(line.key.variant_id)
            .bind(i32::try_from(line.quantity).unwrap_or(i32::MAX))
            .bind(i32::try_from(position).unwrap_or(i32::MAX))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_kind_discriminators() {
        assert_eq!(CollectionKind::Cart.as_str(), "cart");
        assert_eq!(CollectionKind::Wishlist.as_str(), "wishlist");
        assert_eq!(CollectionKind::Cart.cookie_name(), "cart");
        assert_eq!(CollectionKind::Wishlist.cookie_name(), "wishlist");
    }
}
