//! Address model.

use chrono::{DateTime, Utc};
use serde::Serialize;

use marigold_core::{AddressId, UserId};

/// A user's shipping address.
///
/// At most one address per user has `is_default` set; the repository enforces
/// this transactionally.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub recipient: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub region: String,
    pub postal_code: String,
    pub country_code: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
