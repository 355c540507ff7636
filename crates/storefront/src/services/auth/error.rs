//! Authentication errors.

use thiserror::Error;

use marigold_core::EmailError;

use crate::db::RepositoryError;

/// Errors from authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Email/password pair did not match an account.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Registration attempted with an email that already has an account.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password failed the minimum-strength check.
    #[error("{0}")]
    WeakPassword(String),

    /// Email failed shape validation.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Password hashing library failure.
    #[error("password hashing error: {0}")]
    Hash(String),

    /// Database failure.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}
