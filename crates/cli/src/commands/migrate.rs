//! Database migration command.
//!
//! Applies the storefront migrations from `crates/storefront/migrations/`.
//! The tower-sessions table is not managed here; the storefront binary
//! migrates its own session store at startup.

/// Run storefront database migrations.
///
/// # Errors
///
/// Returns an error when the database is unreachable or a migration fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;

    tracing::info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    tracing::info!("Storefront migrations complete!");
    Ok(())
}
