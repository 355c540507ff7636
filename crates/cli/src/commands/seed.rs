//! Seed the database with demo catalog data.
//!
//! Inserts a small catalog (products and variants, one with an active sale),
//! two promo codes, and three shipping tiers. Intended for local development
//! and demos, not production.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::info;

/// Seed catalog, promotion, and shipping tables.
///
/// With `fresh`, existing rows in those tables are deleted first. User and
/// cart data is never touched.
///
/// # Errors
///
/// Returns an error when the database is unreachable or an insert fails.
pub async fn run(fresh: bool) -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;

    if fresh {
        info!("Clearing existing demo data...");
        sqlx::query("DELETE FROM shipping_rates").execute(&pool).await?;
        sqlx::query("DELETE FROM promotions").execute(&pool).await?;
        sqlx::query("DELETE FROM variants").execute(&pool).await?;
        sqlx::query("DELETE FROM products").execute(&pool).await?;
    }

    seed_catalog(&pool).await?;
    seed_promotions(&pool).await?;
    seed_shipping(&pool).await?;

    info!("Seeding complete!");
    Ok(())
}

async fn seed_catalog(pool: &PgPool) -> Result<(), Box<dyn std::error::Error>> {
    info!("Seeding products and variants...");

    let products: [(&str, &[(&str, Option<&str>, &str, Option<&str>)]); 3] = [
        (
            "Classic Tee",
            &[
                ("S / White", Some("white"), "19.99", None),
                ("M / White", Some("white"), "19.99", None),
                ("M / Black", Some("black"), "21.99", None),
            ],
        ),
        (
            "Canvas Tote",
            &[("One Size", Some("natural"), "34.50", Some("27.60"))],
        ),
        (
            "Enamel Mug",
            &[
                ("350ml / Blue", Some("blue"), "14.00", None),
                ("350ml / Green", Some("green"), "14.00", None),
            ],
        ),
    ];

    let now = Utc::now();
    for (name, variants) in products {
        let (product_id,): (i32,) =
            sqlx::query_as("INSERT INTO products (name) VALUES ($1) RETURNING id")
                .bind(name)
                .fetch_one(pool)
                .await?;

        for (variant_name, color, price, sale) in variants {
            let sale_price: Option<Decimal> = sale.map(str::parse).transpose()?;
            sqlx::query(
                r"
                INSERT INTO variants
                    (product_id, name, color, unit_price, sale_price, sale_starts_at, sale_ends_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ",
            )
            .bind(product_id)
            .bind(variant_name)
            .bind(color)
            .bind(price.parse::<Decimal>()?)
            .bind(sale_price)
            .bind(sale_price.map(|_| now - Duration::days(1)))
            .bind(sale_price.map(|_| now + Duration::days(13)))
            .execute(pool)
            .await?;
        }
    }

    Ok(())
}

async fn seed_promotions(pool: &PgPool) -> Result<(), Box<dyn std::error::Error>> {
    info!("Seeding promotions...");

    // Storewide percentage promo, active for a month
    sqlx::query(
        r"
        INSERT INTO promotions (code, kind, percent, starts_at, ends_at)
        VALUES ('WELCOME10', 'percentage', 10.00, now(), now() + interval '30 days')
        ON CONFLICT (code) DO NOTHING
        ",
    )
    .execute(pool)
    .await?;

    // Fixed amount off, no window
    sqlx::query(
        r"
        INSERT INTO promotions (code, kind, amount)
        VALUES ('FIVEOFF', 'fixed', 5.00)
        ON CONFLICT (code) DO NOTHING
        ",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn seed_shipping(pool: &PgPool) -> Result<(), Box<dyn std::error::Error>> {
    info!("Seeding shipping rates...");

    sqlx::query(
        r"
        INSERT INTO shipping_rates (shipping_type, label, cost, delivery_window, free_over)
        VALUES
            ('standard', 'Standard', 5.99, '3-5 business days', 50.00),
            ('express', 'Express', 12.99, '1-2 business days', NULL),
            ('pickup', 'Store Pickup', 0.00, 'Ready in 2 hours', NULL)
        ON CONFLICT (shipping_type) DO NOTHING
        ",
    )
    .execute(pool)
    .await?;

    Ok(())
}
