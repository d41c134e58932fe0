//! Seed the storefront database with demo data.
//!
//! Inserts the demo user (`user@example.com` / `password`), the eight demo
//! perfumes, and three reviews of the first one, whose rating is then
//! recomputed from them.

use chrono::Utc;
use tracing::info;

use essence_storefront::db::{self, Repositories, seed};

use super::migrate::database_url;

/// Seed demo data, optionally wiping every collection first.
///
/// Seeding an already seeded database fails on the demo user's email.
///
/// # Errors
///
/// Returns an error if the URL is missing, the database is unreachable, or
/// any insert fails.
pub async fn demo_data(reset: bool) -> Result<(), Box<dyn std::error::Error>> {
    let database_url = database_url()?;
    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");

    if reset {
        seed::truncate(&pool).await?;
        info!("Cleared users, products, reviews, and carts");
    }

    let repos = Repositories::postgres(pool);
    let summary = seed::seed(&repos, Utc::now()).await?;

    info!("Seeding complete!");
    info!("  Users inserted: {}", summary.users);
    info!("  Products inserted: {}", summary.products);
    info!("  Reviews inserted: {}", summary.reviews);
    match summary.featured_rating {
        Some(rating) => info!("  {} rated {rating}", summary.featured_product),
        None => info!("  {} rating unchanged", summary.featured_product),
    }
    info!("  Demo login: {} / {}", seed::DEMO_EMAIL, seed::DEMO_PASSWORD);

    Ok(())
}
