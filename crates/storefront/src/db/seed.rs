//! Demo catalog.
//!
//! One demo account, eight perfumes, and three reviews on the first perfume.
//! Applied by `essence-cli seed` against empty storage.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;

use essence_core::{
    Category, Email, EmailError, Price, Product, ProductId, Rating, Review, ReviewId, SizeOption,
    UserId,
};

use super::{RepositoryError, Repositories};
use crate::models::user::User;
use crate::services::auth::{AuthError, hash_password};
use crate::services::ratings::{ProductLocks, RatingAggregator, RatingOutcome};

/// Demo account email.
pub const DEMO_EMAIL: &str = "user@example.com";

/// Demo account password.
pub const DEMO_PASSWORD: &str = "password";

/// Errors raised while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("invalid demo email: {0}")]
    Email(#[from] EmailError),

    #[error("cannot hash demo password: {0}")]
    Auth(#[from] AuthError),
}

/// What [`seed`] wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub products: usize,
    pub reviews: usize,
    pub featured_product: ProductId,
    pub featured_rating: Option<Decimal>,
}

struct Perfume {
    name: &'static str,
    brand: &'static str,
    description: &'static str,
    price: i64,
    images: &'static [&'static str],
    category: Category,
    tags: [&'static str; 3],
    rating: Decimal,
    inventory: u32,
    featured: bool,
    sizes: &'static [(&'static str, i64, u32, bool)],
    age_days: i64,
}

const PERFUMES: &[Perfume] = &[
    Perfume {
        name: "Midnight Rose",
        brand: "Lumière",
        description: "A captivating blend of Bulgarian rose, midnight jasmine, and warm amber. This enchanting fragrance opens with fresh bergamot and pink pepper, leading to a heart of rich florals and a base of vanilla and musk.",
        price: 299,
        images: &[
            "https://images.unsplash.com/photo-1594035910387-fea47794261f?auto=format&fit=crop&q=80&w=1000",
            "https://images.unsplash.com/photo-1592945403244-b3fbafd7f539?auto=format&fit=crop&q=80&w=1000",
            "https://images.unsplash.com/photo-1587017539504-67cfbddac569?auto=format&fit=crop&q=80&w=1000",
        ],
        category: Category::Floral,
        tags: ["Rose", "Jasmine", "Amber"],
        rating: Decimal::from_parts(48, 0, 0, false, 1),
        inventory: 15,
        featured: true,
        sizes: &[
            ("30ml", 129, 10, false),
            ("50ml", 199, 15, true),
            ("100ml", 299, 8, false),
        ],
        age_days: 0,
    },
    Perfume {
        name: "Ocean Breeze",
        brand: "Aqua",
        description: "Fresh and invigorating scent with notes of sea salt, citrus, and driftwood. This vibrant fragrance evokes the feeling of a coastal walk on a sunny day, with refreshing top notes of bergamot and lemon, a heart of lavender and marine accord, and a base of driftwood and musk.",
        price: 249,
        images: &[
            "https://images.unsplash.com/photo-1595425964072-458589267fe1?auto=format&fit=crop&q=80&w=1000",
            "https://images.unsplash.com/photo-1551392603-2977e7a14e5c?auto=format&fit=crop&q=80&w=1000",
            "https://images.unsplash.com/photo-1584075796324-61273f228898?auto=format&fit=crop&q=80&w=1000",
        ],
        category: Category::Fresh,
        tags: ["Marine", "Citrus", "Wood"],
        rating: Decimal::from_parts(45, 0, 0, false, 1),
        inventory: 20,
        featured: true,
        sizes: &[
            ("30ml", 99, 12, false),
            ("50ml", 169, 20, true),
            ("100ml", 249, 15, false),
        ],
        age_days: 0,
    },
    Perfume {
        name: "Velvet Oud",
        brand: "Mystique",
        description: "Rich and opulent fragrance featuring rare oud wood, vanilla, and spices. This luxurious oriental scent opens with saffron and cinnamon, develops into a heart of Bulgarian rose and oud, and settles into a rich base of sandalwood, vanilla, and amber.",
        price: 399,
        images: &[
            "https://images.unsplash.com/photo-1557053506-91e1290aa02d?auto=format&fit=crop&q=80&w=1000",
            "https://images.unsplash.com/photo-1559416523-84200b75e841?auto=format&fit=crop&q=80&w=1000",
            "https://images.unsplash.com/photo-1553737487-dd941183f5f3?auto=format&fit=crop&q=80&w=1000",
        ],
        category: Category::Oriental,
        tags: ["Oud", "Spicy", "Vanilla"],
        rating: Decimal::from_parts(49, 0, 0, false, 1),
        inventory: 8,
        featured: true,
        sizes: &[("50ml", 259, 8, false), ("100ml", 399, 5, true)],
        age_days: 0,
    },
    Perfume {
        name: "Citrus Fusion",
        brand: "Zest",
        description: "Vibrant blend of bergamot, lemon, and grapefruit with hints of mint. This refreshing citrus fragrance combines zesty top notes of Italian lemon and bergamot, a heart of mint and green tea, and a base of cedarwood and white musk.",
        price: 199,
        images: &[
            "https://images.unsplash.com/photo-1547887538-e3a2f32cb1cc?auto=format&fit=crop&q=80&w=1000",
            "https://images.unsplash.com/photo-1608528577891-eb055944b1d7?auto=format&fit=crop&q=80&w=1000",
            "https://images.unsplash.com/photo-1558697698-9300a84a0fda?auto=format&fit=crop&q=80&w=1000",
        ],
        category: Category::Citrus,
        tags: ["Bergamot", "Lemon", "Fresh"],
        rating: Decimal::from_parts(46, 0, 0, false, 1),
        inventory: 25,
        featured: true,
        sizes: &[
            ("30ml", 89, 15, false),
            ("50ml", 149, 25, true),
            ("100ml", 199, 10, false),
        ],
        age_days: 0,
    },
    Perfume {
        name: "Amber Twilight",
        brand: "Golden Hour",
        description: "Warm amber combined with vanilla and sandalwood for an evening scent.",
        price: 279,
        images: &[
            "https://images.unsplash.com/photo-1615384424397-fe21e9388eed?auto=format&fit=crop&q=80&w=1000",
        ],
        category: Category::Oriental,
        tags: ["Amber", "Vanilla", "Sandalwood"],
        rating: Decimal::from_parts(47, 0, 0, false, 1),
        inventory: 12,
        featured: false,
        sizes: &[],
        age_days: 0,
    },
    Perfume {
        name: "Wild Lavender",
        brand: "Provence",
        description: "Soothing lavender blended with bergamot and cedar.",
        price: 229,
        images: &[
            "https://images.unsplash.com/photo-1565185748897-7fe4e5a6d6cd?auto=format&fit=crop&q=80&w=1000",
        ],
        category: Category::Aromatic,
        tags: ["Lavender", "Bergamot", "Cedar"],
        rating: Decimal::from_parts(44, 0, 0, false, 1),
        inventory: 18,
        featured: false,
        sizes: &[],
        age_days: 3,
    },
    Perfume {
        name: "Dark Cherry",
        brand: "Berry Essence",
        description: "Rich cherry notes with touches of almond and vanilla.",
        price: 259,
        images: &[
            "https://images.unsplash.com/photo-1575351881847-b3bf188d9d0a?auto=format&fit=crop&q=80&w=1000",
        ],
        category: Category::Fruity,
        tags: ["Cherry", "Almond", "Vanilla"],
        rating: Decimal::from_parts(45, 0, 0, false, 1),
        inventory: 15,
        featured: false,
        sizes: &[],
        age_days: 5,
    },
    Perfume {
        name: "Misty Forest",
        brand: "Woodland",
        description: "Fresh pine, cedar, and earthy moss create this woodland scent.",
        price: 239,
        images: &[
            "https://images.unsplash.com/photo-1612179298507-cbf35b808dcd?auto=format&fit=crop&q=80&w=1000",
        ],
        category: Category::Woody,
        tags: ["Pine", "Cedar", "Moss"],
        rating: Decimal::from_parts(46, 0, 0, false, 1),
        inventory: 22,
        featured: false,
        sizes: &[],
        age_days: 7,
    },
];

const REVIEWS: &[(i64, &str, i64)] = &[
    (
        5,
        "This perfume is absolutely stunning! The rose notes last all day and I receive compliments everywhere I go.",
        0,
    ),
    (
        4,
        "Beautiful scent but a bit pricey. Still, worth the investment for special occasions.",
        1,
    ),
    (
        5,
        "The bottle is gorgeous and the scent is even better. Lasts for hours without fading.",
        2,
    ),
];

/// The demo catalog with fresh ids, "Midnight Rose" first.
#[must_use]
pub fn demo_products(now: DateTime<Utc>) -> Vec<Product> {
    PERFUMES
        .iter()
        .map(|p| Product {
            id: ProductId::generate(),
            name: p.name.to_owned(),
            brand: p.brand.to_owned(),
            description: p.description.to_owned(),
            price: Price::from_units(p.price),
            images: p.images.iter().map(|&s| s.to_owned()).collect(),
            category: p.category,
            tags: p.tags.iter().map(|&s| s.to_owned()).collect(),
            rating: p.rating,
            inventory: p.inventory,
            featured: p.featured,
            size_options: p
                .sizes
                .iter()
                .map(|&(size, price, inventory, is_default)| SizeOption {
                    size: size.to_owned(),
                    price: Some(Price::from_units(price)),
                    inventory: Some(inventory),
                    is_default,
                })
                .collect(),
            created_at: now - Duration::days(p.age_days),
            updated_at: None,
        })
        .collect()
}

/// Reviews of `product_id`; the first is written by `author`.
#[must_use]
pub fn demo_reviews(product_id: ProductId, author: UserId, now: DateTime<Utc>) -> Vec<Review> {
    let authors = [author.to_string(), "user2".to_owned(), "user3".to_owned()];
    REVIEWS
        .iter()
        .zip(authors)
        .filter_map(|(&(rating, comment, age_days), user_id)| {
            Some(Review {
                id: ReviewId::generate(),
                product_id,
                user_id,
                rating: Rating::new(rating).ok()?,
                comment: comment.to_owned(),
                images: Vec::new(),
                verified_purchase: true,
                created_at: now - Duration::days(age_days),
                updated_at: None,
            })
        })
        .collect()
}

/// Write the demo catalog into empty storage.
///
/// The featured product's rating is recomputed from its seeded reviews, so
/// the stored value always matches them.
///
/// # Errors
///
/// Returns `SeedError` if any write fails; a partially seeded store is left
/// as it is.
#[tracing::instrument(skip_all)]
pub async fn seed(repos: &Repositories, now: DateTime<Utc>) -> Result<SeedSummary, SeedError> {
    let user = User {
        id: UserId::generate(),
        name: "Demo User".to_owned(),
        email: Email::parse(DEMO_EMAIL)?,
        password_hash: hash_password(DEMO_PASSWORD)?,
        created_at: now,
    };
    repos.users.insert(&user).await?;

    let products = demo_products(now);
    for product in &products {
        repos.products.insert(product).await?;
    }
    tracing::info!(count = products.len(), "Products seeded");

    let Some(featured) = products.first() else {
        return Err(RepositoryError::NotFound.into());
    };
    let reviews = demo_reviews(featured.id, user.id, now);
    for review in &reviews {
        repos.reviews.insert(review).await?;
    }

    let locks = ProductLocks::default();
    let outcome = RatingAggregator::new(repos.reviews.as_ref(), repos.products.as_ref(), &locks)
        .recompute(featured.id)
        .await?;
    let featured_rating = match outcome {
        RatingOutcome::Updated(rating) => Some(rating),
        RatingOutcome::Unchanged | RatingOutcome::ProductMissing => None,
    };

    tracing::info!(
        product_id = %featured.id,
        rating = ?featured_rating,
        reviews = reviews.len(),
        "Reviews seeded"
    );

    Ok(SeedSummary {
        users: 1,
        products: products.len(),
        reviews: reviews.len(),
        featured_product: featured.id,
        featured_rating,
    })
}

/// Remove every document from the `PostgreSQL` store.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the statement fails.
pub async fn truncate(pool: &PgPool) -> Result<(), RepositoryError> {
    sqlx::query(
        "TRUNCATE storefront.carts, storefront.reviews, storefront.products, storefront.users",
    )
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_catalog_shape() {
        let now = Utc::now();
        let products = demo_products(now);
        assert_eq!(products.len(), 8);
        assert_eq!(products[0].name, "Midnight Rose");
        assert_eq!(products[0].size_options.len(), 3);
        assert!(products.iter().all(|p| !p.images.is_empty()));
        assert_eq!(products[7].created_at, now - Duration::days(7));
        assert_eq!(products.iter().filter(|p| p.featured).count(), 4);
    }

    #[tokio::test]
    async fn test_seed_recomputes_featured_rating() {
        let repos = Repositories::in_memory();
        let summary = seed(&repos, Utc::now()).await.unwrap();

        assert_eq!(summary.products, 8);
        assert_eq!(summary.reviews, 3);
        // (5 + 4 + 5) / 3
        assert_eq!(summary.featured_rating, Some(Decimal::new(467, 2)));

        let product = repos
            .products
            .find_by_id(&summary.featured_product)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(product.rating, Decimal::new(467, 2));

        let reviews = repos
            .reviews
            .find_by_product(&summary.featured_product)
            .await
            .unwrap();
        assert_eq!(reviews.len(), 3);
        assert!(reviews[0].created_at > reviews[2].created_at);
    }

    #[tokio::test]
    async fn test_seed_twice_conflicts_on_demo_user() {
        let repos = Repositories::in_memory();
        seed(&repos, Utc::now()).await.unwrap();
        let err = seed(&repos, Utc::now()).await.unwrap_err();
        assert!(matches!(err, SeedError::Repository(RepositoryError::Conflict(_))));
    }
}
