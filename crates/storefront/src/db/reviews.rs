//! Review repository for `PostgreSQL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use essence_core::{ProductId, Rating, Review, ReviewId, ReviewPatch};

use super::{RepositoryError, ReviewRepository, decode_json, encode_json, map_unique_violation};

const INSERT_REVIEW_SQL: &str = r"
    INSERT INTO storefront.reviews
        (id, product_id, user_id, rating, comment, images, verified_purchase, created_at, updated_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
";

const FIND_BY_PRODUCT_SQL: &str = r"
    SELECT id, product_id, user_id, rating, comment, images, verified_purchase, created_at, updated_at
    FROM storefront.reviews
    WHERE product_id = $1
    ORDER BY created_at DESC
";

// COALESCE keeps columns the patch leaves out.
const UPDATE_REVIEW_SQL: &str = r"
    UPDATE storefront.reviews
    SET rating = COALESCE($2, rating),
        comment = COALESCE($3, comment),
        images = COALESCE($4, images),
        verified_purchase = COALESCE($5, verified_purchase),
        updated_at = $6
    WHERE id = $1
    RETURNING id, product_id, user_id, rating, comment, images, verified_purchase, created_at, updated_at
";

const DELETE_REVIEW_SQL: &str = r"
    DELETE FROM storefront.reviews
    WHERE id = $1
    RETURNING id, product_id, user_id, rating, comment, images, verified_purchase, created_at, updated_at
";

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: ReviewId,
    product_id: ProductId,
    user_id: String,
    rating: i16,
    comment: String,
    images: serde_json::Value,
    verified_purchase: bool,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = RepositoryError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        let rating = Rating::new(i64::from(row.rating))
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid rating in database: {e}")))?;
        Ok(Self {
            id: row.id,
            product_id: row.product_id,
            user_id: row.user_id,
            rating,
            comment: row.comment,
            images: decode_json(row.images, "review images")?,
            verified_purchase: row.verified_purchase,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for product reviews.
pub struct PgReviewRepository {
    pool: PgPool,
}

impl PgReviewRepository {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewRepository for PgReviewRepository {
    async fn insert(&self, review: &Review) -> Result<(), RepositoryError> {
        sqlx::query(INSERT_REVIEW_SQL)
            .bind(review.id)
            .bind(review.product_id)
            .bind(&review.user_id)
            .bind(i16::from(review.rating.get()))
            .bind(&review.comment)
            .bind(encode_json(&review.images, "review images")?)
            .bind(review.verified_purchase)
            .bind(review.created_at)
            .bind(review.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, "review"))?;
        Ok(())
    }

    async fn find_by_product(&self, product_id: &ProductId) -> Result<Vec<Review>, RepositoryError> {
        sqlx::query_as::<_, ReviewRow>(FIND_BY_PRODUCT_SQL)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Review::try_from)
            .collect()
    }

    async fn update(
        &self,
        id: &ReviewId,
        patch: &ReviewPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Review>, RepositoryError> {
        let images = patch
            .images
            .as_ref()
            .map(|images| encode_json(images, "review images"))
            .transpose()?;
        sqlx::query_as::<_, ReviewRow>(UPDATE_REVIEW_SQL)
            .bind(id)
            .bind(patch.rating.map(|r| i16::from(r.get())))
            .bind(patch.comment.as_deref())
            .bind(images)
            .bind(patch.verified_purchase)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?
            .map(Review::try_from)
            .transpose()
    }

    async fn delete(&self, id: &ReviewId) -> Result<Option<Review>, RepositoryError> {
        sqlx::query_as::<_, ReviewRow>(DELETE_REVIEW_SQL)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Review::try_from)
            .transpose()
    }
}
