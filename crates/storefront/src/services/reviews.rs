//! Review mutations and the rating recompute they trigger.
//!
//! The review write is the operation the caller asked for; the recompute is a
//! follow-up. A failed recompute is logged and reported to Sentry but never
//! turns a successful write into an error. The next successful mutation on
//! the same product reconciles the rating.

use chrono::{DateTime, Utc};
use thiserror::Error;

use essence_core::{NewReview, ProductId, Review, ReviewId, ReviewPatch, ReviewValidationError};

use crate::db::{ProductRepository, RepositoryError, ReviewRepository};
use crate::services::ratings::{ProductLocks, RatingAggregator};

/// Errors from review operations.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error(transparent)]
    Invalid(#[from] ReviewValidationError),

    #[error("Review not found")]
    NotFound,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Review operations.
pub struct ReviewService<'a> {
    reviews: &'a dyn ReviewRepository,
    ratings: RatingAggregator<'a>,
}

impl<'a> ReviewService<'a> {
    #[must_use]
    pub const fn new(
        reviews: &'a dyn ReviewRepository,
        products: &'a dyn ProductRepository,
        locks: &'a ProductLocks,
    ) -> Self {
        Self {
            reviews,
            ratings: RatingAggregator::new(reviews, products, locks),
        }
    }

    /// Reviews of a product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if storage fails.
    pub async fn list_by_product(&self, product_id: &ProductId) -> Result<Vec<Review>, RepositoryError> {
        self.reviews.find_by_product(product_id).await
    }

    /// Validate and store a review, then refresh the product's rating.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::Invalid` listing missing fields, or
    /// `ReviewError::Repository` if the insert fails.
    #[tracing::instrument(skip_all)]
    pub async fn create(&self, input: NewReview, now: DateTime<Utc>) -> Result<Review, ReviewError> {
        let review = input.validate(ReviewId::generate(), now)?;
        self.reviews.insert(&review).await?;
        tracing::info!(
            review_id = %review.id,
            product_id = %review.product_id,
            rating = review.rating.get(),
            "Review created"
        );

        self.refresh_rating(review.product_id).await;
        Ok(review)
    }

    /// Apply `patch` to a review, then refresh the product's rating.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::NotFound` if no review has this id.
    #[tracing::instrument(skip(self, patch), fields(review_id = %id))]
    pub async fn update(
        &self,
        id: &ReviewId,
        patch: &ReviewPatch,
        now: DateTime<Utc>,
    ) -> Result<Review, ReviewError> {
        let review = self
            .reviews
            .update(id, patch, now)
            .await?
            .ok_or(ReviewError::NotFound)?;

        self.refresh_rating(review.product_id).await;
        Ok(review)
    }

    /// Delete a review, then refresh the product's rating.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::NotFound` if no review has this id.
    #[tracing::instrument(skip(self), fields(review_id = %id))]
    pub async fn delete(&self, id: &ReviewId) -> Result<Review, ReviewError> {
        let review = self.reviews.delete(id).await?.ok_or(ReviewError::NotFound)?;
        tracing::info!(product_id = %review.product_id, "Review deleted");

        self.refresh_rating(review.product_id).await;
        Ok(review)
    }

    async fn refresh_rating(&self, product_id: ProductId) {
        if let Err(e) = self.ratings.recompute(product_id).await {
            tracing::error!(error = %e, product_id = %product_id, "Rating recompute failed");
        }
    }
}
