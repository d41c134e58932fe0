//! Product reviews.

use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{ProductId, ReviewId};

/// The rating was not a whole number from 1 to 5.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("rating must be a whole number between 1 and 5, got {0}")]
pub struct RatingError(pub i64);

/// A star rating between 1 and 5 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Build a rating, rejecting values outside 1..=5.
    ///
    /// # Errors
    ///
    /// Returns [`RatingError`] for out-of-range values.
    pub fn new(value: i64) -> Result<Self, RatingError> {
        u8::try_from(value)
            .ok()
            .filter(|v| (Self::MIN..=Self::MAX).contains(v))
            .map(Self)
            .ok_or(RatingError(value))
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = RatingError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: ReviewId,
    pub product_id: ProductId,
    /// Reviewer reference as supplied by the client; not tied to an account.
    pub user_id: String,
    pub rating: Rating,
    pub comment: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub verified_purchase: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Errors raised while validating a [`NewReview`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ReviewValidationError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
}

/// Review creation payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    pub product_id: Option<ProductId>,
    pub user_id: Option<String>,
    pub rating: Option<Rating>,
    pub comment: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub verified_purchase: bool,
}

impl NewReview {
    /// Check required fields and build a review stamped with `id` and `now`.
    ///
    /// # Errors
    ///
    /// Lists every missing or blank required field.
    pub fn validate(self, id: ReviewId, now: DateTime<Utc>) -> Result<Review, ReviewValidationError> {
        let user_id = self.user_id.filter(|u| !u.trim().is_empty());
        let comment = self.comment.filter(|c| !c.trim().is_empty());

        match (self.product_id, user_id, self.rating, comment) {
            (Some(product_id), Some(user_id), Some(rating), Some(comment)) => Ok(Review {
                id,
                product_id,
                user_id,
                rating,
                comment,
                images: self.images,
                verified_purchase: self.verified_purchase,
                created_at: now,
                updated_at: None,
            }),
            (product_id, user_id, rating, comment) => {
                let missing = [
                    ("productId", product_id.is_none()),
                    ("userId", user_id.is_none()),
                    ("rating", rating.is_none()),
                    ("comment", comment.is_none()),
                ]
                .into_iter()
                .filter_map(|(field, absent)| absent.then_some(field))
                .collect();
                Err(ReviewValidationError::MissingFields(missing))
            }
        }
    }
}

/// Partial update of a review.
///
/// The product a review belongs to and its author cannot be changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_purchase: Option<bool>,
}

impl ReviewPatch {
    /// Apply the present fields to `review` and stamp `updated_at`.
    pub fn apply(&self, review: &mut Review, now: DateTime<Utc>) {
        if let Some(rating) = self.rating {
            review.rating = rating;
        }
        if let Some(comment) = &self.comment {
            review.comment.clone_from(comment);
        }
        if let Some(images) = &self.images {
            review.images.clone_from(images);
        }
        if let Some(verified) = self.verified_purchase {
            review.verified_purchase = verified;
        }
        review.updated_at = Some(now);
    }
}
