//! Product rating maintenance.
//!
//! After every review mutation the affected product's rating is recomputed
//! from scratch over the surviving reviews. Recomputes for the same product
//! run one at a time: each one reads the review set only after the previous
//! one has written its result, so the last writer always saw every review
//! committed before it started.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rust_decimal::Decimal;

use essence_core::{ProductId, average_rating};

use crate::db::{ProductRepository, RepositoryError, ReviewRepository};

/// Result of a recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingOutcome {
    /// The product now carries this rating.
    Updated(Decimal),
    /// No reviews remain; the stored rating was left as it was.
    Unchanged,
    /// The product does not exist.
    ProductMissing,
}

/// Per-product async locks, created on demand and dropped when unused.
#[derive(Default)]
pub struct ProductLocks {
    locks: Mutex<HashMap<ProductId, Weak<tokio::sync::Mutex<()>>>>,
}

impl ProductLocks {
    /// The lock for `product_id`, shared with anyone currently holding it.
    pub fn get(&self, product_id: ProductId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock();
        if let Some(lock) = locks.get(&product_id).and_then(Weak::upgrade) {
            return lock;
        }
        locks.retain(|_, weak| weak.strong_count() > 0);
        let lock = Arc::new(tokio::sync::Mutex::new(()));
        locks.insert(product_id, Arc::downgrade(&lock));
        lock
    }

    /// Number of products with a live lock.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Recomputes product ratings from reviews.
pub struct RatingAggregator<'a> {
    reviews: &'a dyn ReviewRepository,
    products: &'a dyn ProductRepository,
    locks: &'a ProductLocks,
}

impl<'a> RatingAggregator<'a> {
    #[must_use]
    pub const fn new(
        reviews: &'a dyn ReviewRepository,
        products: &'a dyn ProductRepository,
        locks: &'a ProductLocks,
    ) -> Self {
        Self {
            reviews,
            products,
            locks,
        }
    }

    /// Recompute and store the rating of `product_id`.
    ///
    /// With no reviews left the stored rating is not touched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if reading reviews or writing the product fails.
    #[tracing::instrument(skip(self), fields(product_id = %product_id))]
    pub async fn recompute(&self, product_id: ProductId) -> Result<RatingOutcome, RepositoryError> {
        let lock = self.locks.get(product_id);
        let _guard = lock.lock().await;

        let reviews = self.reviews.find_by_product(&product_id).await?;
        let Some(rating) = average_rating(reviews.iter().map(|r| r.rating)) else {
            tracing::debug!("No reviews left, rating unchanged");
            return Ok(RatingOutcome::Unchanged);
        };

        if self.products.set_rating(&product_id, rating).await? {
            tracing::debug!(%rating, reviews = reviews.len(), "Rating updated");
            Ok(RatingOutcome::Updated(rating))
        } else {
            tracing::warn!("Reviews reference a product that does not exist");
            Ok(RatingOutcome::ProductMissing)
        }
    }
}
