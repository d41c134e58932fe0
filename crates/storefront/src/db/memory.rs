//! Process-local document store.
//!
//! Implements every repository trait over in-memory collections guarded by a
//! single `parking_lot` lock. Used by tests and by `STOREFRONT_STORAGE=memory`
//! for local runs without a database. Nothing survives a restart.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;

use essence_core::{
    Cart, CartItem, CartLines, Email, Product, ProductId, Review, ReviewId, ReviewPatch, UserId,
};

use super::{CartRepository, ProductRepository, RepositoryError, ReviewRepository, UserRepository};
use crate::models::user::User;

#[derive(Default)]
struct Collections {
    users: HashMap<Email, User>,
    products: Vec<Product>,
    reviews: Vec<Review>,
    carts: HashMap<UserId, Cart>,
}

/// In-memory implementation of all storefront repositories.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    /// Number of stored carts.
    #[must_use]
    pub fn cart_count(&self) -> usize {
        self.inner.read().carts.len()
    }

    /// Drop every document.
    pub fn clear(&self) {
        *self.inner.write() = Collections::default();
    }
}

#[async_trait]
impl CartRepository for MemoryStore {
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<Cart>, RepositoryError> {
        Ok(self.inner.read().carts.get(user_id).cloned())
    }

    async fn replace(
        &self,
        user_id: &UserId,
        items: &[CartItem],
        now: DateTime<Utc>,
    ) -> Result<Cart, RepositoryError> {
        let items = CartLines::try_from_items(items.to_vec())
            .map_err(|e| RepositoryError::Conflict(e.to_string()))?;

        let mut inner = self.inner.write();
        let cart = inner
            .carts
            .entry(*user_id)
            .and_modify(|cart| {
                cart.items = items.clone();
                cart.updated_at = now;
            })
            .or_insert_with(|| Cart {
                user_id: *user_id,
                items,
                created_at: now,
                updated_at: now,
            });
        Ok(cart.clone())
    }
}

#[async_trait]
impl ReviewRepository for MemoryStore {
    async fn insert(&self, review: &Review) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write();
        if inner.reviews.iter().any(|r| r.id == review.id) {
            return Err(RepositoryError::Conflict("review already exists".to_owned()));
        }
        inner.reviews.push(review.clone());
        Ok(())
    }

    async fn find_by_product(&self, product_id: &ProductId) -> Result<Vec<Review>, RepositoryError> {
        let mut reviews: Vec<Review> = self
            .inner
            .read()
            .reviews
            .iter()
            .rev()
            .filter(|r| r.product_id == *product_id)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reviews)
    }

    async fn update(
        &self,
        id: &ReviewId,
        patch: &ReviewPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Review>, RepositoryError> {
        let mut inner = self.inner.write();
        Ok(inner.reviews.iter_mut().find(|r| r.id == *id).map(|review| {
            patch.apply(review, now);
            review.clone()
        }))
    }

    async fn delete(&self, id: &ReviewId) -> Result<Option<Review>, RepositoryError> {
        let mut inner = self.inner.write();
        Ok(inner
            .reviews
            .iter()
            .position(|r| r.id == *id)
            .map(|index| inner.reviews.remove(index)))
    }
}

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.inner.read().products.iter().find(|p| p.id == *id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Product>, RepositoryError> {
        Ok(self
            .inner
            .read()
            .products
            .iter()
            .filter(|p| p.name == name)
            .min_by_key(|p| p.created_at)
            .cloned())
    }

    async fn insert(&self, product: &Product) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write();
        if inner.products.iter().any(|p| p.id == product.id) {
            return Err(RepositoryError::Conflict("product already exists".to_owned()));
        }
        inner.products.push(product.clone());
        Ok(())
    }

    async fn set_rating(&self, id: &ProductId, rating: Decimal) -> Result<bool, RepositoryError> {
        let mut inner = self.inner.write();
        let Some(product) = inner.products.iter_mut().find(|p| p.id == *id) else {
            return Ok(false);
        };
        product.rating = rating;
        Ok(true)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        Ok(self.inner.read().users.get(email).cloned())
    }

    async fn insert(&self, user: &User) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write();
        if inner.users.contains_key(&user.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }
        inner.users.insert(user.email.clone(), user.clone());
        Ok(())
    }
}
