//! Server-side cart persistence.
//!
//! One cart per identity, read whole and replaced whole. Concurrent writes
//! for the same user are not ordered here: the write that reaches storage
//! last wins.

use chrono::{DateTime, Utc};
use thiserror::Error;

use essence_core::{Cart, CartItem, CartLines, DuplicateCartItem, UserId};

use crate::db::{CartRepository, RepositoryError};

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    #[error(transparent)]
    Duplicate(#[from] DuplicateCartItem),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Cart operations scoped to a verified identity.
pub struct CartService<'a> {
    carts: &'a dyn CartRepository,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(carts: &'a dyn CartRepository) -> Self {
        Self { carts }
    }

    /// The user's items; empty when no cart was ever stored.
    ///
    /// Never creates a cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if storage fails.
    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get(&self, user_id: &UserId) -> Result<Option<Cart>, RepositoryError> {
        self.carts.find_by_user(user_id).await
    }

    /// Overwrite the user's cart with `items`.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Duplicate` if two items share a product and size,
    /// or `CartError::Repository` if storage fails.
    #[tracing::instrument(skip(self, items), fields(user_id = %user_id, items = items.len()))]
    pub async fn replace(
        &self,
        user_id: &UserId,
        items: Vec<CartItem>,
        now: DateTime<Utc>,
    ) -> Result<Cart, CartError> {
        let lines = CartLines::try_from_items(items)?;
        let cart = self.carts.replace(user_id, lines.as_slice(), now).await?;
        tracing::debug!(item_count = cart.items.item_count(), "Cart replaced");
        Ok(cart)
    }
}
