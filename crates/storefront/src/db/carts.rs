//! Cart repository for `PostgreSQL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use essence_core::{Cart, CartItem, CartLines, UserId};

use super::{CartRepository, RepositoryError, decode_json, encode_json};

const FIND_CART_SQL: &str = r"
    SELECT user_id, items, created_at, updated_at
    FROM storefront.carts
    WHERE user_id = $1
";

// A single statement so concurrent writers for the same user never see a
// half-created cart; the last statement to commit wins.
const UPSERT_CART_SQL: &str = r"
    INSERT INTO storefront.carts (user_id, items, created_at, updated_at)
    VALUES ($1, $2, $3, $3)
    ON CONFLICT (user_id)
    DO UPDATE SET items = EXCLUDED.items, updated_at = EXCLUDED.updated_at
    RETURNING user_id, items, created_at, updated_at
";

#[derive(sqlx::FromRow)]
struct CartRow {
    user_id: UserId,
    items: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CartRow> for Cart {
    type Error = RepositoryError;

    fn try_from(row: CartRow) -> Result<Self, Self::Error> {
        let items: Vec<CartItem> = decode_json(row.items, "cart items")?;
        let items = CartLines::try_from_items(items)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
        Ok(Self {
            user_id: row.user_id,
            items,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for per-user carts.
pub struct PgCartRepository {
    pool: PgPool,
}

impl PgCartRepository {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CartRepository for PgCartRepository {
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<Cart>, RepositoryError> {
        sqlx::query_as::<_, CartRow>(FIND_CART_SQL)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Cart::try_from)
            .transpose()
    }

    async fn replace(
        &self,
        user_id: &UserId,
        items: &[CartItem],
        now: DateTime<Utc>,
    ) -> Result<Cart, RepositoryError> {
        let items = encode_json(&items, "cart items")?;
        let row = sqlx::query_as::<_, CartRow>(UPSERT_CART_SQL)
            .bind(user_id)
            .bind(items)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;
        Cart::try_from(row)
    }
}
