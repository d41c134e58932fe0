//! Product repository for `PostgreSQL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use essence_core::{Category, Price, Product, ProductId};

use super::{ProductRepository, RepositoryError, decode_json, encode_json, map_unique_violation};

const PRODUCT_COLUMNS: &str = "id, name, brand, description, price, images, category, tags, \
     rating, inventory, featured, size_options, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    brand: String,
    description: String,
    price: Decimal,
    images: serde_json::Value,
    category: String,
    tags: serde_json::Value,
    rating: Decimal,
    inventory: i32,
    featured: bool,
    size_options: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let category = Category::from_name(&row.category).ok_or_else(|| {
            RepositoryError::DataCorruption(format!("invalid category in database: {}", row.category))
        })?;
        let inventory = u32::try_from(row.inventory).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid inventory in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            name: row.name,
            brand: row.brand,
            description: row.description,
            price: Price::new(row.price),
            images: decode_json(row.images, "images")?,
            category,
            tags: decode_json(row.tags, "tags")?,
            rating: row.rating,
            inventory,
            featured: row.featured,
            size_options: decode_json(row.size_options, "size options")?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for the product catalog.
pub struct PgProductRepository {
    pool: PgPool,
}

impl PgProductRepository {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM storefront.products WHERE id = $1");
        sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Product::try_from)
            .transpose()
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.products \
             WHERE name = $1 ORDER BY created_at LIMIT 1"
        );
        sqlx::query_as::<_, ProductRow>(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?
            .map(Product::try_from)
            .transpose()
    }

    async fn insert(&self, product: &Product) -> Result<(), RepositoryError> {
        let inventory = i32::try_from(product.inventory).map_err(|_| {
            RepositoryError::DataCorruption(format!("inventory {} out of range", product.inventory))
        })?;
        let sql = format!(
            "INSERT INTO storefront.products ({PRODUCT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"
        );
        sqlx::query(&sql)
            .bind(product.id)
            .bind(&product.name)
            .bind(&product.brand)
            .bind(&product.description)
            .bind(product.price.amount())
            .bind(encode_json(&product.images, "images")?)
            .bind(product.category.as_str())
            .bind(encode_json(&product.tags, "tags")?)
            .bind(product.rating)
            .bind(inventory)
            .bind(product.featured)
            .bind(encode_json(&product.size_options, "size options")?)
            .bind(product.created_at)
            .bind(product.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, "product"))?;
        Ok(())
    }

    async fn set_rating(&self, id: &ProductId, rating: Decimal) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE storefront.products SET rating = $2 WHERE id = $1")
            .bind(id)
            .bind(rating)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
