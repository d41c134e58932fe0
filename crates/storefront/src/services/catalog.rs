//! Product lookup and creation.

use chrono::{DateTime, Utc};
use thiserror::Error;

use essence_core::{IdError, NewProduct, Product, ProductId, ProductValidationError};

use crate::db::{ProductRepository, RepositoryError};

/// Product id accepted by the demo front end in place of a real id.
pub const DEMO_PRODUCT_ALIAS: &str = "1";

/// Name of the product the demo alias resolves to.
pub const DEMO_PRODUCT_NAME: &str = "Midnight Rose";

/// A product reference from a URL path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductKey {
    Id(ProductId),
    DemoAlias,
}

impl ProductKey {
    /// Parse a path segment.
    ///
    /// # Errors
    ///
    /// Returns `IdError` unless the segment is a document id or the demo alias.
    pub fn parse(raw: &str) -> Result<Self, IdError> {
        if raw == DEMO_PRODUCT_ALIAS {
            return Ok(Self::DemoAlias);
        }
        ProductId::parse(raw).map(Self::Id)
    }
}

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Invalid(#[from] ProductValidationError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Catalog operations.
pub struct CatalogService<'a> {
    products: &'a dyn ProductRepository,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(products: &'a dyn ProductRepository) -> Self {
        Self { products }
    }

    /// Resolve a product by id or demo alias.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if storage fails.
    pub async fn find(&self, key: ProductKey) -> Result<Option<Product>, RepositoryError> {
        match key {
            ProductKey::Id(id) => self.products.find_by_id(&id).await,
            ProductKey::DemoAlias => self.products.find_by_name(DEMO_PRODUCT_NAME).await,
        }
    }

    /// Validate and store a new product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` for a bad payload.
    #[tracing::instrument(skip_all)]
    pub async fn create(&self, input: NewProduct, now: DateTime<Utc>) -> Result<Product, CatalogError> {
        let product = input.validate(ProductId::generate(), now)?;
        self.products.insert(&product).await?;
        tracing::info!(product_id = %product.id, name = %product.name, "Product created");
        Ok(product)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::db::seed::demo_products;

    #[test]
    fn test_parse_key() {
        assert_eq!(ProductKey::parse("1").unwrap(), ProductKey::DemoAlias);
        assert!(matches!(
            ProductKey::parse("65f1a2b3c4d5e6f7a8b9c0d1").unwrap(),
            ProductKey::Id(_)
        ));
        assert!(ProductKey::parse("not-an-id").is_err());
        assert!(ProductKey::parse("2").is_err());
    }

    #[tokio::test]
    async fn test_alias_resolves_by_name() {
        let store = MemoryStore::default();
        for product in demo_products(Utc::now()) {
            store.insert(&product).await.unwrap();
        }
        let catalog = CatalogService::new(&store);

        let product = catalog.find(ProductKey::DemoAlias).await.unwrap().unwrap();
        assert_eq!(product.name, DEMO_PRODUCT_NAME);

        let missing = catalog
            .find(ProductKey::Id(ProductId::generate()))
            .await
            .unwrap();
        assert!(missing.is_none());
    }
}
