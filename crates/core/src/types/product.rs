//! Product catalog documents.

use core::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::id::ProductId;
use super::price::Price;

/// Scent family a perfume belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Floral,
    Woody,
    Oriental,
    Fresh,
    Citrus,
    Aromatic,
    Fruity,
}

impl Category {
    /// All categories, in catalog order.
    pub const ALL: [Self; 7] = [
        Self::Floral,
        Self::Woody,
        Self::Oriental,
        Self::Fresh,
        Self::Citrus,
        Self::Aromatic,
        Self::Fruity,
    ];

    /// The category name as stored and served.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Floral => "Floral",
            Self::Woody => "Woody",
            Self::Oriental => "Oriental",
            Self::Fresh => "Fresh",
            Self::Citrus => "Citrus",
            Self::Aromatic => "Aromatic",
            Self::Fruity => "Fruity",
        }
    }

    /// Look up a category by its stored name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bottle size a product is sold in.
///
/// `price` overrides the product's base price for this size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeOption {
    pub size: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory: Option<u32>,
    #[serde(default)]
    pub is_default: bool,
}

/// A stored product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ProductId,
    pub name: String,
    pub brand: String,
    pub description: String,
    pub price: Price,
    pub images: Vec<String>,
    pub category: Category,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Mean review rating, maintained by the rating aggregator.
    #[serde(with = "rust_decimal::serde::float")]
    pub rating: Decimal,
    pub inventory: u32,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub size_options: Vec<SizeOption>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Errors raised while validating a [`NewProduct`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProductValidationError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("Price cannot be negative")]
    NegativePrice,
    #[error("Product must have at least one image")]
    NoImages,
    #[error("Invalid category: {0}")]
    UnknownCategory(String),
}

/// Product creation payload as received over the wire.
///
/// Every field is optional at this stage so that all missing fields can be
/// reported together by [`NewProduct::validate`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub price: Option<Price>,
    #[serde(default)]
    pub images: Vec<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub inventory: Option<u32>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub size_options: Vec<SizeOption>,
}

impl NewProduct {
    /// Check the payload and build a product stamped with `id` and `now`.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure: missing required fields (all of
    /// them listed), a negative price, an unknown category, or no images.
    pub fn validate(
        self,
        id: ProductId,
        now: DateTime<Utc>,
    ) -> Result<Product, ProductValidationError> {
        fn required(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        }

        let name = required(self.name);
        let brand = required(self.brand);
        let description = required(self.description);
        let category = required(self.category);

        let mut missing = Vec::new();
        if name.is_none() {
            missing.push("name");
        }
        if brand.is_none() {
            missing.push("brand");
        }
        if description.is_none() {
            missing.push("description");
        }
        if self.price.is_none() {
            missing.push("price");
        }
        if category.is_none() {
            missing.push("category");
        }

        let (Some(name), Some(brand), Some(description), Some(price), Some(category)) =
            (name, brand, description, self.price, category)
        else {
            return Err(ProductValidationError::MissingFields(missing));
        };

        if price.is_negative() {
            return Err(ProductValidationError::NegativePrice);
        }
        let category = Category::from_name(&category)
            .ok_or(ProductValidationError::UnknownCategory(category))?;
        if self.images.is_empty() {
            return Err(ProductValidationError::NoImages);
        }

        Ok(Product {
            id,
            name,
            brand,
            description,
            price,
            images: self.images,
            category,
            tags: self.tags,
            rating: Decimal::ZERO,
            inventory: self.inventory.unwrap_or(0),
            featured: self.featured,
            size_options: self.size_options,
            created_at: now,
            updated_at: Some(now),
        })
    }
}

/// The product snapshot embedded in a cart item.
///
/// Only the fields the cart needs are typed; everything else the client sent
/// is kept in `extra` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRef {
    #[serde(rename = "_id")]
    pub id: ProductId,
    #[serde(default)]
    pub name: String,
    pub price: Price,
    #[serde(default)]
    pub size_options: Vec<SizeOption>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProductRef {
    /// Unit price for `selected_size`.
    ///
    /// A size option with a non-zero price wins; otherwise the base price.
    #[must_use]
    pub fn unit_price(&self, selected_size: Option<&str>) -> Price {
        selected_size
            .and_then(|size| self.size_options.iter().find(|o| o.size == size))
            .and_then(|option| option.price)
            .filter(|price| *price != Price::ZERO)
            .unwrap_or(self.price)
    }
}

impl From<&Product> for ProductRef {
    fn from(product: &Product) -> Self {
        let mut extra = Map::new();
        extra.insert("brand".to_owned(), Value::from(product.brand.clone()));
        extra.insert("category".to_owned(), Value::from(product.category.as_str()));
        extra.insert("images".to_owned(), Value::from(product.images.clone()));
        Self {
            id: product.id,
            name: product.name.clone(),
            price: product.price,
            size_options: product.size_options.clone(),
            extra,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> NewProduct {
        serde_json::from_value(json!({
            "name": "Midnight Rose",
            "brand": "Luxe Parfum",
            "description": "A captivating blend of dark rose and vanilla.",
            "price": 129,
            "images": ["https://images.example.com/rose.jpg"],
            "category": "Floral",
            "tags": ["rose", "vanilla"],
            "inventory": 50,
            "featured": true
        }))
        .unwrap()
    }

    #[test]
    fn test_validate_fills_defaults() {
        let product = payload().validate(ProductId::generate(), Utc::now()).unwrap();
        assert_eq!(product.category, Category::Floral);
        assert_eq!(product.rating, Decimal::ZERO);
        assert_eq!(product.inventory, 50);
        assert!(product.size_options.is_empty());
    }

    #[test]
    fn test_validate_lists_every_missing_field() {
        let input = NewProduct {
            name: Some("  ".to_owned()),
            images: vec!["a.jpg".to_owned()],
            ..NewProduct::default()
        };
        let err = input.validate(ProductId::generate(), Utc::now()).unwrap_err();
        assert_eq!(
            err,
            ProductValidationError::MissingFields(vec![
                "name",
                "brand",
                "description",
                "price",
                "category"
            ])
        );
        assert!(err.to_string().starts_with("Missing required fields: name, brand"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut input = payload();
        input.category = Some("Gourmand".to_owned());
        assert!(matches!(
            input.validate(ProductId::generate(), Utc::now()),
            Err(ProductValidationError::UnknownCategory(_))
        ));

        let mut input = payload();
        input.images.clear();
        assert_eq!(
            input.validate(ProductId::generate(), Utc::now()),
            Err(ProductValidationError::NoImages)
        );

        let mut input = payload();
        input.price = Some(Price::from_units(-5));
        assert_eq!(
            input.validate(ProductId::generate(), Utc::now()),
            Err(ProductValidationError::NegativePrice)
        );
    }

    #[test]
    fn test_product_ref_keeps_unknown_fields() {
        let raw = json!({
            "_id": "65f1a2b3c4d5e6f7a8b9c0d1",
            "name": "Ocean Breeze",
            "price": 89,
            "brand": "Aqua Scents",
            "rating": 4.5
        });
        let product: ProductRef = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(product.extra.get("brand"), Some(&json!("Aqua Scents")));

        let back = serde_json::to_value(&product).unwrap();
        assert_eq!(back["brand"], raw["brand"]);
        assert_eq!(back["rating"], raw["rating"]);
    }

    #[test]
    fn test_unit_price_prefers_size_price() {
        let product: ProductRef = serde_json::from_value(json!({
            "_id": "65f1a2b3c4d5e6f7a8b9c0d1",
            "price": 100,
            "sizeOptions": [
                { "size": "50ml", "price": 150 },
                { "size": "30ml" },
                { "size": "10ml", "price": 0 }
            ]
        }))
        .unwrap();

        assert_eq!(product.unit_price(Some("50ml")), Price::from_units(150));
        assert_eq!(product.unit_price(Some("30ml")), Price::from_units(100));
        assert_eq!(product.unit_price(Some("10ml")), Price::from_units(100));
        assert_eq!(product.unit_price(Some("100ml")), Price::from_units(100));
        assert_eq!(product.unit_price(None), Price::from_units(100));
    }
}
