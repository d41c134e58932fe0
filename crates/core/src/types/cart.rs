//! Cart documents and the pure cart line arithmetic shared by client and server.

use core::num::NonZeroU32;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{ProductId, UserId};
use super::price::Price;
use super::product::ProductRef;

/// Identity of a cart line: a product in a given size.
///
/// An absent size only matches an absent size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CartKey<'a> {
    pub product_id: ProductId,
    pub selected_size: Option<&'a str>,
}

impl<'a> CartKey<'a> {
    /// Build a key from its parts.
    #[must_use]
    pub const fn new(product_id: ProductId, selected_size: Option<&'a str>) -> Self {
        Self {
            product_id,
            selected_size,
        }
    }
}

/// One line of a cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product: ProductRef,
    pub quantity: NonZeroU32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_size: Option<String>,
}

impl CartItem {
    /// The line's identity.
    #[must_use]
    pub fn key(&self) -> CartKey<'_> {
        CartKey::new(self.product.id, self.selected_size.as_deref())
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.unit_price(self.selected_size.as_deref()) * self.quantity
    }
}

/// Two cart lines share the same product and size.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Duplicate cart item for product {product_id}")]
pub struct DuplicateCartItem {
    pub product_id: ProductId,
    pub selected_size: Option<String>,
}

/// An ordered list of cart lines with unique keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartLines(Vec<CartItem>);

impl CartLines {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Wrap lines received from elsewhere, rejecting duplicate keys.
    ///
    /// # Errors
    ///
    /// Returns the first key that appears more than once.
    pub fn try_from_items(items: Vec<CartItem>) -> Result<Self, DuplicateCartItem> {
        for (index, item) in items.iter().enumerate() {
            let key = item.key();
            if items.iter().skip(index + 1).any(|other| other.key() == key) {
                return Err(DuplicateCartItem {
                    product_id: item.product.id,
                    selected_size: item.selected_size.clone(),
                });
            }
        }
        Ok(Self(items))
    }

    /// Add `quantity` of a product, merging into an existing line with the same key.
    pub fn add(&mut self, product: ProductRef, quantity: NonZeroU32, selected_size: Option<String>) {
        let key = CartKey::new(product.id, selected_size.as_deref());
        if let Some(line) = self.0.iter_mut().find(|line| line.key() == key) {
            line.quantity = line.quantity.saturating_add(quantity.get());
            return;
        }
        self.0.push(CartItem {
            product,
            quantity,
            selected_size,
        });
    }

    /// Remove the line matching `key`. Returns whether a line was removed.
    pub fn remove(&mut self, key: CartKey<'_>) -> bool {
        let before = self.0.len();
        self.0.retain(|line| line.key() != key);
        self.0.len() != before
    }

    /// Replace the quantity of the line matching `key`.
    ///
    /// Returns whether a line matched. Inventory limits are the caller's concern.
    pub fn update_quantity(&mut self, key: CartKey<'_>, quantity: NonZeroU32) -> bool {
        match self.0.iter_mut().find(|line| line.key() == key) {
            Some(line) => {
                line.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Sum of quantities across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.0.iter().map(|line| u64::from(line.quantity.get())).sum()
    }

    /// Sum of line totals.
    #[must_use]
    pub fn total(&self) -> Price {
        self.0.iter().map(CartItem::line_total).sum()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[CartItem] {
        &self.0
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<CartItem> {
        self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, CartItem> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a CartLines {
    type Item = &'a CartItem;
    type IntoIter = core::slice::Iter<'a, CartItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A persisted per-user cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub user_id: UserId,
    pub items: CartLines,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn qty(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    fn rose() -> ProductRef {
        serde_json::from_value(json!({
            "_id": "65f1a2b3c4d5e6f7a8b9c0d1",
            "name": "Midnight Rose",
            "price": 100,
            "sizeOptions": [{ "size": "50ml", "price": 150 }, { "size": "30ml" }]
        }))
        .unwrap()
    }

    fn cedar() -> ProductRef {
        serde_json::from_value(json!({
            "_id": "65f1a2b3c4d5e6f7a8b9c0d2",
            "name": "Cedar Noir",
            "price": 80
        }))
        .unwrap()
    }

    #[test]
    fn test_add_same_key_merges_quantities() {
        let mut cart = CartLines::new();
        cart.add(rose(), qty(2), Some("50ml".to_owned()));
        cart.add(rose(), qty(3), Some("50ml".to_owned()));

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.as_slice()[0].quantity.get(), 5);
    }

    #[test]
    fn test_add_different_size_is_separate_line() {
        let mut cart = CartLines::new();
        cart.add(rose(), qty(1), Some("50ml".to_owned()));
        cart.add(rose(), qty(1), Some("30ml".to_owned()));
        cart.add(rose(), qty(1), None);

        assert_eq!(cart.len(), 3);
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_remove_matches_product_and_size() {
        let mut cart = CartLines::new();
        let id = rose().id;
        cart.add(rose(), qty(1), Some("50ml".to_owned()));
        cart.add(rose(), qty(1), Some("30ml".to_owned()));

        assert!(cart.remove(CartKey::new(id, Some("50ml"))));
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.as_slice()[0].selected_size.as_deref(), Some("30ml"));

        assert!(!cart.remove(CartKey::new(id, None)));
        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn test_update_quantity_replaces() {
        let mut cart = CartLines::new();
        let id = cedar().id;
        cart.add(cedar(), qty(4), None);

        assert!(cart.update_quantity(CartKey::new(id, None), qty(1)));
        assert_eq!(cart.item_count(), 1);
        assert!(!cart.update_quantity(CartKey::new(id, Some("50ml")), qty(9)));
    }

    #[test]
    fn test_total_uses_size_price() {
        let mut cart = CartLines::new();
        cart.add(rose(), qty(2), Some("50ml".to_owned()));
        assert_eq!(cart.total(), Price::from_units(300));

        cart.add(cedar(), qty(1), None);
        cart.add(rose(), qty(1), Some("30ml".to_owned()));
        assert_eq!(cart.total(), Price::from_units(480));
    }

    #[test]
    fn test_clear_empties() {
        let mut cart = CartLines::new();
        cart.add(cedar(), qty(2), None);
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Price::ZERO);
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let item = CartItem {
            product: cedar(),
            quantity: qty(1),
            selected_size: None,
        };
        let err = CartLines::try_from_items(vec![item.clone(), item]).unwrap_err();
        assert_eq!(err.product_id, cedar().id);
    }

    #[test]
    fn test_zero_quantity_does_not_deserialize() {
        let raw = json!({ "product": cedar(), "quantity": 0 });
        assert!(serde_json::from_value::<CartItem>(raw).is_err());
    }
}
