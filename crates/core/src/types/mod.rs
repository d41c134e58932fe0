//! Core types for Essence.
//!
//! This module provides type-safe wrappers for the storefront's documents.

pub mod cart;
pub mod email;
pub mod id;
pub mod price;
pub mod product;
pub mod review;

pub use cart::{Cart, CartItem, CartKey, CartLines, DuplicateCartItem};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::Price;
pub use product::{Category, NewProduct, Product, ProductRef, ProductValidationError, SizeOption};
pub use review::{NewReview, Rating, RatingError, Review, ReviewPatch, ReviewValidationError};
