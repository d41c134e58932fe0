//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Registration, login, and bearer token identities
//! - `carts` - Per-user cart persistence (whole-cart replace)
//! - `catalog` - Product lookup and creation
//! - `ratings` - Per-product rating recompute, serialized per product
//! - `reviews` - Review mutations that keep product ratings current
//!
//! Services borrow their repositories for the length of one request and hold
//! no state of their own; anything shared across requests lives in
//! [`crate::state::AppState`].

pub mod auth;
pub mod carts;
pub mod catalog;
pub mod ratings;
pub mod reviews;
