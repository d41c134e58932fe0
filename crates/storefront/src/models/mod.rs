//! Domain models that exist only on the server side.
//!
//! Shared documents (products, reviews, carts) live in `essence-core`.

pub mod user;

pub use user::{User, UserProfile};
