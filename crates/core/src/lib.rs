//! Essence Core - Shared types library.
//!
//! This crate provides common types used across all Essence components:
//! - `storefront` - REST backend for the perfume shop
//! - `client` - Client-side cart session and API client
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows the same cart
//! arithmetic to run on both sides of the wire.
//!
//! # Modules
//!
//! - [`types`] - Document ids, prices, products, cart lines, reviews, and emails
//! - [`rating`] - Aggregate rating computation over a product's reviews

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod rating;
pub mod types;

pub use rating::{RATING_PRECISION, average_rating};
pub use types::*;
