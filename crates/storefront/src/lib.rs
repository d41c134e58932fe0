//! Essence storefront library.
//!
//! The REST backend of the perfume storefront: accounts and bearer tokens,
//! per-user carts, the product catalog, and reviews with derived product
//! ratings. Exposed as a library so the binary, the CLI, and the
//! integration tests share one router and one set of repositories.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use routes::app;
pub use state::AppState;
