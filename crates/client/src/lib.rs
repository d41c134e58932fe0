//! Essence client library.
//!
//! The shopper's side of the storefront: a cart that works offline and,
//! once a user signs in, mirrors itself to the server.
//!
//! # Modules
//!
//! - [`cart`] - The cart session and its server load
//! - [`auth`] - Sign-in state binding the token to the cart
//! - [`http`] - `reqwest` client for the storefront REST API
//! - [`snapshot`] - Persisting a cart between runs
//!
//! # Example
//!
//! ```rust,ignore
//! use essence_client::{AuthSession, ClientConfig};
//!
//! let session = AuthSession::new(&ClientConfig::from_env()?);
//! session.login("user@example.com", "password").await?;
//! session.cart().add_item(product, quantity, Some("50ml".into()));
//! // pushed to the server after the debounce window
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod auth;
pub mod cart;
pub mod config;
pub mod error;
pub mod http;
pub mod snapshot;
mod sync;

pub use api::CartApi;
pub use auth::AuthSession;
pub use cart::{CartSession, LoadOutcome, SyncOutcome};
pub use config::ClientConfig;
pub use error::ClientError;
pub use http::{Account, SignedIn, StorefrontClient};
pub use snapshot::CartSnapshot;
