//! HTTP middleware stack for the storefront API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transaction per route)
//! 2. `TraceLayer` (request span with `request_id` field)
//! 3. Request ID (propagate or generate `x-request-id`)
//! 4. CORS
//!
//! Authentication is an extractor, not a layer: handlers that need an
//! identity take [`RequireIdentity`].

pub mod auth;
pub mod request_id;

pub use auth::RequireIdentity;
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
