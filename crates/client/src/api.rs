//! The server-side cart contract the session syncs against.

use async_trait::async_trait;

use essence_core::CartLines;

use crate::error::Result;

/// Remote cart storage for the signed-in user.
///
/// The identity is implied by whatever credentials the implementation
/// carries; callers never pass a user id.
#[async_trait]
pub trait CartApi: Send + Sync {
    /// Fetch the stored cart. A user without a stored cart gets no lines.
    async fn fetch_cart(&self) -> Result<CartLines>;

    /// Replace the stored cart with `items`.
    async fn save_cart(&self, items: &CartLines) -> Result<()>;
}
