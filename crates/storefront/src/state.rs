//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::db::Repositories;
use crate::services::auth::{AuthService, TokenError, TokenSigner};
use crate::services::carts::CartService;
use crate::services::catalog::CatalogService;
use crate::services::ratings::ProductLocks;
use crate::services::reviews::ReviewService;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// storage, the token signer, and the per-product rating locks.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    repos: Repositories,
    signer: TokenSigner,
    locks: ProductLocks,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::InvalidKey` if the token secret cannot key the signer.
    pub fn new(config: StorefrontConfig, repos: Repositories) -> Result<Self, TokenError> {
        let signer = TokenSigner::new(&config.token_secret, config.token_ttl)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                repos,
                signer,
                locks: ProductLocks::default(),
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the repositories.
    #[must_use]
    pub fn repos(&self) -> &Repositories {
        &self.inner.repos
    }

    /// Get a reference to the bearer token signer.
    #[must_use]
    pub fn signer(&self) -> &TokenSigner {
        &self.inner.signer
    }

    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(self.inner.repos.users.as_ref(), &self.inner.signer)
    }

    #[must_use]
    pub fn carts(&self) -> CartService<'_> {
        CartService::new(self.inner.repos.carts.as_ref())
    }

    #[must_use]
    pub fn catalog(&self) -> CatalogService<'_> {
        CatalogService::new(self.inner.repos.products.as_ref())
    }

    #[must_use]
    pub fn reviews(&self) -> ReviewService<'_> {
        ReviewService::new(
            self.inner.repos.reviews.as_ref(),
            self.inner.repos.products.as_ref(),
            &self.inner.locks,
        )
    }
}
