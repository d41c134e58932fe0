//! Sign-in state tying the HTTP client's token to the cart session.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::instrument;

use crate::api::CartApi;
use crate::cart::{CartSession, LoadOutcome};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::http::{Account, SignedIn, StorefrontClient};
use crate::snapshot::CartSnapshot;

/// The signed-in shopper and their cart.
///
/// Signing in binds the cart to the account and pulls the server cart;
/// signing out stops syncing before the token is dropped, so nothing is
/// pushed for the previous account afterwards.
#[derive(Debug, Clone)]
pub struct AuthSession {
    client: StorefrontClient,
    cart: CartSession,
    account: Arc<RwLock<Option<Account>>>,
}

impl AuthSession {
    /// A signed-out session with an empty cart.
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        Self::restore(config, CartSnapshot::default())
    }

    /// A signed-out session whose cart starts from `snapshot`.
    #[must_use]
    pub fn restore(config: &ClientConfig, snapshot: CartSnapshot) -> Self {
        let client = StorefrontClient::new(config);
        let api: Arc<dyn CartApi> = Arc::new(client.clone());
        Self {
            cart: CartSession::from_snapshot(api, config, snapshot),
            client,
            account: Arc::new(RwLock::new(None)),
        }
    }

    /// The cart session.
    #[must_use]
    pub const fn cart(&self) -> &CartSession {
        &self.cart
    }

    /// The HTTP client.
    #[must_use]
    pub const fn client(&self) -> &StorefrontClient {
        &self.client
    }

    /// The signed-in account.
    #[must_use]
    pub fn account(&self) -> Option<Account> {
        self.account.read().clone()
    }

    /// Whether an account is signed in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.account.read().is_some()
    }

    /// Create an account and sign in with the token it comes back with.
    ///
    /// # Errors
    ///
    /// Returns the server's rejection (duplicate email, short password,
    /// invalid email) as `ClientError::Status`.
    #[instrument(skip(self, password))]
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<Account> {
        let signed_in = self.client.register(name, email, password).await?;
        Ok(self.sign_in(signed_in).await)
    }

    /// Sign in, bind the cart to the account, and load its server cart.
    ///
    /// A failed cart load does not fail the sign-in; the local items stay.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Status` ("Invalid credentials") when the
    /// server rejects the email/password pair.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Account> {
        let signed_in = self.client.login(email, password).await?;
        Ok(self.sign_in(signed_in).await)
    }

    async fn sign_in(&self, signed_in: SignedIn) -> Account {
        let SignedIn { account, token } = signed_in;

        // The previous account's pushes must stop before its token is replaced.
        self.cart.shutdown();
        self.client.set_token(token);
        *self.account.write() = Some(account.clone());
        self.cart.set_user_id(Some(account.id));

        if self.cart.load_from_server().await == LoadOutcome::Applied {
            tracing::info!(user_id = %account.id, lines = self.cart.items().len(), "Signed in");
        } else {
            tracing::info!(user_id = %account.id, "Signed in without server cart");
        }
        account
    }

    /// Sign out: stop syncing, drop the token, and empty the cart.
    #[instrument(skip(self))]
    pub fn logout(&self) {
        self.cart.set_user_id(None);
        self.client.clear_token();
        *self.account.write() = None;
        tracing::info!("Signed out");
    }
}
