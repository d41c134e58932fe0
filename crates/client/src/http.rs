//! `reqwest` client for the storefront REST API.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use reqwest::{RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use essence_core::{CartLines, UserId};

use crate::api::CartApi;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

/// Public profile returned by the auth endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// A successful register or login.
#[derive(Debug)]
pub struct SignedIn {
    pub account: Account,
    pub token: SecretString,
}

#[derive(Deserialize)]
struct AuthBody {
    data: Account,
    token: String,
}

#[derive(Deserialize)]
struct CartBody {
    #[serde(default)]
    items: CartLines,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Serialize)]
struct RegisterBody<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct SaveCartBody<'a> {
    items: &'a CartLines,
}

/// Client for the storefront API.
///
/// Cheap to clone; clones share the HTTP connection pool and the bearer
/// token slot.
#[derive(Clone)]
pub struct StorefrontClient {
    inner: Arc<StorefrontClientInner>,
}

struct StorefrontClientInner {
    client: reqwest::Client,
    base_url: String,
    token: RwLock<Option<SecretString>>,
}

impl std::fmt::Debug for StorefrontClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontClient")
            .field("base_url", &self.inner.base_url)
            .field("signed_in", &self.has_token())
            .finish()
    }
}

impl StorefrontClient {
    /// Create a client for the storefront at `config.base_url`.
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            inner: Arc::new(StorefrontClientInner {
                client: reqwest::Client::new(),
                base_url: config.base_url.clone(),
                token: RwLock::new(None),
            }),
        }
    }

    /// Storefront origin this client talks to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Store the bearer token used for cart calls.
    pub fn set_token(&self, token: SecretString) {
        *self.inner.token.write() = Some(token);
    }

    /// Forget the bearer token.
    pub fn clear_token(&self) {
        *self.inner.token.write() = None;
    }

    /// Whether a bearer token is held.
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.inner.token.read().is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    /// Attach the bearer token, or refuse to build the request without one.
    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let token = self.inner.token.read();
        let token = token.as_ref().ok_or(ClientError::Unauthenticated)?;
        Ok(request.bearer_auth(token.expose_secret()))
    }

    /// Create an account. The response already carries a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Status` with the server's message when the
    /// account is rejected, or `ClientError::Http` on transport failure.
    #[instrument(skip(self, password), fields(base_url = %self.inner.base_url))]
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<SignedIn> {
        let response = self
            .inner
            .client
            .post(self.url("/api/auth/register"))
            .json(&RegisterBody {
                name,
                email,
                password,
            })
            .send()
            .await?;
        read_json::<AuthBody>(response).await.map(SignedIn::from)
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Status` ("Invalid credentials") on a bad
    /// email/password pair, or `ClientError::Http` on transport failure.
    #[instrument(skip(self, password), fields(base_url = %self.inner.base_url))]
    pub async fn login(&self, email: &str, password: &str) -> Result<SignedIn> {
        let response = self
            .inner
            .client
            .post(self.url("/api/auth/login"))
            .json(&LoginBody { email, password })
            .send()
            .await?;
        read_json::<AuthBody>(response).await.map(SignedIn::from)
    }
}

impl From<AuthBody> for SignedIn {
    fn from(body: AuthBody) -> Self {
        Self {
            account: body.data,
            token: SecretString::from(body.token),
        }
    }
}

#[async_trait]
impl CartApi for StorefrontClient {
    #[instrument(skip(self))]
    async fn fetch_cart(&self) -> Result<CartLines> {
        let request = self.authorized(self.inner.client.get(self.url("/api/cart")))?;
        let body = read_json::<CartBody>(request.send().await?).await?;
        Ok(body.items)
    }

    #[instrument(skip(self, items), fields(lines = items.len()))]
    async fn save_cart(&self, items: &CartLines) -> Result<()> {
        let request = self.authorized(self.inner.client.post(self.url("/api/cart")))?;
        let response = request.json(&SaveCartBody { items }).send().await?;
        read_json::<serde_json::Value>(response).await?;
        Ok(())
    }
}

/// Decode a success body, or turn an error body into `ClientError::Status`.
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map_or_else(|_| body.chars().take(200).collect(), |e| e.message);
    tracing::debug!(status = %status, message = %message, "Storefront returned an error");

    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}
