//! Integration tests for the Essence storefront.
//!
//! Every test boots the real router on an ephemeral port against a fresh
//! in-memory store, then talks to it over HTTP, either with raw `reqwest`
//! or through `essence-client`.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p essence-integration-tests
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, StatusCode};
use secrecy::SecretString;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use essence_client::ClientConfig;
use essence_core::{Product, ProductId, ProductRef};
use essence_storefront::config::StorefrontConfig;
use essence_storefront::db::seed::{self, SeedSummary};
use essence_storefront::db::{MemoryStore, ProductRepository, Repositories};
use essence_storefront::{AppState, app};

/// Signing secret for test servers.
pub const TEST_SECRET: &str = "kR8#vQ2!mZ5@tW9$yB4^nL7&pX1*cF6";

/// Debounce used by test clients, short enough to keep tests quick.
pub const TEST_DEBOUNCE: Duration = Duration::from_millis(50);

/// A storefront running in the test's runtime.
pub struct TestContext {
    pub base_url: String,
    pub http: Client,
    pub store: Arc<MemoryStore>,
    shutdown: CancellationToken,
}

impl TestContext {
    /// Boot a storefront with an empty in-memory store.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot bind.
    pub async fn start() -> Self {
        let store = Arc::new(MemoryStore::default());
        let config = StorefrontConfig::in_memory(SecretString::from(TEST_SECRET));
        let state = AppState::new(config, Repositories::from_memory(Arc::clone(&store)))
            .expect("Failed to build app state");

        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");

        let shutdown = CancellationToken::new();
        let signal = shutdown.clone();
        tokio::spawn(async move {
            axum::serve(listener, app(state))
                .with_graceful_shutdown(signal.cancelled_owned())
                .await
                .expect("Test server failed");
        });

        Self {
            base_url: format!("http://{addr}"),
            http: Client::new(),
            store,
            shutdown,
        }
    }

    /// Boot a storefront holding the demo data.
    ///
    /// # Panics
    ///
    /// Panics if seeding fails.
    pub async fn seeded() -> (Self, SeedSummary) {
        let ctx = Self::start().await;
        let summary = seed::seed(&ctx.repositories(), Utc::now())
            .await
            .expect("Failed to seed demo data");
        (ctx, summary)
    }

    /// Repositories over the server's store.
    #[must_use]
    pub fn repositories(&self) -> Repositories {
        Repositories::from_memory(Arc::clone(&self.store))
    }

    /// Client configuration pointing at this server.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.base_url.clone()).with_sync_debounce(TEST_DEBOUNCE)
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Send a JSON request and decode the JSON answer.
    ///
    /// # Panics
    ///
    /// Panics if the request fails or the body is not JSON.
    pub async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = self.http.request(method, self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await.expect("Request failed");
        let status = response.status();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }

    /// Log in over raw HTTP and return the bearer token.
    ///
    /// # Panics
    ///
    /// Panics if the login is rejected.
    pub async fn token(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .send(
                reqwest::Method::POST,
                "/api/auth/login",
                None,
                Some(serde_json::json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["token"].as_str().expect("token missing").to_owned()
    }

    /// The `index`-th demo perfume as stored by [`TestContext::seeded`].
    ///
    /// # Panics
    ///
    /// Panics if the store was not seeded.
    pub async fn demo_product(&self, index: usize) -> ProductRef {
        let name = seed::demo_products(Utc::now())
            .into_iter()
            .nth(index)
            .expect("no such demo product")
            .name;
        let product = ProductRepository::find_by_name(self.store.as_ref(), &name)
            .await
            .expect("product lookup failed")
            .expect("demo product missing; was the store seeded?");
        ProductRef::from(&product)
    }

    /// Fetch a product as the cart stores it.
    ///
    /// # Panics
    ///
    /// Panics if the product does not exist.
    pub async fn product_ref(&self, id: ProductId) -> ProductRef {
        ProductRef::from(&self.product(id).await)
    }

    /// Fetch a product.
    ///
    /// # Panics
    ///
    /// Panics if the product does not exist.
    pub async fn product(&self, id: ProductId) -> Product {
        let (status, body) = self
            .send(reqwest::Method::GET, &format!("/api/products/{id}"), None, None)
            .await;
        assert_eq!(status, StatusCode::OK, "product lookup failed: {body}");
        serde_json::from_value(body).expect("Product did not decode")
    }

    /// The `items` of the server cart for `token`.
    ///
    /// # Panics
    ///
    /// Panics if the cart request is rejected.
    pub async fn server_items(&self, token: &str) -> Value {
        let (status, body) = self
            .send(reqwest::Method::GET, "/api/cart", Some(token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        body["items"].clone()
    }

    /// Poll the server cart until `expected` holds or two seconds pass.
    pub async fn eventually_items(&self, token: &str, expected: impl Fn(&Value) -> bool) -> Value {
        let mut items = self.server_items(token).await;
        for _ in 0..100 {
            if expected(&items) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            items = self.server_items(token).await;
        }
        items
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
