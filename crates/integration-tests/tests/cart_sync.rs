//! A signed-in client's cart mirrors itself to the server.

use std::num::NonZeroU32;
use reqwest::{Method, StatusCode};
use serde_json::json;

use essence_client::{AuthSession, ClientError, LoadOutcome, SyncOutcome};
use essence_integration_tests::{TEST_DEBOUNCE, TestContext};
use essence_storefront::db::seed::{DEMO_EMAIL, DEMO_PASSWORD};

fn qty(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).expect("non-zero quantity")
}

#[tokio::test]
async fn test_cart_follows_user_across_sessions() {
    let (ctx, _) = TestContext::seeded().await;
    let token = ctx.token(DEMO_EMAIL, DEMO_PASSWORD).await;
    let first = ctx.demo_product(0).await;
    let second = ctx.demo_product(1).await;

    let laptop = AuthSession::new(&ctx.client_config());
    let account = laptop.login(DEMO_EMAIL, DEMO_PASSWORD).await.expect("login");
    assert_eq!(account.email, DEMO_EMAIL);
    assert!(laptop.cart().items().is_empty());

    laptop.cart().add_item(first.clone(), qty(1), Some("50ml".to_owned()));
    laptop.cart().add_item(second, qty(2), None);
    laptop.cart().add_item(first, qty(1), Some("50ml".to_owned()));
    assert_eq!(laptop.cart().item_count(), 4);

    let items = ctx
        .eventually_items(&token, |items| items.as_array().is_some_and(|a| a.len() == 2))
        .await;
    assert_eq!(items[0]["quantity"], 2);
    assert_eq!(items[0]["selectedSize"], "50ml");
    assert_eq!(items[1]["quantity"], 2);
    assert!(items[1].get("selectedSize").is_none());
    assert!(laptop.cart().last_sync_time().is_some());

    let phone = AuthSession::new(&ctx.client_config());
    phone.login(DEMO_EMAIL, DEMO_PASSWORD).await.expect("login");
    assert_eq!(phone.cart().items(), laptop.cart().items());
    assert_eq!(phone.cart().total(), laptop.cart().total());
}

#[tokio::test]
async fn test_logout_drops_pending_push() {
    let (ctx, _) = TestContext::seeded().await;
    let token = ctx.token(DEMO_EMAIL, DEMO_PASSWORD).await;
    let rose = ctx.demo_product(0).await;

    let session = AuthSession::new(&ctx.client_config());
    session.login(DEMO_EMAIL, DEMO_PASSWORD).await.expect("login");
    session.cart().add_item(rose, qty(1), None);
    session.logout();

    assert!(!session.is_authenticated());
    assert!(session.cart().items().is_empty());
    assert!(!session.client().has_token());

    tokio::time::sleep(TEST_DEBOUNCE * 6).await;
    assert_eq!(ctx.server_items(&token).await, json!([]));
}

#[tokio::test]
async fn test_switching_accounts_keeps_carts_apart() {
    let (ctx, _) = TestContext::seeded().await;
    AuthSession::new(&ctx.client_config())
        .register("Noor", "noor@example.com", "vetiver42")
        .await
        .expect("register");
    let demo_token = ctx.token(DEMO_EMAIL, DEMO_PASSWORD).await;
    let noor_token = ctx.token("noor@example.com", "vetiver42").await;
    let rose = ctx.demo_product(0).await;
    let cedar = ctx.demo_product(1).await;

    let session = AuthSession::new(&ctx.client_config());
    session.login(DEMO_EMAIL, DEMO_PASSWORD).await.expect("login");
    session.cart().add_item(rose, qty(2), None);
    let noor = session
        .login("noor@example.com", "vetiver42")
        .await
        .expect("login");

    assert_eq!(session.cart().user_id(), Some(noor.id));
    assert!(session.cart().items().is_empty());

    tokio::time::sleep(TEST_DEBOUNCE * 6).await;
    assert_eq!(ctx.server_items(&noor_token).await, json!([]));
    assert_eq!(ctx.server_items(&demo_token).await, json!([]));

    let cedar_id = cedar.id.to_string();
    session.cart().add_item(cedar, qty(1), None);
    let items = ctx
        .eventually_items(&noor_token, |items| items.as_array().is_some_and(|a| !a.is_empty()))
        .await;
    assert_eq!(items.as_array().map(Vec::len), Some(1));
    assert_eq!(items[0]["product"]["_id"], json!(cedar_id));
    assert_eq!(ctx.server_items(&demo_token).await, json!([]));
}

#[tokio::test]
async fn test_register_binds_a_fresh_cart() {
    let ctx = TestContext::start().await;

    let session = AuthSession::new(&ctx.client_config());
    let account = session
        .register("Ava", "Ava@Example.com", "rosewater9")
        .await
        .expect("register");
    assert_eq!(account.email, "ava@example.com");
    assert_eq!(session.cart().user_id(), Some(account.id));
    assert_eq!(session.cart().load_from_server().await, LoadOutcome::Applied);

    let again = AuthSession::new(&ctx.client_config())
        .register("Ava", "ava@example.com", "rosewater9")
        .await;
    assert!(matches!(
        again,
        Err(ClientError::Status { status: 400, ref message }) if message == "User already exists"
    ));
}

#[tokio::test]
async fn test_bad_credentials_leave_session_signed_out() {
    let (ctx, _) = TestContext::seeded().await;
    let session = AuthSession::new(&ctx.client_config());

    let result = session.login(DEMO_EMAIL, "not-the-password").await;
    assert!(matches!(
        result,
        Err(ClientError::Status { status: 400, ref message }) if message == "Invalid credentials"
    ));
    assert!(!session.is_authenticated());
    assert_eq!(session.cart().user_id(), None);
}

#[tokio::test]
async fn test_cart_endpoints_require_a_valid_token() {
    let ctx = TestContext::start().await;

    let (status, body) = ctx.send(Method::GET, "/api/cart", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Authentication required");

    let (status, _) = ctx
        .send(Method::POST, "/api/cart", Some("forged.token"), Some(json!({ "items": [] })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(ctx.store.cart_count(), 0);
}

#[tokio::test]
async fn test_restored_snapshot_survives_relogin() {
    let (ctx, _) = TestContext::seeded().await;
    let first = ctx.demo_product(0).await;

    let session = AuthSession::new(&ctx.client_config());
    session.login(DEMO_EMAIL, DEMO_PASSWORD).await.expect("login");
    session.cart().add_item(first, qty(3), None);
    assert_eq!(session.cart().sync_to_server().await, SyncOutcome::Pushed);
    let snapshot = session.cart().snapshot();
    session.cart().shutdown();

    let restarted = AuthSession::restore(&ctx.client_config(), snapshot);
    assert_eq!(restarted.cart().item_count(), 3);
    restarted.login(DEMO_EMAIL, DEMO_PASSWORD).await.expect("login");
    assert_eq!(restarted.cart().item_count(), 3);
    assert!(restarted.cart().last_sync_time().is_some());
}
