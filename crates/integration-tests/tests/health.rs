//! Liveness, readiness, and request ids.

use reqwest::StatusCode;

use essence_integration_tests::TestContext;

#[tokio::test]
async fn test_health_endpoints() {
    let ctx = TestContext::start().await;

    let live = ctx.http.get(ctx.url("/health")).send().await.expect("health");
    assert_eq!(live.status(), StatusCode::OK);
    assert_eq!(live.text().await.expect("body"), "ok");

    let ready = ctx.http.get(ctx.url("/health/ready")).send().await.expect("ready");
    assert_eq!(ready.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_request_id_round_trip() {
    let ctx = TestContext::start().await;

    let echoed = ctx
        .http
        .get(ctx.url("/health"))
        .header("x-request-id", "checkout-42")
        .send()
        .await
        .expect("health");
    assert_eq!(
        echoed.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("checkout-42")
    );

    let generated = ctx.http.get(ctx.url("/health")).send().await.expect("health");
    let id = generated
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .expect("request id header");
    assert_eq!(id.len(), 36);
}
