//! Review writes keep the product rating in step.

use reqwest::{Method, StatusCode};
use serde_json::{Value, json};

use essence_core::{Price, ProductId};
use essence_integration_tests::TestContext;

async fn rating(ctx: &TestContext, id: ProductId) -> Value {
    let (_, body) = ctx
        .send(Method::GET, &format!("/api/products/{id}"), None, None)
        .await;
    body["rating"].clone()
}

#[tokio::test]
async fn test_seeded_rating_and_review_lifecycle() {
    let (ctx, summary) = TestContext::seeded().await;
    let featured = summary.featured_product;
    assert_eq!(rating(&ctx, featured).await, 4.67);

    let (status, created) = ctx
        .send(
            Method::POST,
            "/api/reviews",
            None,
            Some(json!({
                "productId": featured,
                "userId": "guest",
                "rating": 3,
                "comment": "Lovely but faint"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(rating(&ctx, featured).await, 4.25);

    let id = created["_id"].as_str().expect("review id").to_owned();
    let (status, _) = ctx
        .send(
            Method::PATCH,
            &format!("/api/reviews/{id}"),
            None,
            Some(json!({ "rating": 5 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rating(&ctx, featured).await, 4.75);

    let (status, _) = ctx
        .send(Method::DELETE, &format!("/api/reviews/{id}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rating(&ctx, featured).await, 4.67);

    let (_, again) = ctx
        .send(Method::DELETE, &format!("/api/reviews/{id}"), None, None)
        .await;
    assert_eq!(again["message"], "Review not found");
}

#[tokio::test]
async fn test_demo_alias_serves_featured_product() {
    let (ctx, summary) = TestContext::seeded().await;

    let (status, product) = ctx.send(Method::GET, "/api/products/1", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(product["name"], "Midnight Rose");
    assert_eq!(product["_id"], json!(summary.featured_product));

    let (_, by_alias) = ctx
        .send(Method::GET, "/api/reviews/product/1", None, None)
        .await;
    let (_, by_id) = ctx
        .send(
            Method::GET,
            &format!("/api/reviews/product/{}", summary.featured_product),
            None,
            None,
        )
        .await;
    assert_eq!(by_alias, by_id);
    assert_eq!(by_alias.as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn test_created_product_is_served_back() {
    let ctx = TestContext::start().await;

    let (status, created) = ctx
        .send(
            Method::POST,
            "/api/products",
            None,
            Some(json!({
                "name": "Vetiver Smoke",
                "brand": "Maison Test",
                "description": "Dry and green",
                "price": 120,
                "category": "Woody",
                "images": ["/images/vetiver.jpg"],
                "sizeOptions": [{ "size": "50ml", "price": 120 }, { "size": "100ml", "price": 180 }]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let id = ProductId::parse(created["_id"].as_str().expect("product id")).expect("valid id");
    let product = ctx.product(id).await;
    assert_eq!(product.name, "Vetiver Smoke");
    assert_eq!(product.size_options.len(), 2);

    let cart_line = ctx.product_ref(id).await;
    assert_eq!(cart_line.unit_price(Some("100ml")), Price::from_units(180));
    assert_eq!(cart_line.unit_price(Some("30ml")), Price::from_units(120));
}
