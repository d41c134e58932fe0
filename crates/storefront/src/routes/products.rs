//! Product route handlers.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::Utc;
use tracing::instrument;

use essence_core::{NewProduct, Product};

use crate::error::{AppError, Result};
use crate::services::catalog::ProductKey;
use crate::state::AppState;

/// Product detail.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Product>> {
    let key = ProductKey::parse(&id)
        .map_err(|_| AppError::BadRequest("Invalid product ID format".to_owned()))?;

    state
        .catalog()
        .find(key)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Product not found".to_owned()))
}

/// Create a product.
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    payload: std::result::Result<Json<NewProduct>, JsonRejection>,
) -> Result<(StatusCode, Json<Product>)> {
    let Json(input) = payload?;
    let product = state.catalog().create(input, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::db::ProductRepository;
    use crate::db::seed::demo_products;
    use crate::routes::test_support::*;
    use axum::http::StatusCode;
    use chrono::Utc;
    use serde_json::json;

    #[tokio::test]
    async fn test_show_by_id_and_alias() {
        let (store, _, app) = memory_app();
        let products = demo_products(Utc::now());
        for product in &products {
            store.insert(product).await.unwrap();
        }
        let ocean = &products[1];

        let (status, body) =
            send(&app, "GET", &format!("/api/products/{}", ocean.id), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Ocean Breeze");
        assert_eq!(body["price"], 249);

        let (status, body) = send(&app, "GET", "/api/products/1", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Midnight Rose");
        assert_eq!(body["sizeOptions"][1]["isDefault"], true);
    }

    #[tokio::test]
    async fn test_show_errors() {
        let (_, _, app) = memory_app();

        let (status, body) = send(&app, "GET", "/api/products/not-an-id", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid product ID format");

        let (status, body) =
            send(&app, "GET", "/api/products/65f1a2b3c4d5e6f7a8b9c0d1", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Product not found");

        // The alias resolves by name, so it is absent until the catalog is seeded.
        let (status, _) = send(&app, "GET", "/api/products/1", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create() {
        let (_, _, app) = memory_app();
        let payload = json!({
            "name": "Amber Twilight",
            "brand": "Golden Hour",
            "description": "Warm amber combined with vanilla and sandalwood.",
            "price": 279,
            "images": ["https://images.example.com/amber.jpg"],
            "category": "Oriental"
        });

        let (status, body) = send(&app, "POST", "/api/products", None, Some(payload)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["rating"], 0.0);
        assert_eq!(body["inventory"], 0);
        assert_eq!(body["tags"], json!([]));

        let (status, fetched) = send(
            &app,
            "GET",
            &format!("/api/products/{}", body["_id"].as_str().unwrap()),
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, body);
    }

    #[tokio::test]
    async fn test_create_lists_missing_fields() {
        let (_, _, app) = memory_app();
        let payload = json!({ "name": "Nameless", "images": ["x.jpg"] });

        let (status, body) = send(&app, "POST", "/api/products", None, Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["message"],
            "Missing required fields: brand, description, price, category"
        );
    }
}
