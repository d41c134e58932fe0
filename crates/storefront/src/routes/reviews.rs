//! Review route handlers.
//!
//! Reviews carry no authentication; `userId` is whatever the client sends.
//! Each mutation recomputes the product's rating before responding.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::Utc;
use serde::Serialize;
use tracing::instrument;

use essence_core::{NewReview, Review, ReviewId, ReviewPatch};

use crate::error::{AppError, Result};
use crate::services::catalog::ProductKey;
use crate::state::AppState;

/// Body of a successful delete.
#[derive(Debug, Serialize)]
pub struct Deleted {
    message: &'static str,
}

fn parse_review_id(raw: &str) -> Result<ReviewId> {
    ReviewId::parse(raw).map_err(|_| AppError::BadRequest("Invalid review ID format".to_owned()))
}

/// Reviews of a product, newest first.
///
/// The demo alias resolves through the catalog; when it resolves to nothing
/// the list is empty.
#[instrument(skip(state))]
pub async fn list_by_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Json<Vec<Review>>> {
    let key = ProductKey::parse(&product_id)
        .map_err(|_| AppError::BadRequest("Invalid product ID format".to_owned()))?;

    let product_id = match key {
        ProductKey::Id(id) => id,
        ProductKey::DemoAlias => match state.catalog().find(key).await? {
            Some(product) => product.id,
            None => return Ok(Json(Vec::new())),
        },
    };

    Ok(Json(state.reviews().list_by_product(&product_id).await?))
}

/// Create a review.
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    payload: std::result::Result<Json<NewReview>, JsonRejection>,
) -> Result<(StatusCode, Json<Review>)> {
    let Json(input) = payload?;
    let review = state.reviews().create(input, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// Update a review.
#[instrument(skip(state, payload))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<ReviewPatch>, JsonRejection>,
) -> Result<Json<Review>> {
    let id = parse_review_id(&id)?;
    let Json(patch) = payload?;
    let review = state.reviews().update(&id, &patch, Utc::now()).await?;
    Ok(Json(review))
}

/// Delete a review.
#[instrument(skip(state))]
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Deleted>> {
    let id = parse_review_id(&id)?;
    state.reviews().delete(&id).await?;
    Ok(Json(Deleted {
        message: "Review deleted successfully",
    }))
}
