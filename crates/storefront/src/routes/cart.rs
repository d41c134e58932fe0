//! Cart route handlers.
//!
//! Both handlers take [`RequireIdentity`] first, so a request without a
//! usable bearer token is rejected before its body is read or storage is
//! touched. The cart belongs to the identity in the token; nothing in the
//! request body can select another user's cart.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::instrument;

use essence_core::{CartItem, CartLines};

use crate::error::{AppError, Result};
use crate::middleware::RequireIdentity;
use crate::state::AppState;

const ITEMS_NOT_ARRAY: &str = "Invalid cart data. Items must be an array.";

/// Body of `GET /api/cart` when no cart was ever stored.
#[derive(Serialize)]
pub struct EmptyCart {
    items: [CartItem; 0],
}

/// Body of a successful `POST /api/cart`.
#[derive(Serialize)]
pub struct CartUpdated {
    message: &'static str,
    items: CartLines,
}

/// Get the caller's cart.
#[instrument(skip(state, identity), fields(user_id = %identity.user_id))]
pub async fn show(
    State(state): State<AppState>,
    RequireIdentity(identity): RequireIdentity,
) -> Result<Response> {
    let response = match state.carts().get(&identity.user_id).await? {
        Some(cart) => Json(cart).into_response(),
        None => Json(EmptyCart { items: [] }).into_response(),
    };
    Ok(response)
}

/// Replace the caller's cart items.
#[instrument(skip(state, identity, payload), fields(user_id = %identity.user_id))]
pub async fn replace(
    State(state): State<AppState>,
    RequireIdentity(identity): RequireIdentity,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<CartUpdated>> {
    let Json(mut body) = payload?;
    let items = match body.get_mut("items").map(Value::take) {
        Some(items @ Value::Array(_)) => items,
        _ => return Err(AppError::BadRequest(ITEMS_NOT_ARRAY.to_owned())),
    };
    let items: Vec<CartItem> = serde_json::from_value(items)
        .map_err(|e| AppError::BadRequest(format!("Invalid cart item: {e}")))?;

    let cart = state
        .carts()
        .replace(&identity.user_id, items, Utc::now())
        .await?;

    Ok(Json(CartUpdated {
        message: "Cart updated successfully",
        items: cart.items,
    }))
}
