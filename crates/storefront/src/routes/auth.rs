//! Authentication route handlers.
//!
//! Both endpoints answer `{ success, data, token }` where `data` is the
//! public user profile and `token` the bearer token for the cart API.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::Result;
use crate::models::user::UserProfile;
use crate::services::auth::Session;
use crate::state::AppState;

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Successful sign-in.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub data: UserProfile,
    pub token: String,
}

impl From<Session> for AuthResponse {
    fn from(session: Session) -> Self {
        Self {
            success: true,
            data: UserProfile::from(&session.user),
            token: session.token,
        }
    }
}

/// Create an account and sign in.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RegisterForm>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let Json(form) = payload?;
    let session = state
        .auth()
        .register(&form.name, &form.email, &form.password, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(session.into())))
}

/// Sign in with email and password.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    payload: std::result::Result<Json<LoginForm>, JsonRejection>,
) -> Result<Json<AuthResponse>> {
    let Json(form) = payload?;
    let session = state
        .auth()
        .login(&form.email, &form.password, Utc::now())
        .await?;
    tracing::info!(user_id = %session.user.id, "User logged in");
    Ok(Json(session.into()))
}
