//! Bearer token extractor.
//!
//! Resolves `Authorization: Bearer <token>` to the caller's [`Identity`].
//! Extractors from request parts run before body extractors, so a rejected
//! request never has its body parsed or touches storage.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::Utc;

use crate::error::{AppError, set_sentry_user};
use crate::services::auth::Identity;
use crate::state::AppState;

/// Extractor that requires a valid bearer token.
///
/// Rejects with 401 when no bearer token is presented and 403 when the token
/// is malformed, forged, or expired.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireIdentity(identity): RequireIdentity,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", identity.name)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireIdentity(pub Identity);

impl<S> FromRequestParts<S> for RequireIdentity
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_owned()))?;

        let state = AppState::from_ref(state);
        let claims = state.signer().verify(token, Utc::now()).map_err(|e| {
            tracing::debug!(error = %e, "Bearer token rejected");
            AppError::Forbidden("Invalid or expired token".to_owned())
        })?;

        set_sentry_user(&claims.sub, Some(&claims.email));
        Ok(Self(claims.into()))
    }
}

/// The token of a `Bearer` authorization header, if one is present.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
