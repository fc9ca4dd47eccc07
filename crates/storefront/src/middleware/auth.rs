//! Bearer token extractors.
//!
//! Handlers that need a signed-in user take [`BearerUser`]. The token is
//! verified before the store is touched, and the user row is then loaded
//! fresh for every request.

use std::collections::HashMap;

use axum::{
    extract::{FromRequestParts, Query},
    http::{header, request::Parts},
};

use crate::error::{AppError, set_sentry_user};
use crate::models::User;
use crate::services::auth::AuthError;
use crate::state::AppState;

/// Query parameter accepted in place of the `Authorization` header where
/// clients cannot set headers (browser WebSocket upgrades).
pub const TOKEN_QUERY_PARAM: &str = "token";

/// Extractor that requires a valid bearer token in the `Authorization` header.
///
/// Rejects with 401 if the header is missing, the token is invalid, or the
/// user is gone or inactive.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(BearerUser(user): BearerUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct BearerUser(pub User);

impl FromRequestParts<AppState> for BearerUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = header_token(parts).ok_or(AuthError::Unauthenticated)?;
        resolve(state, &token).await.map(Self)
    }
}

/// Like [`BearerUser`], but also accepts the token as a `token` query parameter.
pub struct UpgradeUser(pub User);

impl FromRequestParts<AppState> for UpgradeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = header_token(parts)
            .or_else(|| query_token(parts))
            .ok_or(AuthError::Unauthenticated)?;
        resolve(state, &token).await.map(Self)
    }
}

async fn resolve(state: &AppState, token: &str) -> Result<User, AppError> {
    let user = state.auth().resolve_bearer_token(token).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    tracing::Span::current().record("user_id", tracing::field::display(user.id));
    Ok(user)
}

/// Token from `Authorization: Bearer <token>`; the scheme is case-insensitive.
fn header_token(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_owned())
}

/// Token from the percent-decoded `token` query parameter.
fn query_token(parts: &Parts) -> Option<String> {
    let Query(mut params) = Query::<HashMap<String, String>>::try_from_uri(&parts.uri).ok()?;
    params
        .remove(TOKEN_QUERY_PARAM)
        .filter(|value| !value.is_empty())
}
