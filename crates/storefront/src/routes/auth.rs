//! Authentication route handlers.
//!
//! Login follows the OAuth2 password flow: credentials arrive as a form with
//! `username` and `password` fields and the response carries a bearer token.
//! Tokens are stateless, so logout only acknowledges the request.

use axum::{
    Form, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::middleware::BearerUser;
use crate::models::UserView;
use crate::state::AppState;

// =============================================================================
// Request / Response Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    /// The account email.
    pub username: String,
    pub password: String,
}

/// Registration body.
///
/// Account flags sent by the client are ignored; new accounts are always
/// active, unverified, and not superusers.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

/// Token issued on login.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

// =============================================================================
// Handlers
// =============================================================================

/// Exchange credentials for a bearer token.
#[tracing::instrument(skip(state, form), fields(email = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>> {
    let access_token = state
        .auth()
        .issue_token(&form.username, &form.password)
        .await?;

    tracing::info!("User logged in");
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
    }))
}

/// Acknowledge a logout.
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
pub async fn logout(BearerUser(user): BearerUser) -> StatusCode {
    tracing::info!("User logged out");
    StatusCode::NO_CONTENT
}

/// Create an account.
#[tracing::instrument(skip(state, body), fields(email = %body.email))]
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let user = state.auth().register(&body.email, &body.password).await?;

    tracing::info!(user_id = %user.id, "User registered");
    Ok((StatusCode::CREATED, Json(UserView::from(user))))
}
