//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::notifications::NotificationError;
use crate::services::auth::AuthError;
use crate::services::cart::CartServiceError;
use crate::services::catalog::CatalogError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Catalog operation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartServiceError),

    /// Notification channel could not be opened.
    #[error("Notification error: {0}")]
    Notification(#[from] NotificationError),

    /// User is authenticated but not allowed to do this.
    #[error("Forbidden: {0}")]
    Forbidden(String),
}

impl AppError {
    /// HTTP status this error maps to.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::Unauthenticated => {
                    StatusCode::UNAUTHORIZED
                }
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::WeakPassword(_) | AuthError::InvalidEmail(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                AuthError::Repository(_) | AuthError::PasswordHash | AuthError::TokenSigning(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Catalog(err) => match err {
                CatalogError::NotFound { .. } => StatusCode::NOT_FOUND,
                CatalogError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                CatalogError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Cart(err) => match err {
                CartServiceError::NotInCart(_) | CartServiceError::UserNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                CartServiceError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
                CartServiceError::VersionConflict | CartServiceError::Conflict { .. } => {
                    StatusCode::CONFLICT
                }
                CartServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Notification(err) => match err {
                NotificationError::RegistryFull { .. } | NotificationError::ShuttingDown => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                NotificationError::Poll(_) | NotificationError::Push(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }

    /// Message safe to show to clients.
    fn public_message(&self) -> String {
        match self {
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => "Invalid credentials".to_string(),
                AuthError::Unauthenticated => "Not authenticated".to_string(),
                AuthError::UserAlreadyExists => {
                    "An account with this email already exists".to_string()
                }
                AuthError::WeakPassword(msg) => msg.clone(),
                AuthError::InvalidEmail(e) => format!("Invalid email address: {e}"),
                _ => "Internal server error".to_string(),
            },
            Self::Catalog(err @ (CatalogError::NotFound { .. } | CatalogError::Validation { .. })) => {
                err.to_string()
            }
            Self::Notification(
                err @ (NotificationError::RegistryFull { .. } | NotificationError::ShuttingDown),
            ) => err.to_string(),
            Self::Cart(
                err @ (CartServiceError::NotInCart(_)
                | CartServiceError::UserNotFound(_)
                | CartServiceError::Invalid(_)
                | CartServiceError::VersionConflict
                | CartServiceError::Conflict { .. }),
            ) => err.to_string(),
            Self::Forbidden(_) => self.to_string(),
            _ => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else if status.is_server_error() {
            tracing::warn!(error = %self, "Request refused");
        }

        let mut response = (status, self.public_message()).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}
