//! Cart notification channel.
//!
//! The upgrade is authenticated like any other request, and the token's
//! user must be the user named in the path. The registry slot is reserved
//! before upgrading so a full registry is refused with 503 instead of an
//! immediately closed socket.

use axum::{
    extract::{Path, State, WebSocketUpgrade},
    response::Response,
};

use cartwheel_core::UserId;

use crate::error::{AppError, Result};
use crate::middleware::UpgradeUser;
use crate::notifications::Disconnect;
use crate::state::AppState;

/// Open a notification channel for `user_id`.
#[tracing::instrument(skip_all, fields(user_id = %user_id))]
pub async fn notifications(
    Path(user_id): Path<UserId>,
    State(state): State<AppState>,
    UpgradeUser(user): UpgradeUser,
    upgrade: WebSocketUpgrade,
) -> Result<Response> {
    if user.id != user_id {
        return Err(AppError::Forbidden(format!(
            "cannot subscribe to notifications for user {user_id}"
        )));
    }

    let session = state.notifications().reserve(user_id)?;
    let connection_id = session.id();
    tracing::info!(%connection_id, "Notification channel opened");

    Ok(upgrade.on_upgrade(move |socket| async move {
        match session.run(socket).await {
            Ok(Disconnect::Client) => {
                tracing::info!(%connection_id, "Notification channel closed by client");
            }
            Ok(Disconnect::Shutdown) => {
                tracing::info!(%connection_id, "Notification channel closed for shutdown");
            }
            Err(e) => {
                tracing::error!(%connection_id, error = %e, "Notification channel failed");
            }
        }
    }))
}
