//! Account route handlers.

use axum::Json;

use crate::middleware::BearerUser;
use crate::models::UserView;

/// The signed-in user, cart included.
pub async fn me(BearerUser(user): BearerUser) -> Json<UserView> {
    Json(user.into())
}
