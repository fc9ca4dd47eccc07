//! Cart route handlers.
//!
//! Both handlers change the quantity by one and return the updated user.
//! Product ids are not checked against the catalog.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use cartwheel_core::ProductId;

use crate::error::Result;
use crate::middleware::BearerUser;
use crate::models::UserView;
use crate::services::cart::CartService;
use crate::state::AppState;

/// Query parameters naming the product.
#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    pub product_id: ProductId,
}

/// Add one unit of a product to the caller's cart.
#[tracing::instrument(skip_all, fields(user_id = %user.id, product_id = %query.product_id))]
pub async fn add_to_bucket(
    State(state): State<AppState>,
    BearerUser(user): BearerUser,
    Query(query): Query<ProductQuery>,
) -> Result<Json<UserView>> {
    let user = CartService::new(state.uow())
        .add(user.id, query.product_id)
        .await?;
    Ok(Json(user.into()))
}

/// Remove one unit of a product from the caller's cart.
#[tracing::instrument(skip_all, fields(user_id = %user.id, product_id = %query.product_id))]
pub async fn remove_product(
    State(state): State<AppState>,
    BearerUser(user): BearerUser,
    Query(query): Query<ProductQuery>,
) -> Result<Json<UserView>> {
    let user = CartService::new(state.uow())
        .remove(user.id, query.product_id)
        .await?;
    Ok(Json(user.into()))
}
