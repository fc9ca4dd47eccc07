//! Catalog route handlers.
//!
//! Owners, companies, and products share one set of generic handlers; each
//! collection is mounted with [`catalog_routes`].

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;

use crate::db::CatalogRecord;
use crate::error::Result;
use crate::services::catalog::CatalogService;
use crate::state::AppState;

/// Body returned after a delete.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: &'static str,
}

/// Create the routes for one catalog collection.
pub fn catalog_routes<R: CatalogRecord>() -> Router<AppState> {
    Router::new()
        .route("/", get(list::<R>).post(create::<R>))
        .route(
            "/{id}",
            get(detail::<R>).put(update::<R>).delete(remove::<R>),
        )
}

/// List every record in the collection.
pub async fn list<R: CatalogRecord>(State(state): State<AppState>) -> Result<Json<Vec<R>>> {
    let records = CatalogService::<R>::new(state.uow()).list().await?;
    Ok(Json(records))
}

/// Create a record with a server-generated id.
pub async fn create<R: CatalogRecord>(
    State(state): State<AppState>,
    Json(payload): Json<R::Payload>,
) -> Result<impl IntoResponse> {
    let record = CatalogService::<R>::new(state.uow()).create(payload).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Fetch one record.
pub async fn detail<R: CatalogRecord>(
    State(state): State<AppState>,
    Path(id): Path<R::Id>,
) -> Result<Json<R>> {
    let record = CatalogService::<R>::new(state.uow()).get(id).await?;
    Ok(Json(record))
}

/// Replace every mutable field of a record.
pub async fn update<R: CatalogRecord>(
    State(state): State<AppState>,
    Path(id): Path<R::Id>,
    Json(payload): Json<R::Payload>,
) -> Result<Json<R>> {
    let record = CatalogService::<R>::new(state.uow())
        .update(id, payload)
        .await?;
    Ok(Json(record))
}

/// Delete a record.
pub async fn remove<R: CatalogRecord>(
    State(state): State<AppState>,
    Path(id): Path<R::Id>,
) -> Result<Json<DeleteResponse>> {
    CatalogService::<R>::new(state.uow()).delete(id).await?;
    Ok(Json(DeleteResponse {
        message: "Item deleted successfully",
    }))
}
