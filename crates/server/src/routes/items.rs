//! Menu items of a cafe.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use serde::Deserialize;

use cafe_calories_core::{CafeId, ItemId};

use super::cafes::SearchQuery;
use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::{Item, NewItem};
use crate::services::CatalogService;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{cafe_id}", get(list).post(create))
        .route("/{cafe_id}/bulk", post(import))
        .route("/{cafe_id}/{item_id}", delete(deactivate))
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub items: Vec<NewItem>,
}

/// # Errors
///
/// 403 unless the caller owns the cafe or is an admin, 422 for invalid fields.
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(cafe_id): Path<CafeId>,
    Json(body): Json<NewItem>,
) -> Result<(StatusCode, Json<Item>)> {
    let item = CatalogService::new(state.pool())
        .add_item(&user, cafe_id, &body)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Import a parsed menu. Either every item is created or none is.
///
/// # Errors
///
/// Same as [`create`]; the first invalid item is named in the message.
pub async fn import(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(cafe_id): Path<CafeId>,
    Json(body): Json<ImportRequest>,
) -> Result<(StatusCode, Json<Vec<Item>>)> {
    let items = CatalogService::new(state.pool())
        .import_items(&user, cafe_id, &body.items)
        .await?;
    Ok((StatusCode::CREATED, Json(items)))
}

/// # Errors
///
/// 500 on database failure.
pub async fn list(
    State(state): State<AppState>,
    Path(cafe_id): Path<CafeId>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Item>>> {
    let items = CatalogService::new(state.pool())
        .list_items(cafe_id, query.q.as_deref())
        .await?;
    Ok(Json(items))
}

/// # Errors
///
/// 403 unless the caller owns the cafe or is an admin, 404 for an unknown item.
pub async fn deactivate(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((cafe_id, item_id)): Path<(CafeId, ItemId)>,
) -> Result<StatusCode> {
    CatalogService::new(state.pool())
        .deactivate_item(&user, cafe_id, item_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
