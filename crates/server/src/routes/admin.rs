//! Administrator endpoints. Every handler requires the `ADMIN` role.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};

use cafe_calories_core::{CafeId, RefundRequestId, RefundStatus, UserId};

use super::StatusResponse;
use super::cafes::CreateCafeRequest;
use crate::db::cafes::CafeRemoval;
use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::{Cafe, Order, RefundRequest};
use crate::services::{AdminService, PaymentService};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/block_user/{id}", post(block_user))
        .route("/cafes", post(create_cafe))
        .route("/cafes/{id}", delete(delete_cafe))
        .route("/refunds", get(list_refunds))
        .route("/refunds/{id}/approve", post(approve_refund))
        .route("/refunds/{id}/reject", post(reject_refund))
}

#[derive(Debug, Deserialize)]
pub struct AdminCafeRequest {
    #[serde(flatten)]
    pub cafe: CreateCafeRequest,
    pub owner_id: Option<UserId>,
}

#[derive(Debug, Deserialize)]
pub struct RefundFilter {
    pub status: Option<RefundStatus>,
}

#[derive(Debug, Serialize)]
pub struct RefundDecision {
    pub refund: RefundRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<Order>,
}

/// # Errors
///
/// 403 for non-admins or self-blocking, 404 for an unknown user.
pub async fn block_user(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Path(user_id): Path<UserId>,
) -> Result<Json<StatusResponse>> {
    AdminService::new(state.pool()).block_user(&admin, user_id).await?;
    Ok(Json(StatusResponse::new("blocked")))
}

/// # Errors
///
/// 422 if `owner_id` is not an active owner or the fields are invalid.
pub async fn create_cafe(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Json(body): Json<AdminCafeRequest>,
) -> Result<(StatusCode, Json<Cafe>)> {
    let cafe = AdminService::new(state.pool())
        .create_cafe(&admin, body.cafe.into(), body.owner_id)
        .await?;
    Ok((StatusCode::CREATED, Json(cafe)))
}

/// Delete a cafe, or deactivate it when orders reference it.
///
/// # Errors
///
/// 404 for an unknown cafe.
pub async fn delete_cafe(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Path(cafe_id): Path<CafeId>,
) -> Result<Json<StatusResponse>> {
    let removal = AdminService::new(state.pool())
        .delete_cafe(&admin, cafe_id)
        .await?;
    let status = match removal {
        CafeRemoval::Deleted => "deleted",
        CafeRemoval::Deactivated => "deactivated",
    };
    Ok(Json(StatusResponse::new(status)))
}

/// # Errors
///
/// 403 for non-admins.
pub async fn list_refunds(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Query(filter): Query<RefundFilter>,
) -> Result<Json<Vec<RefundRequest>>> {
    let refunds = PaymentService::new(state.pool())
        .list_refunds(&admin, filter.status)
        .await?;
    Ok(Json(refunds))
}

/// # Errors
///
/// 400 unless the request is still pending.
pub async fn approve_refund(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Path(refund_id): Path<RefundRequestId>,
) -> Result<Json<RefundDecision>> {
    resolve(&state, &admin, refund_id, true).await
}

/// # Errors
///
/// 400 unless the request is still pending.
pub async fn reject_refund(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Path(refund_id): Path<RefundRequestId>,
) -> Result<Json<RefundDecision>> {
    resolve(&state, &admin, refund_id, false).await
}

async fn resolve(
    state: &AppState,
    admin: &crate::models::User,
    refund_id: RefundRequestId,
    approve: bool,
) -> Result<Json<RefundDecision>> {
    let (refund, order) = PaymentService::new(state.pool())
        .resolve_refund(admin, refund_id, approve)
        .await?;
    Ok(Json(RefundDecision { refund, order }))
}
