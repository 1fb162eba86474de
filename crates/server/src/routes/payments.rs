//! Mock payments.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::post,
};

use cafe_calories_core::OrderId;

use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::Payment;
use crate::services::PaymentService;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/{order_id}", post(pay))
}

/// Record a `MOCK` payment for the full order total.
///
/// # Errors
///
/// 404 unless the caller placed the order; 400 if the order is not payable
/// or already paid.
pub async fn pay(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<OrderId>,
) -> Result<(StatusCode, Json<Payment>)> {
    let payment = PaymentService::new(state.pool()).pay(&user, order_id).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}
