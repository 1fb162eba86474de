//! Order placement and lifecycle.
//!
//! `{id}` is an order id everywhere except `GET /orders/{id}`, where it is
//! the cafe whose orders are listed.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;

use cafe_calories_core::{CafeId, OrderId, OrderStatus, UserId};

use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::{Order, OrderItem, RefundRequest};
use crate::services::{DispatchService, OrderService, PaymentService};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/place", post(place))
        .route("/my", get(mine))
        .route("/{id}", get(for_cafe))
        .route("/{id}/items", get(items))
        .route("/{id}/cancel", post(cancel))
        .route("/{id}/status", post(update_status))
        .route("/{id}/assign-driver", post(assign_driver))
        .route("/{id}/refund", post(request_refund))
}

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub cafe_id: CafeId,
}

#[derive(Debug, Deserialize)]
pub struct StatusFilter {
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub new_status: OrderStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct AssignDriverRequest {
    /// Explicit driver; the nearest idle driver when absent.
    pub driver_id: Option<UserId>,
}

#[derive(Debug, Deserialize)]
pub struct RefundRequestBody {
    pub reason: String,
}

/// Turn the cart into a pending order.
///
/// # Errors
///
/// 400 for an empty cart or items from another cafe.
pub async fn place(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    let order = OrderService::new(state.pool(), state.config().orders)
        .place(&user, body.cafe_id)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Orders placed by the caller, newest first.
///
/// # Errors
///
/// 500 on database failure.
pub async fn mine(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderService::new(state.pool(), state.config().orders)
        .mine(&user)
        .await?;
    Ok(Json(orders))
}

/// Orders of a cafe, optionally filtered by status.
///
/// # Errors
///
/// 404 for an unknown cafe, 403 without cafe access.
pub async fn for_cafe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(cafe_id): Path<CafeId>,
    Query(filter): Query<StatusFilter>,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderService::new(state.pool(), state.config().orders)
        .for_cafe(&user, cafe_id, filter.status)
        .await?;
    Ok(Json(orders))
}

/// # Errors
///
/// 404 unless the caller placed the order, delivers it, or works at the cafe.
pub async fn items(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<OrderId>,
) -> Result<Json<Vec<OrderItem>>> {
    let items = OrderService::new(state.pool(), state.config().orders)
        .items(&user, order_id)
        .await?;
    Ok(Json(items))
}

/// # Errors
///
/// 404 unless the caller placed the order; 400 once the window has passed
/// or the order is beyond `ACCEPTED`.
pub async fn cancel(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<OrderId>,
) -> Result<Json<Order>> {
    let order = OrderService::new(state.pool(), state.config().orders)
        .cancel(&user, order_id)
        .await?;
    Ok(Json(order))
}

/// Staff transition, e.g. `?new_status=ACCEPTED`.
///
/// # Errors
///
/// 403 without cafe access, 400 for a transition outside the table.
pub async fn update_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<OrderId>,
    Query(update): Query<StatusUpdate>,
) -> Result<Json<Order>> {
    let order = OrderService::new(state.pool(), state.config().orders)
        .update_status(&user, order_id, update.new_status)
        .await?;
    Ok(Json(order))
}

/// Attach a driver. An empty body picks the nearest idle driver.
///
/// # Errors
///
/// 403 without cafe access; 400 if the order already has a driver, is not
/// `ACCEPTED`/`READY`, the driver is busy, or nobody is available.
pub async fn assign_driver(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<OrderId>,
    body: Option<Json<AssignDriverRequest>>,
) -> Result<Json<Order>> {
    let body = body.map(|Json(body)| body).unwrap_or_default();
    let order = DispatchService::new(state.pool())
        .assign(&user, order_id, body.driver_id)
        .await?;
    Ok(Json(order))
}

/// Ask for a refund of a paid order.
///
/// # Errors
///
/// 404 unless the caller placed the order; 400 if it is unpaid or a request
/// is already pending.
pub async fn request_refund(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<OrderId>,
    Json(body): Json<RefundRequestBody>,
) -> Result<(StatusCode, Json<RefundRequest>)> {
    let refund = PaymentService::new(state.pool())
        .request_refund(&user, order_id, &body.reason)
        .await?;
    Ok((StatusCode::CREATED, Json(refund)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;

    use super::*;
    use crate::routes::test_support::send;

    #[tokio::test]
    async fn placing_requires_auth() {
        let (response, body) = send(
            Request::post("/orders/place")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"cafe_id":1}"#))
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body["detail"], "Not authenticated");
    }

    #[tokio::test]
    async fn static_segments_win_over_ids() {
        let (response, _) = send(Request::get("/orders/my").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
