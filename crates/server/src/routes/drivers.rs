//! Driver location, status and deliveries.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use cafe_calories_core::{DriverStatus, OrderId, UserId};

use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::{DriverLocation, DriverState, Order};
use crate::services::DispatchService;
use crate::services::dispatch::LocationReport;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route("/available", get(available))
        .route("/{id}/assigned-orders", get(assigned_orders))
        .route("/{id}/location", post(record_location))
        .route("/{id}/status", put(set_status))
        .route("/{id}/orders/{order_id}/pickup", post(pickup))
        .route("/{id}/orders/{order_id}/deliver", post(deliver))
}

#[derive(Debug, Deserialize)]
pub struct LocationRequest {
    pub lat: f64,
    pub lng: f64,
    pub status: Option<DriverStatus>,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: DriverStatus,
}

/// The caller's latest location, or `null` before the first report.
///
/// # Errors
///
/// 403 unless the caller is a driver.
pub async fn me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Option<DriverLocation>>> {
    Ok(Json(DispatchService::new(state.pool()).me(&user).await?))
}

/// Idle drivers with their last known position.
///
/// # Errors
///
/// 403 for customers and drivers.
pub async fn available(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<DriverState>>> {
    Ok(Json(DispatchService::new(state.pool()).available(&user).await?))
}

/// # Errors
///
/// 403 unless the caller is that driver or an admin.
pub async fn assigned_orders(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(driver_id): Path<UserId>,
) -> Result<Json<Vec<Order>>> {
    let orders = DispatchService::new(state.pool())
        .assigned_orders(&user, driver_id)
        .await?;
    Ok(Json(orders))
}

/// # Errors
///
/// 403 unless the caller is that driver or an admin; 422 for invalid
/// coordinates or a timestamp in the future.
pub async fn record_location(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(driver_id): Path<UserId>,
    Json(body): Json<LocationRequest>,
) -> Result<(StatusCode, Json<DriverLocation>)> {
    let report = LocationReport {
        lat: body.lat,
        lng: body.lng,
        status: body.status,
        timestamp: body.timestamp,
    };
    let location = DispatchService::new(state.pool())
        .record_location(&user, driver_id, report)
        .await?;
    Ok((StatusCode::CREATED, Json(location)))
}

/// # Errors
///
/// 403 unless the caller is that driver or an admin; 404 before the first
/// location report.
pub async fn set_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(driver_id): Path<UserId>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<DriverLocation>> {
    let location = DispatchService::new(state.pool())
        .set_status(&user, driver_id, body.status)
        .await?;
    Ok(Json(location))
}

/// # Errors
///
/// 403 if the order is not assigned to the driver, 400 unless it is `READY`.
pub async fn pickup(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((driver_id, order_id)): Path<(UserId, OrderId)>,
) -> Result<Json<Order>> {
    let order = DispatchService::new(state.pool())
        .pickup(&user, driver_id, order_id)
        .await?;
    Ok(Json(order))
}

/// Confirm delivery and release the driver.
///
/// # Errors
///
/// 403 if the order is not assigned to the driver, 400 unless it is
/// `PICKED_UP`.
pub async fn deliver(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((driver_id, order_id)): Path<(UserId, OrderId)>,
) -> Result<Json<Order>> {
    let order = DispatchService::new(state.pool())
        .deliver(&user, driver_id, order_id)
        .await?;
    Ok(Json(order))
}
