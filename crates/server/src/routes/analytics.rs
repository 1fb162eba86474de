//! Cafe reporting.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use cafe_calories_core::CafeId;

use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::services::AnalyticsService;
use crate::services::analytics::CafeAnalytics;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/cafe/{id}", get(cafe))
}

/// # Errors
///
/// 404 for an unknown cafe, 403 without cafe access.
pub async fn cafe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(cafe_id): Path<CafeId>,
) -> Result<Json<CafeAnalytics>> {
    let report = AnalyticsService::new(state.pool())
        .for_cafe(&user, cafe_id)
        .await?;
    Ok(Json(report))
}
