//! Calorie goals, daily intake and recommendations.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use cafe_calories_core::GoalPeriod;

use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::CalorieGoal;
use crate::services::GoalService;
use crate::services::goals::{Intake, RecommendationInput, recommend as recommend_calories};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/set", post(set))
        .route("/current", get(current))
        .route("/intake/today", get(intake_today))
        .route("/recommend", post(recommend))
}

#[derive(Debug, Deserialize)]
pub struct SetGoalRequest {
    pub period: GoalPeriod,
    pub target_calories: i32,
    /// Today when absent.
    pub start_date: Option<NaiveDate>,
}

fn default_sex() -> String {
    "M".to_string()
}

const fn default_age() -> u32 {
    25
}

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    pub height_cm: f64,
    pub weight_kg: f64,
    #[serde(default = "default_sex")]
    pub sex: String,
    #[serde(default = "default_age")]
    pub age_years: u32,
    pub activity: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub daily_calorie_goal: i32,
}

/// # Errors
///
/// 422 for a non-positive target.
pub async fn set(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<SetGoalRequest>,
) -> Result<(StatusCode, Json<CalorieGoal>)> {
    let goal = GoalService::new(state.pool())
        .set(&user, body.period, body.target_calories, body.start_date)
        .await?;
    Ok((StatusCode::CREATED, Json(goal)))
}

/// # Errors
///
/// 500 on database failure.
pub async fn current(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<CalorieGoal>>> {
    Ok(Json(GoalService::new(state.pool()).current(&user).await?))
}

/// Calories ordered for the caller since local midnight.
///
/// # Errors
///
/// 500 on database failure.
pub async fn intake_today(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Intake>> {
    Ok(Json(GoalService::new(state.pool()).intake_today(&user).await?))
}

/// Mifflin-St Jeor estimate. Public.
///
/// # Errors
///
/// 422 for non-positive height or weight.
pub async fn recommend(Json(body): Json<RecommendRequest>) -> Result<Json<RecommendResponse>> {
    let daily_calorie_goal = recommend_calories(&RecommendationInput {
        height_cm: body.height_cm,
        weight_kg: body.weight_kg,
        sex: body.sex,
        age: body.age_years,
        activity: body.activity,
    })?;
    Ok(Json(RecommendResponse { daily_calorie_goal }))
}
