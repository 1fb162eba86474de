use chrono::NaiveDate;
use serde::Serialize;

use cafe_calories_core::{GoalId, GoalPeriod, UserId};

#[derive(Debug, Clone, Serialize)]
pub struct CalorieGoal {
    pub id: GoalId,
    pub user_id: UserId,
    pub period: GoalPeriod,
    pub target_calories: i32,
    pub start_date: NaiveDate,
}
