//! Calorie goals, daily intake and intake recommendations.

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use sqlx::PgPool;

use cafe_calories_core::GoalPeriod;
use cafe_calories_core::nutrition::{ActivityLevel, Sex, recommend_daily_calories};

use super::ServiceError;
use crate::db::GoalRepository;
use crate::models::{CalorieGoal, User};

/// Calories eaten today by one user.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Intake {
    pub date: NaiveDate,
    pub calories: i64,
}

/// Inputs to the daily calorie recommendation.
#[derive(Debug, Clone)]
pub struct RecommendationInput {
    pub height_cm: f64,
    pub weight_kg: f64,
    pub sex: String,
    pub age: u32,
    pub activity: Option<String>,
}

/// Goal operations.
pub struct GoalService<'a> {
    goals: GoalRepository<'a>,
}

impl<'a> GoalService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            goals: GoalRepository::new(pool),
        }
    }

    /// Record a new goal starting `start_date` (today when `None`).
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` unless the target is positive.
    pub async fn set(
        &self,
        user: &User,
        period: GoalPeriod,
        target_calories: i32,
        start_date: Option<NaiveDate>,
    ) -> Result<CalorieGoal, ServiceError> {
        if target_calories <= 0 {
            return Err(ServiceError::Validation(
                "target_calories must be positive".to_string(),
            ));
        }
        let start_date = start_date.unwrap_or_else(|| Local::now().date_naive());
        let goal = self
            .goals
            .create(user.id, period, target_calories, start_date)
            .await?;

        tracing::info!(user_id = %user.id, goal_id = %goal.id, "Calorie goal set");
        Ok(goal)
    }

    /// All of the caller's goals, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn current(&self, user: &User) -> Result<Vec<CalorieGoal>, ServiceError> {
        Ok(self.goals.list_for_user(user.id).await?)
    }

    /// Calories assigned to the caller in their own orders since local midnight.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn intake_today(&self, user: &User) -> Result<Intake, ServiceError> {
        let now = Local::now();
        let date = now.date_naive();
        let calories = self
            .goals
            .intake_since(user.id, local_midnight(&Local, date, now.with_timezone(&Utc)))
            .await?;
        Ok(Intake { date, calories })
    }
}

/// Start of `date` in `tz`, as UTC.
///
/// Falls back to `now` in the rare zone where midnight does not exist.
fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate, now: DateTime<Utc>) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .and_then(|midnight| tz.from_local_datetime(&midnight).earliest())
        .map_or(now, |midnight| midnight.with_timezone(&Utc))
}

/// Mifflin-St Jeor recommendation in kcal/day.
///
/// # Errors
///
/// Returns `ServiceError::Validation` for non-positive height or weight.
pub fn recommend(input: &RecommendationInput) -> Result<i32, ServiceError> {
    let valid = |v: f64| v.is_finite() && v > 0.0;
    if !valid(input.height_cm) || !valid(input.weight_kg) {
        return Err(ServiceError::Validation(
            "height_cm and weight_kg must be positive".to_string(),
        ));
    }

    let activity = input
        .activity
        .as_deref()
        .map_or(ActivityLevel::default(), ActivityLevel::from_label);

    Ok(recommend_daily_calories(
        input.height_cm,
        input.weight_kg,
        Sex::from_label(&input.sex),
        input.age,
        activity,
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{FixedOffset, NaiveDate};

    use super::*;

    fn input(sex: &str, activity: Option<&str>) -> RecommendationInput {
        RecommendationInput {
            height_cm: 175.0,
            weight_kg: 70.0,
            sex: sex.to_string(),
            age: 30,
            activity: activity.map(str::to_string),
        }
    }

    #[test]
    fn recommendation_defaults_to_moderate() {
        assert_eq!(recommend(&input("M", None)).unwrap(), 2556);
        assert_eq!(recommend(&input("male", Some("moderate"))).unwrap(), 2556);
    }

    #[test]
    fn recommendation_rejects_nonsense_measurements() {
        let mut bad = input("F", None);
        bad.weight_kg = 0.0;
        assert!(matches!(recommend(&bad), Err(ServiceError::Validation(_))));
    }

    #[test]
    fn midnight_is_converted_to_utc() {
        let tz = FixedOffset::east_opt(-5 * 3600).unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let midnight = local_midnight(&tz, date, Utc::now());
        assert_eq!(midnight.to_rfc3339(), "2025-03-14T05:00:00+00:00");
    }
}
