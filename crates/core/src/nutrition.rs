//! Daily calorie recommendations (Mifflin-St Jeor).

use serde::{Deserialize, Serialize};

/// Biological sex as used by the BMR formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    /// Anything starting with `m`/`M` is male, everything else female.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        if label.trim_start().starts_with(['m', 'M']) {
            Self::Male
        } else {
            Self::Female
        }
    }
}

/// Activity multiplier applied to the basal metabolic rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    #[default]
    Moderate,
    Active,
    VeryActive,
}

impl ActivityLevel {
    /// Unknown labels fall back to [`ActivityLevel::Moderate`].
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "sedentary" => Self::Sedentary,
            "light" => Self::Light,
            "active" => Self::Active,
            "very_active" => Self::VeryActive,
            _ => Self::Moderate,
        }
    }

    #[must_use]
    pub const fn factor(self) -> f64 {
        match self {
            Self::Sedentary => 1.2,
            Self::Light => 1.375,
            Self::Moderate => 1.55,
            Self::Active => 1.725,
            Self::VeryActive => 1.9,
        }
    }
}

/// Basal metabolic rate in kcal/day.
#[must_use]
pub fn basal_metabolic_rate(height_cm: f64, weight_kg: f64, sex: Sex, age_years: u32) -> f64 {
    let offset = match sex {
        Sex::Male => 5.0,
        Sex::Female => -161.0,
    };
    10.0f64.mul_add(weight_kg, 6.25 * height_cm) - 5.0 * f64::from(age_years) + offset
}

/// Recommended daily intake, rounded to the nearest kcal.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn recommend_daily_calories(
    height_cm: f64,
    weight_kg: f64,
    sex: Sex,
    age_years: u32,
    activity: ActivityLevel,
) -> i32 {
    let tdee = basal_metabolic_rate(height_cm, weight_kg, sex, age_years) * activity.factor();
    tdee.round().clamp(0.0, f64::from(i32::MAX)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typical_man_lands_in_range() {
        let kcal = recommend_daily_calories(175.0, 70.0, Sex::Male, 30, ActivityLevel::Moderate);
        assert!((2200..=2800).contains(&kcal), "{kcal}");
        assert_eq!(kcal, 2556);
    }

    #[test]
    fn typical_woman_lands_in_range() {
        let kcal = recommend_daily_calories(160.0, 60.0, Sex::Female, 28, ActivityLevel::Sedentary);
        assert!((1400..=2000).contains(&kcal), "{kcal}");
        assert_eq!(kcal, 1559);
    }

    #[test]
    fn sex_label_parsing() {
        assert_eq!(Sex::from_label("M"), Sex::Male);
        assert_eq!(Sex::from_label("male"), Sex::Male);
        assert_eq!(Sex::from_label("F"), Sex::Female);
        assert_eq!(Sex::from_label(""), Sex::Female);
    }

    #[test]
    fn unknown_activity_defaults_to_moderate() {
        assert_eq!(ActivityLevel::from_label("couch"), ActivityLevel::Moderate);
        assert_eq!(ActivityLevel::from_label("VERY_ACTIVE"), ActivityLevel::VeryActive);
    }

    #[test]
    fn more_activity_means_more_calories() {
        let levels = [
            ActivityLevel::Sedentary,
            ActivityLevel::Light,
            ActivityLevel::Moderate,
            ActivityLevel::Active,
            ActivityLevel::VeryActive,
        ];
        let kcal: Vec<i32> = levels
            .iter()
            .map(|level| recommend_daily_calories(180.0, 80.0, Sex::Male, 40, *level))
            .collect();
        assert!(kcal.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
