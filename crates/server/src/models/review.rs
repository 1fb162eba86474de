//! Cafe reviews and their cached summary.

use chrono::{DateTime, Utc};
use serde::Serialize;

use cafe_calories_core::{CafeId, ReviewId, UserId};

#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub id: ReviewId,
    pub cafe_id: CafeId,
    pub user_id: Option<UserId>,
    pub rating: Option<i16>,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Derived summary of a cafe's reviews.
///
/// Valid only while `review_count` matches the number of reviews.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewSummary {
    pub cafe_id: CafeId,
    pub summary_text: String,
    pub review_count: i32,
    pub updated_at: DateTime<Utc>,
}
