//! Cafe reviews and their AI-generated summary.
//!
//! A summary is cached per cafe together with the number of reviews it was
//! built from. It is regenerated when that number changes or on request.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::instrument;

use cafe_calories_core::CafeId;

use super::ServiceError;
use crate::ai::AiClient;
use crate::db::{CafeRepository, ReviewRepository};
use crate::models::{Review, ReviewSummary, User};

const NO_REVIEWS: &str = "No reviews found for this cafe.";

/// Summary as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryView {
    pub cafe_id: CafeId,
    pub summary: String,
    /// Whether the summary came from the cache.
    pub cached: bool,
    pub review_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl SummaryView {
    fn from_cache(summary: ReviewSummary, cached: bool) -> Self {
        Self {
            cafe_id: summary.cafe_id,
            summary: summary.summary_text,
            cached,
            review_count: i64::from(summary.review_count),
            updated_at: Some(summary.updated_at),
        }
    }
}

pub struct ReviewService<'a> {
    pool: &'a PgPool,
    reviews: ReviewRepository<'a>,
    ai: Option<&'a AiClient>,
}

impl<'a> ReviewService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, ai: Option<&'a AiClient>) -> Self {
        Self {
            pool,
            reviews: ReviewRepository::new(pool),
            ai,
        }
    }

    /// Reviews of a cafe, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn list(&self, cafe_id: CafeId) -> Result<Vec<Review>, ServiceError> {
        Ok(self.reviews.list(cafe_id).await?)
    }

    /// Post a review as the caller.
    ///
    /// # Errors
    ///
    /// - `ServiceError::Validation` for blank text or a rating outside 1-5.
    /// - `ServiceError::NotFound` for an unknown cafe.
    #[instrument(skip(self, user, text), fields(user_id = %user.id))]
    pub async fn create(
        &self,
        user: &User,
        cafe_id: CafeId,
        rating: Option<i16>,
        text: &str,
    ) -> Result<Review, ServiceError> {
        validate_review(rating, text)?;

        CafeRepository::new(self.pool)
            .get(cafe_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Cafe"))?;

        let review = self.reviews.create(cafe_id, user.id, rating, text.trim()).await?;
        tracing::info!(review_id = %review.id, "Review posted");
        Ok(review)
    }

    /// Cached or freshly generated summary of a cafe's reviews.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Unavailable` if a new summary is needed and the
    /// AI service is not configured, and `ServiceError::Ai` if it fails.
    #[instrument(skip(self))]
    pub async fn summary(&self, cafe_id: CafeId, force: bool) -> Result<SummaryView, ServiceError> {
        let reviews = self.reviews.list(cafe_id).await?;
        if reviews.is_empty() {
            return Ok(SummaryView {
                cafe_id,
                summary: NO_REVIEWS.to_string(),
                cached: false,
                review_count: 0,
                updated_at: None,
            });
        }

        let count = i32::try_from(reviews.len())
            .map_err(|_| ServiceError::Validation("too many reviews to summarize".to_string()))?;

        if !force
            && let Some(cached) = self.reviews.summary(cafe_id).await?
            && cached.review_count == count
        {
            return Ok(SummaryView::from_cache(cached, true));
        }

        let ai = self
            .ai
            .ok_or_else(|| ServiceError::Unavailable("Review summaries are not configured".to_string()))?;

        let texts: Vec<String> = reviews.into_iter().map(|review| review.text).collect();
        let summary_text = ai.summarize_reviews(&texts).await?;

        let stored = self.reviews.upsert_summary(cafe_id, &summary_text, count).await?;
        tracing::info!(review_count = count, "Review summary regenerated");
        Ok(SummaryView::from_cache(stored, false))
    }
}

fn validate_review(rating: Option<i16>, text: &str) -> Result<(), ServiceError> {
    if rating.is_some_and(|r| !(1..=5).contains(&r)) {
        return Err(ServiceError::Validation("rating must be between 1 and 5".to_string()));
    }
    if text.trim().is_empty() {
        return Err(ServiceError::Validation("Review text cannot be empty".to_string()));
    }
    Ok(())
}
