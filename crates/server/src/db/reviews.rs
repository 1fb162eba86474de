//! Reviews and cached review summaries.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use cafe_calories_core::{CafeId, ReviewId, UserId};

use super::RepositoryError;
use crate::models::{Review, ReviewSummary};

#[derive(Debug, sqlx::FromRow)]
struct ReviewRow {
    id: ReviewId,
    cafe_id: CafeId,
    user_id: Option<UserId>,
    rating: Option<i16>,
    text: String,
    created_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: row.id,
            cafe_id: row.cafe_id,
            user_id: row.user_id,
            rating: row.rating,
            text: row.text,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SummaryRow {
    cafe_id: CafeId,
    summary_text: String,
    review_count: i32,
    updated_at: DateTime<Utc>,
}

impl From<SummaryRow> for ReviewSummary {
    fn from(row: SummaryRow) -> Self {
        Self {
            cafe_id: row.cafe_id,
            summary_text: row.summary_text,
            review_count: row.review_count,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for reviews.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        cafe_id: CafeId,
        user_id: UserId,
        rating: Option<i16>,
        text: &str,
    ) -> Result<Review, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewRow>(
            r"
            INSERT INTO reviews (cafe_id, user_id, rating, text)
            VALUES ($1, $2, $3, $4)
            RETURNING id, cafe_id, user_id, rating, text, created_at
            ",
        )
        .bind(cafe_id)
        .bind(user_id)
        .bind(rating)
        .bind(text)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Reviews of a cafe, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, cafe_id: CafeId) -> Result<Vec<Review>, RepositoryError> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            r"
            SELECT id, cafe_id, user_id, rating, text, created_at
            FROM reviews
            WHERE cafe_id = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(cafe_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn summary(&self, cafe_id: CafeId) -> Result<Option<ReviewSummary>, RepositoryError> {
        let row = sqlx::query_as::<_, SummaryRow>(
            "SELECT cafe_id, summary_text, review_count, updated_at FROM review_summaries WHERE cafe_id = $1",
        )
        .bind(cafe_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Insert or replace the cached summary.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn upsert_summary(
        &self,
        cafe_id: CafeId,
        summary_text: &str,
        review_count: i32,
    ) -> Result<ReviewSummary, RepositoryError> {
        let row = sqlx::query_as::<_, SummaryRow>(
            r"
            INSERT INTO review_summaries (cafe_id, summary_text, review_count, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (cafe_id) DO UPDATE
                SET summary_text = EXCLUDED.summary_text,
                    review_count = EXCLUDED.review_count,
                    updated_at = EXCLUDED.updated_at
            RETURNING cafe_id, summary_text, review_count, updated_at
            ",
        )
        .bind(cafe_id)
        .bind(summary_text)
        .bind(review_count)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }
}
