//! Cafes, their staff, menu ingestion and reviews.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};

use cafe_calories_core::{CafeId, UserId};

use crate::ai::MenuItem;
use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::models::{Cafe, Review, StaffMember};
use crate::services::catalog::CafeInput;
use crate::services::menu::MAX_DOCUMENT_BYTES;
use crate::services::reviews::SummaryView;
use crate::services::{CatalogService, MenuService, ReviewService};
use crate::state::AppState;

/// Multipart framing allowance on top of the document itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}/staff", get(list_staff).post(add_staff))
        .route("/{id}/staff/{user_id}", delete(remove_staff))
        .route(
            "/{id}/menu/upload",
            post(upload_menu).layer(DefaultBodyLimit::max(MAX_DOCUMENT_BYTES + MULTIPART_OVERHEAD)),
        )
        .route("/{id}/menu/parse-text", post(parse_menu_text))
        .route("/{id}/reviews", get(list_reviews).post(create_review))
        .route("/{id}/reviews/summary", get(review_summary))
}

#[derive(Debug, Deserialize)]
pub struct CreateCafeRequest {
    pub name: String,
    #[serde(default)]
    pub address: String,
    pub lat: f64,
    pub lng: f64,
}

impl From<CreateCafeRequest> for CafeInput {
    fn from(req: CreateCafeRequest) -> Self {
        Self {
            name: req.name,
            address: req.address,
            lat: req.lat,
            lng: req.lng,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddStaffRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct MenuTextRequest {
    pub text: String,
}

/// Parsed menu candidates. Nothing is stored until they are imported.
#[derive(Debug, Serialize)]
pub struct MenuParseResponse {
    pub items: Vec<MenuItem>,
}

#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub rating: Option<i16>,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    #[serde(default)]
    pub force: bool,
}

/// Create a cafe owned by the caller (owners) or unowned (admins).
///
/// # Errors
///
/// 403 for other roles, 422 for a blank name or out-of-range coordinates.
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<CreateCafeRequest>,
) -> Result<(StatusCode, Json<Cafe>)> {
    let cafe = CatalogService::new(state.pool())
        .create_cafe(&user, body.into())
        .await?;
    Ok((StatusCode::CREATED, Json(cafe)))
}

/// Active cafes, optionally filtered by name.
///
/// # Errors
///
/// 500 on database failure.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Cafe>>> {
    let cafes = CatalogService::new(state.pool())
        .list_cafes(query.q.as_deref())
        .await?;
    Ok(Json(cafes))
}

/// # Errors
///
/// 403 unless the caller owns the cafe or is an admin.
pub async fn list_staff(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(cafe_id): Path<CafeId>,
) -> Result<Json<Vec<StaffMember>>> {
    let staff = CatalogService::new(state.pool())
        .list_staff(&user, cafe_id)
        .await?;
    Ok(Json(staff))
}

/// # Errors
///
/// 403 unless the caller owns the cafe or is an admin; 404 for an unknown
/// or inactive user; 400 if already assigned.
pub async fn add_staff(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(cafe_id): Path<CafeId>,
    Json(body): Json<AddStaffRequest>,
) -> Result<(StatusCode, Json<StaffMember>)> {
    let member = CatalogService::new(state.pool())
        .add_staff(&user, cafe_id, &body.email)
        .await?;
    Ok((StatusCode::CREATED, Json(member)))
}

/// # Errors
///
/// 403 unless the caller owns the cafe or is an admin; 404 if no such
/// assignment exists.
pub async fn remove_staff(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((cafe_id, staff_id)): Path<(CafeId, UserId)>,
) -> Result<StatusCode> {
    CatalogService::new(state.pool())
        .remove_staff(&user, cafe_id, staff_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Parse an uploaded PDF menu from the multipart field `file`.
///
/// # Errors
///
/// 400 for a missing field or malformed multipart body, 422 for an empty,
/// oversized or unparseable document, 503 when parsing is unavailable.
pub async fn upload_menu(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(cafe_id): Path<CafeId>,
    mut multipart: Multipart,
) -> Result<Json<MenuParseResponse>> {
    let mut document = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        if field
            .file_name()
            .is_some_and(|name| !name.to_ascii_lowercase().ends_with(".pdf"))
        {
            return Err(AppError::BadRequest("Only PDF files are supported".to_string()));
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        document = Some(bytes);
        break;
    }

    let document =
        document.ok_or_else(|| AppError::BadRequest("Missing multipart field 'file'".to_string()))?;

    let items = MenuService::new(state.pool(), state.ai())
        .parse_document(&user, cafe_id, &document)
        .await?;
    tracing::info!(cafe_id = %cafe_id, items = items.len(), "Menu document parsed");
    Ok(Json(MenuParseResponse { items }))
}

/// Parse menu text.
///
/// # Errors
///
/// Same as [`upload_menu`], with blank text rejected as 422.
pub async fn parse_menu_text(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(cafe_id): Path<CafeId>,
    Json(body): Json<MenuTextRequest>,
) -> Result<Json<MenuParseResponse>> {
    let items = MenuService::new(state.pool(), state.ai())
        .parse_text(&user, cafe_id, &body.text)
        .await?;
    Ok(Json(MenuParseResponse { items }))
}

/// # Errors
///
/// 500 on database failure.
pub async fn list_reviews(
    State(state): State<AppState>,
    Path(cafe_id): Path<CafeId>,
) -> Result<Json<Vec<Review>>> {
    let reviews = ReviewService::new(state.pool(), state.ai())
        .list(cafe_id)
        .await?;
    Ok(Json(reviews))
}

/// # Errors
///
/// 404 for an unknown cafe, 422 for a bad rating or blank text.
pub async fn create_review(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(cafe_id): Path<CafeId>,
    Json(body): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Review>)> {
    let review = ReviewService::new(state.pool(), state.ai())
        .create(&user, cafe_id, body.rating, &body.text)
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// # Errors
///
/// 503 when a fresh summary is needed and the AI service is unavailable.
pub async fn review_summary(
    State(state): State<AppState>,
    Path(cafe_id): Path<CafeId>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<SummaryView>> {
    let summary = ReviewService::new(state.pool(), state.ai())
        .summary(cafe_id, query.force)
        .await?;
    Ok(Json(summary))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, header};

    use super::*;
    use crate::routes::test_support::send;

    #[tokio::test]
    async fn creating_a_cafe_requires_auth() {
        let (response, _) = send(
            Request::post("/cafes")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"name":"Brew","lat":35.78,"lng":-78.64}"#))
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn menu_upload_requires_auth() {
        let (response, _) = send(
            Request::post("/cafes/1/menu/upload")
                .header(header::CONTENT_TYPE, "multipart/form-data; boundary=X")
                .body(Body::from("--X--\r\n"))
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
