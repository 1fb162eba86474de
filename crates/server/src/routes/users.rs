//! Account registration and self-service.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::Deserialize;

use super::StatusResponse;
use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::User;
use crate::services::AuthService;
use crate::services::auth::Registration;
use crate::state::AppState;

/// `/users/register`, kept apart so it can sit behind the rate limiter.
pub fn register_router() -> Router<AppState> {
    Router::new().route("/users/register", post(register))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/me", get(me).delete(deactivate))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    #[serde(default)]
    pub name: String,
    pub password: String,
    pub role: Option<String>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub sex: Option<String>,
    pub dob: Option<NaiveDate>,
}

impl From<RegisterRequest> for Registration {
    fn from(req: RegisterRequest) -> Self {
        Self {
            email: req.email,
            name: req.name,
            password: req.password,
            role: req.role,
            height_cm: req.height_cm,
            weight_kg: req.weight_kg,
            sex: req.sex,
            dob: req.dob,
        }
    }
}

/// Create an account.
///
/// # Errors
///
/// 400 for a taken email, 403 for the admin role, 422 for invalid fields.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>)> {
    let user = AuthService::new(state.pool(), state.tokens())
        .register(&body.into())
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

/// Deactivate the caller's account.
///
/// # Errors
///
/// 500 if the update fails.
pub async fn deactivate(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<StatusResponse>> {
    AuthService::new(state.pool(), state.tokens())
        .deactivate(&user)
        .await?;
    Ok(Json(StatusResponse::new("deactivated")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, header};

    use super::*;
    use crate::routes::test_support::send;

    #[tokio::test]
    async fn me_requires_a_token() {
        let (response, body) = send(Request::get("/users/me").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
        assert_eq!(body["detail"], "Not authenticated");
    }

    #[tokio::test]
    async fn garbage_token_is_rejected_before_the_database() {
        let (response, body) = send(
            Request::get("/users/me")
                .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body["detail"], "Could not validate credentials");
    }

    #[tokio::test]
    async fn admin_self_registration_is_forbidden() {
        let (response, _) = send(
            Request::post("/users/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"email":"root@example.com","name":"Root","password":"longenough","role":"admin"}"#,
                ))
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn short_password_is_unprocessable() {
        let (response, _) = send(
            Request::post("/users/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"email":"a@example.com","name":"A","password":"short"}"#))
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
