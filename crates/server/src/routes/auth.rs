//! Token issuance.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::Deserialize;

use cafe_calories_core::Role;

use crate::error::{AppError, Result};
use crate::services::AuthService;
use crate::services::auth::TokenPair;
use crate::state::AppState;

/// `/auth/login`, kept apart so it can sit behind the rate limiter.
pub fn login_router() -> Router<AppState> {
    Router::new().route("/auth/login", post(login))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/refresh_token", get(refresh_token))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// When present the account must hold exactly this role.
    pub role: Option<String>,
}

/// Exchange credentials for an access/refresh token pair.
///
/// # Errors
///
/// 401 for bad credentials, an inactive account or a role mismatch; 422 for
/// an unknown role name.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<TokenPair>> {
    let expected_role = body
        .role
        .as_deref()
        .map(str::parse::<Role>)
        .transpose()
        .map_err(crate::services::AuthError::from)?;

    let (user, tokens) = AuthService::new(state.pool(), state.tokens())
        .login(&body.email, &body.password, expected_role)
        .await?;

    tracing::info!(user_id = %user.id, role = %user.role, "Login succeeded");
    Ok(Json(tokens))
}

/// Refresh is not offered; clients log in again.
///
/// # Errors
///
/// Always 501.
pub async fn refresh_token() -> Result<Json<TokenPair>> {
    Err(AppError::NotImplemented(
        "Token refresh is not implemented".to_string(),
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};

    use crate::routes::test_support::send;

    #[tokio::test]
    async fn refresh_is_not_implemented() {
        let (response, body) =
            send(Request::get("/auth/refresh_token").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(body["detail"], "Token refresh is not implemented");
    }

    #[tokio::test]
    async fn unknown_role_is_unprocessable() {
        let (response, _) = send(
            Request::post("/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"email":"d@example.com","password":"whatever1","role":"pilot"}"#,
                ))
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
