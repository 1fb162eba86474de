//! Unified error handling with Sentry integration.
//!
//! Every route handler returns `Result<T, AppError>`. Responses carry a JSON
//! body `{"detail": "..."}`; server-side failures are captured to Sentry and
//! answered with a generic message.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::ai::AiError;
use crate::db::RepositoryError;
use crate::services::{AuthError, ServiceError};

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Missing or malformed credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// Malformed request that never reached a service.
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotImplemented(String),

    #[error("Too many requests")]
    RateLimited,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        Self::Service(err.into())
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Service(err) => service_status(err),
            Self::Auth(err) => auth_status(err),
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the client.
    fn detail(&self) -> String {
        match self {
            Self::Service(ServiceError::Ai(AiError::Unparseable(reason))) => {
                format!("could not parse: {reason}")
            }
            Self::Service(ServiceError::Ai(_)) => "AI service unavailable".to_string(),
            Self::Service(ServiceError::Repository(RepositoryError::NotFound)) => "Not found".to_string(),
            Self::Service(ServiceError::Repository(_))
            | Self::Auth(AuthError::Repository(_) | AuthError::TokenEncoding(_) | AuthError::PasswordHash)
            | Self::Internal(_) => "Internal server error".to_string(),
            Self::Auth(AuthError::InvalidCredentials) => "Invalid credentials".to_string(),
            Self::Auth(AuthError::InvalidToken) => "Could not validate credentials".to_string(),
            Self::Auth(AuthError::UserAlreadyExists) => "Email already registered".to_string(),
            other => other.to_string(),
        }
    }
}

const fn service_status(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
        ServiceError::NotFound(_) | ServiceError::Repository(RepositoryError::NotFound) => {
            StatusCode::NOT_FOUND
        }
        ServiceError::Validation(_) | ServiceError::Ai(AiError::Unparseable(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ServiceError::InvalidState(_)
        | ServiceError::InvalidTransition { .. }
        | ServiceError::InvalidAssignee
        | ServiceError::NoDriversAvailable
        | ServiceError::Rule(_) => StatusCode::BAD_REQUEST,
        ServiceError::Unavailable(_) | ServiceError::Ai(_) => StatusCode::SERVICE_UNAVAILABLE,
        ServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

const fn auth_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::InvalidCredentials | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
        AuthError::AdminRegistration => StatusCode::FORBIDDEN,
        AuthError::UserAlreadyExists => StatusCode::BAD_REQUEST,
        AuthError::InvalidEmail(_)
        | AuthError::InvalidRole(_)
        | AuthError::WeakPassword(_)
        | AuthError::InvalidProfile(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AuthError::TokenEncoding(_) | AuthError::Repository(_) | AuthError::PasswordHash => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                status = status.as_u16(),
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let mut response = (status, Json(json!({ "detail": self.detail() }))).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                axum::http::header::WWW_AUTHENTICATE,
                axum::http::HeaderValue::from_static("Bearer"),
            );
        }
        response
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Associate subsequent Sentry events with the authenticated user.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;

    use cafe_calories_core::OrderStatus;
    use cafe_calories_core::order::OrderRuleError;

    use super::*;

    async fn body_of(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn order_rule_errors_are_bad_requests() {
        let (status, body) = body_of(ServiceError::Rule(OrderRuleError::EmptyCart).into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Cart is empty");
    }

    #[tokio::test]
    async fn invalid_transition_names_both_states() {
        let err = ServiceError::InvalidTransition {
            from: OrderStatus::Pending,
            to: OrderStatus::PickedUp,
        };
        let (status, body) = body_of(err.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Invalid status transition: PENDING -> PICKED_UP");
    }

    #[tokio::test]
    async fn exhausted_driver_pool_is_a_bad_request() {
        let (status, body) = body_of(ServiceError::NoDriversAvailable.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "No available drivers nearby");
    }

    #[tokio::test]
    async fn database_errors_do_not_leak() {
        let err = AppError::from(RepositoryError::DataCorruption("bad row 42".to_string()));
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Internal server error");
    }

    #[tokio::test]
    async fn unauthorized_sets_challenge_header() {
        let response = AppError::Auth(AuthError::InvalidToken).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[axum::http::header::WWW_AUTHENTICATE], "Bearer");
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            AppError::from(ServiceError::Forbidden("no".into())).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::from(ServiceError::Validation("bad".into())).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::from(ServiceError::Ai(AiError::Unparseable("x".into()))).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::from(ServiceError::Ai(AiError::Api {
                status: 500,
                message: "boom".into()
            }))
            .status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::from(RepositoryError::Conflict("Order is already paid".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::Auth(AuthError::AdminRegistration).status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::NotImplemented("later".into()).status(),
            StatusCode::NOT_IMPLEMENTED
        );
    }
}
