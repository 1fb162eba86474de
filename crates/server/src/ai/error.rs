//! Error types for the menu AI client.

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when calling the AI service.
#[derive(Debug, Error)]
pub enum AiError {
    /// Transport failure or timeout.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The reply did not contain what was asked for.
    #[error("could not parse: {0}")]
    Unparseable(String),
}

/// Error body of an OpenAI-compatible API. Providers disagree on nesting.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ApiErrorBody {
    Nested { error: ApiErrorDetail },
    Flat { message: String },
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorDetail {
    pub message: String,
}

impl ApiErrorBody {
    pub(crate) fn into_message(self) -> String {
        match self {
            Self::Nested { error } => error.message,
            Self::Flat { message } => message,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = AiError::Api {
            status: 401,
            message: "Unauthorized".to_string(),
        };
        assert_eq!(err.to_string(), "API error (401): Unauthorized");
        assert_eq!(
            AiError::Unparseable("no items".to_string()).to_string(),
            "could not parse: no items"
        );
    }

    #[test]
    fn both_error_shapes_deserialize() {
        let nested: ApiErrorBody =
            serde_json::from_str(r#"{"error":{"message":"bad model","type":"invalid_request"}}"#).unwrap();
        assert_eq!(nested.into_message(), "bad model");

        let flat: ApiErrorBody = serde_json::from_str(r#"{"object":"error","message":"quota"}"#).unwrap();
        assert_eq!(flat.into_message(), "quota");
    }
}
