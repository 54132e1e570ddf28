//! Domain-specific error types for decision-assistant

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::clients::{GatewayError, GatewayErrorKind};

/// Main error type for the decision assistant
#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("{message}")]
    Validation { message: String },

    #[error("Invalid transition: cannot {operation} while in {view}")]
    InvalidTransition {
        operation: &'static str,
        view: &'static str,
    },

    #[error("A revision is already in progress for step {step}")]
    RevisionInFlight { step: usize },

    #[error("AI gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Rendering error: {message}")]
    Render { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AssistantError {
    pub fn validation(message: impl Into<String>) -> Self {
        AssistantError::Validation {
            message: message.into(),
        }
    }

    /// HTTP status used when this error crosses the server boundary
    pub fn status_code(&self) -> StatusCode {
        match self {
            AssistantError::Config { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AssistantError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AssistantError::InvalidTransition { .. } => StatusCode::CONFLICT,
            AssistantError::RevisionInFlight { .. } => StatusCode::CONFLICT,
            AssistantError::Gateway(err) => err.kind.status_code(),
            AssistantError::Render { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AssistantError::NotFound { .. } => StatusCode::NOT_FOUND,
            AssistantError::Serialization { .. } => StatusCode::BAD_REQUEST,
            AssistantError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for AssistantError {
    fn from(err: anyhow::Error) -> Self {
        AssistantError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for AssistantError {
    fn from(err: serde_json::Error) -> Self {
        AssistantError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for AssistantError {
    fn from(err: reqwest::Error) -> Self {
        AssistantError::Gateway(GatewayError::new(
            GatewayErrorKind::Unknown,
            format!("HTTP request failed: {}", err),
        ))
    }
}

/// Convert AssistantError to a JSON HTTP response
impl IntoResponse for AssistantError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        }
        let body = json!({
            "error": {
                "code": status.as_u16(),
                "message": self.to_string(),
            }
        });
        (status, axum::Json(body)).into_response()
    }
}

/// Result type alias for decision-assistant operations
pub type Result<T> = std::result::Result<T, AssistantError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_is_shown_verbatim() {
        let err = AssistantError::validation("Please write an answer before trying to revise it.");
        assert_eq!(
            err.to_string(),
            "Please write an answer before trying to revise it."
        );
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn gateway_errors_take_status_from_kind() {
        let err: AssistantError =
            GatewayError::new(GatewayErrorKind::RateLimited, "quota exceeded").into();
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
    }
}
