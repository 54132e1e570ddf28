use async_trait::async_trait;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A citation returned alongside a generated report. Order is display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub uri: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportResult {
    /// Markdown body of the report
    pub report: String,
    #[serde(default)]
    pub sources: Vec<SourceRef>,
}

/// Coarse classification of an upstream failure, decided once where the raw
/// error is received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorKind {
    Unauthorized,
    Forbidden,
    RateLimited,
    BadRequest,
    Unknown,
}

impl GatewayErrorKind {
    /// Classify from an optional HTTP status and the upstream message text.
    /// Message phrases win over the status code: Gemini reports an invalid
    /// key as a 400.
    pub fn classify(status: Option<u16>, message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("api key not valid")
            || (lower.contains("api key") && lower.contains("invalid"))
        {
            return GatewayErrorKind::Unauthorized;
        }
        if lower.contains("permission denied")
            || lower.contains("requested entity was not found")
        {
            return GatewayErrorKind::Forbidden;
        }
        if lower.contains("quota")
            || lower.contains("resource exhausted")
            || lower.contains("resource_exhausted")
        {
            return GatewayErrorKind::RateLimited;
        }
        match status {
            Some(401) => GatewayErrorKind::Unauthorized,
            Some(403) => GatewayErrorKind::Forbidden,
            Some(429) => GatewayErrorKind::RateLimited,
            Some(400) => GatewayErrorKind::BadRequest,
            _ => GatewayErrorKind::Unknown,
        }
    }

    pub fn status_code(self) -> StatusCode {
        match self {
            GatewayErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            GatewayErrorKind::Forbidden => StatusCode::FORBIDDEN,
            GatewayErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            GatewayErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            GatewayErrorKind::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Operator-facing explanation shown instead of the raw upstream text
    pub fn friendly_message(self) -> &'static str {
        match self {
            GatewayErrorKind::Unauthorized => {
                "The server's API key is invalid. Please double-check GEMINI_SECRET_KEY and restart the server."
            }
            GatewayErrorKind::Forbidden => {
                "An API permission error occurred. The API may not be enabled for this key, or the project is not linked to a billing account."
            }
            GatewayErrorKind::RateLimited => {
                "The AI service quota has been exhausted. Please wait a moment and try again."
            }
            GatewayErrorKind::BadRequest => "The AI service rejected the request.",
            GatewayErrorKind::Unknown => {
                "An unexpected error occurred while communicating with the AI. Please check the server logs for more details."
            }
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub message: String,
}

impl GatewayError {
    pub fn new(kind: GatewayErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Build from a raw upstream failure, classifying it on the way in
    pub fn from_upstream(status: Option<u16>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: GatewayErrorKind::classify(status, &message),
            message,
        }
    }
}

/// The two operations the wizard needs from a generative-AI service.
#[async_trait]
pub trait AiGateway: Send + Sync {
    /// Rewrite `draft` for `question`, using `context` built from earlier answers.
    /// Returns only the revised text.
    async fn revise_answer(
        &self,
        question: &str,
        context: &str,
        draft: &str,
    ) -> Result<String, GatewayError>;

    async fn generate_final_report(&self, prompt: &str) -> Result<ReportResult, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_prefers_message_phrases() {
        assert_eq!(
            GatewayErrorKind::classify(Some(400), "API key not valid. Please pass a valid API key."),
            GatewayErrorKind::Unauthorized
        );
        assert_eq!(
            GatewayErrorKind::classify(Some(500), "Permission denied on resource project"),
            GatewayErrorKind::Forbidden
        );
        assert_eq!(
            GatewayErrorKind::classify(None, "Requested entity was not found."),
            GatewayErrorKind::Forbidden
        );
        assert_eq!(
            GatewayErrorKind::classify(Some(500), "You exceeded your current quota"),
            GatewayErrorKind::RateLimited
        );
    }

    #[test]
    fn classify_falls_back_to_status() {
        assert_eq!(GatewayErrorKind::classify(Some(429), "slow down"), GatewayErrorKind::RateLimited);
        assert_eq!(GatewayErrorKind::classify(Some(403), "nope"), GatewayErrorKind::Forbidden);
        assert_eq!(GatewayErrorKind::classify(Some(400), "bad"), GatewayErrorKind::BadRequest);
        assert_eq!(GatewayErrorKind::classify(Some(503), "overloaded"), GatewayErrorKind::Unknown);
        assert_eq!(GatewayErrorKind::classify(None, "connection reset"), GatewayErrorKind::Unknown);
    }

    #[test]
    fn report_result_accepts_missing_sources() {
        let parsed: ReportResult = serde_json::from_str(r##"{"report":"# Title"}"##).unwrap();
        assert!(parsed.sources.is_empty());
    }
}
