pub mod gemini;
pub mod traits;

use async_trait::async_trait;

pub use gemini::GeminiGateway;
pub use traits::{AiGateway, GatewayError, GatewayErrorKind, ReportResult, SourceRef};

pub const MISSING_KEY_MESSAGE: &str =
    "Server is not configured correctly. The API key is missing.";

/// Stand-in used when no API key is configured: every call fails the same way.
pub struct UnconfiguredGateway;

#[async_trait]
impl AiGateway for UnconfiguredGateway {
    async fn revise_answer(
        &self,
        _question: &str,
        _context: &str,
        _draft: &str,
    ) -> Result<String, GatewayError> {
        Err(GatewayError::new(GatewayErrorKind::Unknown, MISSING_KEY_MESSAGE))
    }

    async fn generate_final_report(&self, _prompt: &str) -> Result<ReportResult, GatewayError> {
        Err(GatewayError::new(GatewayErrorKind::Unknown, MISSING_KEY_MESSAGE))
    }
}
