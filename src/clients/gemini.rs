//! Gemini REST implementation of [`AiGateway`].

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{self, REPORT_SYSTEM_PROMPT, REVISION_SYSTEM_PROMPT};
use crate::clients::traits::{
    AiGateway, GatewayError, GatewayErrorKind, ReportResult, SourceRef,
};
use crate::config::GeminiConfig;
use crate::error::{AssistantError, Result};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    web: Option<WebChunk>,
}

#[derive(Debug, Deserialize)]
struct WebChunk {
    uri: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl GenerateContentResponse {
    fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        (!text.trim().is_empty()).then_some(text)
    }

    fn sources(&self) -> Vec<SourceRef> {
        self.candidates
            .first()
            .and_then(|c| c.grounding_metadata.as_ref())
            .map(|meta| {
                meta.grounding_chunks
                    .iter()
                    .filter_map(|chunk| chunk.web.as_ref())
                    .filter_map(|web| {
                        let uri = web.uri.clone()?;
                        Some(SourceRef {
                            title: web.title.clone().unwrap_or_else(|| uri.clone()),
                            uri,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Gateway backed by `models/{model}:generateContent`
pub struct GeminiGateway {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    grounding: bool,
    revision_temperature: f32,
}

impl GeminiGateway {
    pub fn new(config: &GeminiConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| AssistantError::Config {
                message: format!("Failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            grounding: config.grounding,
            revision_temperature: config.revision_temperature,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    async fn generate(
        &self,
        request: &GenerateContentRequest<'_>,
    ) -> std::result::Result<GenerateContentResponse, GatewayError> {
        let resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| GatewayError::from_upstream(None, format!("request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            let message = serde_json::from_str::<ErrorEnvelope>(&body_text)
                .map(|env| env.error.message)
                .unwrap_or(body_text);
            return Err(GatewayError::from_upstream(Some(status.as_u16()), message));
        }

        resp.json::<GenerateContentResponse>().await.map_err(|e| {
            GatewayError::new(
                GatewayErrorKind::Unknown,
                format!("malformed response from model: {}", e),
            )
        })
    }
}

#[async_trait]
impl AiGateway for GeminiGateway {
    async fn revise_answer(
        &self,
        question: &str,
        context: &str,
        draft: &str,
    ) -> std::result::Result<String, GatewayError> {
        let prompt = catalog::revision_prompt(question, context, draft);
        debug!(model = %self.model, prompt_chars = prompt.len(), "revise_answer");
        let request = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: REVISION_SYSTEM_PROMPT,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: &prompt }],
            }],
            generation_config: Some(GenerationConfig {
                temperature: self.revision_temperature,
            }),
            tools: Vec::new(),
        };

        let response = self.generate(&request).await?;
        response.text().map(|t| t.trim().to_string()).ok_or_else(|| {
            GatewayError::new(GatewayErrorKind::Unknown, "model returned no revised text")
        })
    }

    async fn generate_final_report(
        &self,
        prompt: &str,
    ) -> std::result::Result<ReportResult, GatewayError> {
        debug!(
            model = %self.model,
            grounding = self.grounding,
            prompt_chars = prompt.len(),
            "generate_final_report"
        );
        let tools = if self.grounding {
            vec![serde_json::json!({ "google_search": {} })]
        } else {
            Vec::new()
        };
        let request = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: REPORT_SYSTEM_PROMPT,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: prompt }],
            }],
            generation_config: None,
            tools,
        };

        let response = self.generate(&request).await?;
        let report = response.text().ok_or_else(|| {
            GatewayError::new(GatewayErrorKind::Unknown, "model returned an empty report")
        })?;
        let sources = if self.grounding {
            response.sources()
        } else {
            Vec::new()
        };
        Ok(ReportResult { report, sources })
    }
}
