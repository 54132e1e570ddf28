//! HTTP transport for the decision assistant
//!
//! Axum server exposing the AI proxy endpoint, the wizard session API and the
//! report views. Health and catalog are plain JSON.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{Path, State},
    http::{Request, StatusCode, header},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::catalog::{GREETING, QUESTIONS};
use crate::clients::{AiGateway, GatewayError, MISSING_KEY_MESSAGE};
use crate::config::Config;
use crate::error::{AssistantError, Result};
use crate::render::MarkdownRenderer;
use crate::report::{MARKDOWN_CONTENT_TYPE, MARKDOWN_FILENAME, ReportPage, export_markdown};
use crate::session::SessionStore;
use crate::wizard::WizardSnapshot;

/// Shared state for HTTP server
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
    pub renderer: Arc<MarkdownRenderer>,
    /// False when no API key was found; the proxy then answers 500 without calling out
    pub gateway_configured: bool,
}

impl AppState {
    pub fn new(gateway: Arc<dyn AiGateway>, gateway_configured: bool) -> Self {
        Self {
            sessions: SessionStore::new(gateway),
            renderer: Arc::new(MarkdownRenderer::new()),
            gateway_configured,
        }
    }

    fn gateway(&self) -> Arc<dyn AiGateway> {
        self.sessions.gateway()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub id: Uuid,
    #[serde(flatten)]
    pub snapshot: WizardSnapshot,
}

#[derive(Debug, Deserialize)]
pub struct AnswerBody {
    pub text: String,
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    "ok"
}

pub async fn questions_handler() -> impl IntoResponse {
    Json(json!({
        "greeting": GREETING,
        "questions": QUESTIONS,
    }))
}

fn proxy_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn gateway_failure(err: GatewayError) -> Response {
    tracing::warn!(kind = ?err.kind, "proxied AI call failed: {}", err);
    (
        err.kind.status_code(),
        Json(json!({
            "error": err.kind.friendly_message(),
            "originalError": err.message,
        })),
    )
        .into_response()
}

/// Non-blank string field of the request body
fn field<'a>(body: &'a Value, name: &str) -> Option<&'a str> {
    body.get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// Discriminated passthrough to the AI gateway.
///
/// `{"action":"generateReport","prompt"}` or
/// `{"action":"reviseAnswer","question","context","userAnswer"}`.
pub async fn proxy_handler(State(state): State<AppState>, body: Bytes) -> Response {
    if !state.gateway_configured {
        tracing::error!("proxy called but GEMINI_SECRET_KEY is not set");
        return proxy_error(StatusCode::INTERNAL_SERVER_ERROR, MISSING_KEY_MESSAGE);
    }

    let body: Value = if body.is_empty() {
        json!({})
    } else {
        match serde_json::from_slice(&body) {
            Ok(v) => v,
            Err(e) => {
                return proxy_error(StatusCode::BAD_REQUEST, &format!("Invalid JSON body: {}", e));
            }
        }
    };

    let gateway = state.gateway();
    match body.get("action").and_then(Value::as_str) {
        Some("generateReport") => {
            let Some(prompt) = field(&body, "prompt") else {
                return proxy_error(
                    StatusCode::BAD_REQUEST,
                    "Missing prompt for report generation.",
                );
            };
            match gateway.generate_final_report(prompt).await {
                Ok(result) => Json(result).into_response(),
                Err(err) => gateway_failure(err),
            }
        }
        Some("reviseAnswer") => {
            let (Some(question), Some(user_answer)) =
                (field(&body, "question"), field(&body, "userAnswer"))
            else {
                return proxy_error(
                    StatusCode::BAD_REQUEST,
                    "Missing parameters for answer revision.",
                );
            };
            let context = body.get("context").and_then(Value::as_str).unwrap_or("");
            match gateway.revise_answer(question, context, user_answer).await {
                Ok(revised) => Json(json!({ "revisedText": revised })).into_response(),
                Err(err) => gateway_failure(err),
            }
        }
        _ => proxy_error(StatusCode::BAD_REQUEST, "Invalid action specified."),
    }
}

fn session_response(id: Uuid, snapshot: WizardSnapshot) -> Json<SessionResponse> {
    Json(SessionResponse { id, snapshot })
}

pub async fn create_session(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.sessions.create().await;
    let snapshot = session.snapshot().await;
    (StatusCode::CREATED, session_response(session.id(), snapshot))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>> {
    let session = state.sessions.get(id).await?;
    Ok(session_response(id, session.snapshot().await))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.sessions.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn start_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>> {
    let snapshot = state.sessions.get(id).await?.start().await?;
    Ok(session_response(id, snapshot))
}

pub async fn next_step(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>> {
    let snapshot = state.sessions.get(id).await?.next().await?;
    Ok(session_response(id, snapshot))
}

pub async fn previous_step(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>> {
    let snapshot = state.sessions.get(id).await?.back().await?;
    Ok(session_response(id, snapshot))
}

pub async fn set_answer(
    State(state): State<AppState>,
    Path((id, step)): Path<(Uuid, usize)>,
    Json(body): Json<AnswerBody>,
) -> Result<Json<SessionResponse>> {
    let snapshot = state
        .sessions
        .get(id)
        .await?
        .set_answer(step, body.text)
        .await?;
    Ok(session_response(id, snapshot))
}

pub async fn revise_answer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>> {
    let snapshot = state.sessions.get(id).await?.revise().await?;
    Ok(session_response(id, snapshot))
}

pub async fn submit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>> {
    let snapshot = state.sessions.get(id).await?.submit().await?;
    Ok(session_response(id, snapshot))
}

pub async fn reset_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>> {
    let snapshot = state.sessions.get(id).await?.reset().await?;
    Ok(session_response(id, snapshot))
}

async fn session_report(state: &AppState, id: Uuid) -> Result<crate::clients::ReportResult> {
    state
        .sessions
        .get(id)
        .await?
        .with_wizard(|w| w.report().cloned())
        .await
        .ok_or_else(|| AssistantError::NotFound {
            message: "no report has been generated for this session".to_string(),
        })
}

pub async fn report_html(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Html<String>> {
    let report = session_report(&state, id).await?;
    let page = ReportPage::new(&report).to_html(&state.renderer)?;
    Ok(Html(page))
}

pub async fn report_markdown(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let report = session_report(&state, id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, MARKDOWN_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", MARKDOWN_FILENAME),
            ),
        ],
        export_markdown(&report).to_string(),
    )
        .into_response())
}

async fn log_requests(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();
    let resp = next.run(req).await;
    let latency_ms = start.elapsed().as_millis() as u64;
    if resp.status().is_server_error() {
        tracing::warn!(%method, %path, status = resp.status().as_u16(), latency_ms, "request failed");
    } else {
        tracing::debug!(%method, %path, status = resp.status().as_u16(), latency_ms, "request");
    }
    resp
}

/// Build the application router
pub fn router(state: AppState, cors_permissive: bool) -> Router {
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/api/questions", get(questions_handler))
        .route("/api/gemini", post(proxy_handler))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session).delete(delete_session))
        .route("/api/sessions/:id/start", post(start_session))
        .route("/api/sessions/:id/next", post(next_step))
        .route("/api/sessions/:id/back", post(previous_step))
        .route("/api/sessions/:id/answers/:step", put(set_answer))
        .route("/api/sessions/:id/revise", post(revise_answer))
        .route("/api/sessions/:id/submit", post(submit))
        .route("/api/sessions/:id/reset", post(reset_session))
        .route("/api/sessions/:id/report", get(report_html))
        .route("/api/sessions/:id/report.md", get(report_markdown))
        .layer(middleware::from_fn(log_requests));

    let app = if cors_permissive {
        app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        app
    };

    app.with_state(state)
}

/// Start the HTTP server
pub async fn start_http_server(config: &Config, state: AppState) -> anyhow::Result<()> {
    let app = router(state, config.server.cors_permissive);

    let listener = tokio::net::TcpListener::bind(config.server.http_bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind HTTP listener: {}", e))?;

    tracing::info!(
        "Starting HTTP server on {} (model {})",
        config.server.http_bind,
        config.gemini.model
    );

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

    Ok(())
}
