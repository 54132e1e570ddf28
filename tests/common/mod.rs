#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use decision_assistant::clients::{AiGateway, GatewayError, GatewayErrorKind, ReportResult};
use tokio::sync::Notify;

/// Recorded arguments of one revise call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionCall {
    pub question: String,
    pub context: String,
    pub draft: String,
}

/// Gateway that replays queued outcomes and records every call
#[derive(Default)]
pub struct ScriptedGateway {
    revisions: Mutex<VecDeque<Result<String, GatewayError>>>,
    reports: Mutex<VecDeque<Result<ReportResult, GatewayError>>>,
    pub revision_calls: Mutex<Vec<RevisionCall>>,
    pub report_prompts: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn revise_ok(self, text: &str) -> Self {
        self.revisions.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    pub fn revise_err(self, kind: GatewayErrorKind, message: &str) -> Self {
        self.revisions
            .lock()
            .unwrap()
            .push_back(Err(GatewayError::new(kind, message)));
        self
    }

    pub fn report_ok(self, report: ReportResult) -> Self {
        self.reports.lock().unwrap().push_back(Ok(report));
        self
    }

    pub fn report_err(self, kind: GatewayErrorKind, message: &str) -> Self {
        self.reports
            .lock()
            .unwrap()
            .push_back(Err(GatewayError::new(kind, message)));
        self
    }
}

#[async_trait]
impl AiGateway for ScriptedGateway {
    async fn revise_answer(
        &self,
        question: &str,
        context: &str,
        draft: &str,
    ) -> Result<String, GatewayError> {
        self.revision_calls.lock().unwrap().push(RevisionCall {
            question: question.to_string(),
            context: context.to_string(),
            draft: draft.to_string(),
        });
        self.revisions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::new(GatewayErrorKind::Unknown, "no scripted revision")))
    }

    async fn generate_final_report(&self, prompt: &str) -> Result<ReportResult, GatewayError> {
        self.report_prompts.lock().unwrap().push(prompt.to_string());
        self.reports
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::new(GatewayErrorKind::Unknown, "no scripted report")))
    }
}

/// Gateway whose revise call parks until the test releases it
#[derive(Default)]
pub struct GatedGateway {
    pub started: Arc<Notify>,
    pub release: Arc<Notify>,
}

#[async_trait]
impl AiGateway for GatedGateway {
    async fn revise_answer(
        &self,
        _question: &str,
        _context: &str,
        draft: &str,
    ) -> Result<String, GatewayError> {
        self.started.notify_one();
        self.release.notified().await;
        Ok(format!("revised: {}", draft))
    }

    async fn generate_final_report(&self, _prompt: &str) -> Result<ReportResult, GatewayError> {
        Err(GatewayError::new(GatewayErrorKind::Unknown, "not used"))
    }
}

/// Gateway whose calls panic mid-request
pub struct PanickingGateway;

#[async_trait]
impl AiGateway for PanickingGateway {
    async fn revise_answer(
        &self,
        _question: &str,
        _context: &str,
        _draft: &str,
    ) -> Result<String, GatewayError> {
        panic!("connection handler crashed");
    }

    async fn generate_final_report(&self, _prompt: &str) -> Result<ReportResult, GatewayError> {
        panic!("connection handler crashed");
    }
}

pub fn sample_report() -> ReportResult {
    ReportResult {
        report: "# Executive Summary\n\n- Budget overrun. (Financial)\n".to_string(),
        sources: Vec::new(),
    }
}
