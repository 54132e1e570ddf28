//! Wizard state machine for the guided questionnaire.
//!
//! `Wizard` is plain synchronous state. Operations that need the AI gateway
//! are split into a `begin_*` half that validates and records the in-flight
//! state, and a `finish_*` half that applies the outcome. The session layer
//! performs the actual call in between without holding the lock.

use serde::{Deserialize, Serialize};

use crate::catalog::{self, QUESTIONS};
use crate::clients::{GatewayError, ReportResult};
use crate::error::{AssistantError, Result};

pub const MSG_ANSWER_ALL: &str = "Please answer all questions before generating the report.";
pub const MSG_REVISE_EMPTY: &str = "Please write an answer before trying to revise it.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardView {
    Welcome,
    Form,
    Loading,
    Report,
}

impl WizardView {
    pub fn as_str(self) -> &'static str {
        match self {
            WizardView::Welcome => "welcome",
            WizardView::Form => "form",
            WizardView::Loading => "loading",
            WizardView::Report => "report",
        }
    }
}

/// Inputs captured for one outstanding revise call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionRequest {
    pub step: usize,
    pub question: &'static str,
    pub context: String,
    pub draft: String,
    epoch: u64,
}

/// Serializable view of the wizard for clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardSnapshot {
    pub view: WizardView,
    pub step: usize,
    pub total_steps: usize,
    pub question: String,
    pub answers: Vec<String>,
    /// Steps with an outstanding revise call
    pub revising: Vec<usize>,
    pub error: Option<String>,
    pub can_go_back: bool,
    pub can_go_next: bool,
    pub is_last_step: bool,
    pub can_revise: bool,
    pub can_submit: bool,
    pub has_report: bool,
}

#[derive(Debug, Clone)]
pub struct Wizard {
    view: WizardView,
    cursor: usize,
    answers: Vec<String>,
    revising: Vec<bool>,
    error: Option<String>,
    report: Option<ReportResult>,
    /// Bumped on reset so revisions started before it are discarded
    epoch: u64,
}

impl Default for Wizard {
    fn default() -> Self {
        Self::new()
    }
}

impl Wizard {
    pub fn new() -> Self {
        let n = catalog::question_count();
        Self {
            view: WizardView::Welcome,
            cursor: 0,
            answers: vec![String::new(); n],
            revising: vec![false; n],
            error: None,
            report: None,
            epoch: 0,
        }
    }

    pub fn view(&self) -> WizardView {
        self.view
    }

    pub fn step(&self) -> usize {
        self.cursor
    }

    pub fn answers(&self) -> &[String] {
        &self.answers
    }

    pub fn answer(&self, step: usize) -> Option<&str> {
        self.answers.get(step).map(String::as_str)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn report(&self) -> Option<&ReportResult> {
        self.report.as_ref()
    }

    pub fn is_revising(&self, step: usize) -> bool {
        self.revising.get(step).copied().unwrap_or(false)
    }

    pub fn revising_steps(&self) -> Vec<usize> {
        self.revising
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.then_some(i))
            .collect()
    }

    pub fn all_answered(&self) -> bool {
        self.answers.iter().all(|a| catalog::is_complete(a))
    }

    fn last_step(&self) -> usize {
        self.answers.len().saturating_sub(1)
    }

    fn require(&self, expected: WizardView, operation: &'static str) -> Result<()> {
        if self.view == expected {
            Ok(())
        } else {
            Err(AssistantError::InvalidTransition {
                operation,
                view: self.view.as_str(),
            })
        }
    }

    /// Welcome -> Form, cursor at the first question
    pub fn start(&mut self) -> Result<()> {
        self.require(WizardView::Welcome, "start")?;
        self.view = WizardView::Form;
        self.cursor = 0;
        self.error = None;
        Ok(())
    }

    /// Advance one step. Returns false (and changes nothing) on the last step.
    pub fn next(&mut self) -> Result<bool> {
        self.require(WizardView::Form, "go to the next step")?;
        if self.cursor < self.last_step() {
            self.cursor += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Go back one step. Returns false (and changes nothing) on the first step.
    pub fn back(&mut self) -> Result<bool> {
        self.require(WizardView::Form, "go back")?;
        if self.cursor > 0 {
            self.cursor -= 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn set_answer(&mut self, step: usize, text: impl Into<String>) -> Result<()> {
        self.require(WizardView::Form, "edit an answer")?;
        let slot = self
            .answers
            .get_mut(step)
            .ok_or_else(|| AssistantError::NotFound {
                message: format!("step {} does not exist", step),
            })?;
        *slot = text.into();
        Ok(())
    }

    /// Validate and mark a revision of the current step as in flight.
    /// On a blank draft the error is recorded and no request is produced.
    pub fn begin_revision(&mut self) -> Result<RevisionRequest> {
        self.require(WizardView::Form, "revise an answer")?;
        let step = self.cursor;
        if self.is_revising(step) {
            return Err(AssistantError::RevisionInFlight { step });
        }
        let draft = self.answers[step].clone();
        if !catalog::is_complete(&draft) {
            self.error = Some(MSG_REVISE_EMPTY.to_string());
            return Err(AssistantError::validation(MSG_REVISE_EMPTY));
        }

        self.error = None;
        self.revising[step] = true;
        Ok(RevisionRequest {
            step,
            question: QUESTIONS[step],
            context: catalog::revision_context(&self.answers, step),
            draft,
            epoch: self.epoch,
        })
    }

    /// Apply the outcome of a revise call and clear its in-flight flag.
    /// Success replaces the whole answer; failure leaves it untouched.
    pub fn finish_revision(
        &mut self,
        request: &RevisionRequest,
        outcome: std::result::Result<String, GatewayError>,
    ) {
        if request.epoch != self.epoch {
            tracing::debug!(step = request.step, "discarding revision started before reset");
            return;
        }
        if let Some(flag) = self.revising.get_mut(request.step) {
            *flag = false;
        }
        match outcome {
            Ok(revised) => self.answers[request.step] = revised,
            Err(err) => self.error = Some(format!("Error revising answer: {}", err)),
        }
    }

    /// Form -> Loading when every answer is present. Returns the compiled prompt.
    pub fn begin_submit(&mut self) -> Result<String> {
        self.require(WizardView::Form, "generate the report")?;
        if !self.all_answered() {
            self.error = Some(MSG_ANSWER_ALL.to_string());
            return Err(AssistantError::validation(MSG_ANSWER_ALL));
        }
        self.error = None;
        self.view = WizardView::Loading;
        Ok(catalog::compile_report_prompt(&self.answers))
    }

    /// Loading -> Report on success, Loading -> Form on failure
    pub fn finish_submit(&mut self, outcome: std::result::Result<ReportResult, GatewayError>) {
        if self.view != WizardView::Loading {
            tracing::warn!(view = self.view.as_str(), "report outcome arrived outside loading");
            return;
        }
        match outcome {
            Ok(report) => {
                self.report = Some(report);
                self.view = WizardView::Report;
            }
            Err(err) => {
                self.error = Some(format!("Error generating report: {}", err));
                self.view = WizardView::Form;
            }
        }
    }

    /// Back to the welcome screen with everything cleared. Not allowed while a
    /// report is being generated.
    pub fn reset(&mut self) -> Result<()> {
        if self.view == WizardView::Loading {
            return Err(AssistantError::InvalidTransition {
                operation: "reset",
                view: self.view.as_str(),
            });
        }
        let epoch = self.epoch + 1;
        *self = Self::new();
        self.epoch = epoch;
        Ok(())
    }

    pub fn snapshot(&self) -> WizardSnapshot {
        let in_form = self.view == WizardView::Form;
        let current_complete = catalog::is_complete(&self.answers[self.cursor]);
        WizardSnapshot {
            view: self.view,
            step: self.cursor,
            total_steps: self.answers.len(),
            question: QUESTIONS[self.cursor].to_string(),
            answers: self.answers.clone(),
            revising: self.revising_steps(),
            error: self.error.clone(),
            can_go_back: in_form && self.cursor > 0,
            can_go_next: in_form && self.cursor < self.last_step(),
            is_last_step: self.cursor == self.last_step(),
            can_revise: in_form && current_complete && !self.is_revising(self.cursor),
            can_submit: in_form && self.all_answered(),
            has_report: self.report.is_some(),
        }
    }
}
