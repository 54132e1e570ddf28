mod common;

use std::sync::Arc;

use common::{GatedGateway, PanickingGateway, ScriptedGateway, sample_report};
use decision_assistant::catalog::{self, QUESTIONS};
use decision_assistant::clients::GatewayErrorKind;
use decision_assistant::error::AssistantError;
use decision_assistant::session::{SessionStore, WizardSession};
use decision_assistant::wizard::{MSG_ANSWER_ALL, MSG_REVISE_EMPTY, WizardView};
use pretty_assertions::assert_eq;

async fn answer_all(session: &WizardSession) {
    for step in 0..QUESTIONS.len() {
        session
            .set_answer(step, format!("answer {}", step))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn full_flow_produces_report() {
    let gateway = Arc::new(ScriptedGateway::new().report_ok(sample_report()));
    let session = WizardSession::new(gateway.clone());

    let snap = session.start().await.unwrap();
    assert_eq!(snap.view, WizardView::Form);
    assert_eq!(snap.step, 0);
    assert!(!snap.can_go_back);

    answer_all(&session).await;
    for _ in 1..QUESTIONS.len() {
        session.next().await.unwrap();
    }
    let snap = session.snapshot().await;
    assert!(snap.is_last_step);
    assert!(snap.can_submit);

    let snap = session.submit().await.unwrap();
    assert_eq!(snap.view, WizardView::Report);
    assert!(snap.has_report);
    assert_eq!(snap.error, None);

    let prompts = gateway.report_prompts.lock().unwrap().clone();
    let answers: Vec<String> = (0..QUESTIONS.len()).map(|i| format!("answer {}", i)).collect();
    assert_eq!(prompts, vec![catalog::compile_report_prompt(&answers)]);

    let report = session.with_wizard(|w| w.report().cloned()).await.unwrap();
    assert_eq!(report, sample_report());
}

#[tokio::test]
async fn back_moves_to_previous_step() {
    let session = WizardSession::new(Arc::new(ScriptedGateway::new()));
    session.start().await.unwrap();
    session.next().await.unwrap();
    session.next().await.unwrap();

    let snap = session.back().await.unwrap();
    assert_eq!(snap.step, 1);
    assert_eq!(snap.question, QUESTIONS[1]);
}

#[tokio::test]
async fn submit_with_missing_answers_is_rejected() {
    let gateway = Arc::new(ScriptedGateway::new());
    let session = WizardSession::new(gateway.clone());
    session.start().await.unwrap();
    session.set_answer(0, "only one".to_string()).await.unwrap();

    let err = session.submit().await.unwrap_err();
    assert!(matches!(err, AssistantError::Validation { .. }));

    let snap = session.snapshot().await;
    assert_eq!(snap.view, WizardView::Form);
    assert_eq!(snap.error.as_deref(), Some(MSG_ANSWER_ALL));
    assert!(gateway.report_prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn failed_report_returns_to_form_and_retry_succeeds() {
    let gateway = Arc::new(
        ScriptedGateway::new()
            .report_err(GatewayErrorKind::RateLimited, "quota exceeded")
            .report_ok(sample_report()),
    );
    let session = WizardSession::new(gateway.clone());
    session.start().await.unwrap();
    answer_all(&session).await;

    let snap = session.submit().await.unwrap();
    assert_eq!(snap.view, WizardView::Form);
    assert_eq!(
        snap.error.as_deref(),
        Some("Error generating report: quota exceeded")
    );
    assert_eq!(snap.answers[3], "answer 3");
    assert!(!snap.has_report);

    let snap = session.submit().await.unwrap();
    assert_eq!(snap.view, WizardView::Report);
    assert_eq!(snap.error, None);

    let prompts = gateway.report_prompts.lock().unwrap().clone();
    assert_eq!(prompts.len(), 2);
    assert_eq!(prompts[0], prompts[1]);
}

#[tokio::test]
async fn revision_uses_only_earlier_answers_as_context() {
    let gateway = Arc::new(ScriptedGateway::new().revise_ok("Polished stakeholder list."));
    let session = WizardSession::new(gateway.clone());
    session.start().await.unwrap();
    session.set_answer(0, "New ERP".to_string()).await.unwrap();
    session.set_answer(1, "finance, IT".to_string()).await.unwrap();
    session.set_answer(2, "later answer".to_string()).await.unwrap();
    session.next().await.unwrap();

    let snap = session.revise().await.unwrap();
    assert_eq!(snap.answers[1], "Polished stakeholder list.");
    assert!(snap.revising.is_empty());

    let calls = gateway.revision_calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].question, QUESTIONS[1]);
    assert_eq!(calls[0].draft, "finance, IT");
    assert_eq!(calls[0].context, format!("Q: {}\nA: New ERP", QUESTIONS[0]));
}

#[tokio::test]
async fn failed_revision_keeps_draft_and_records_error() {
    let gateway = Arc::new(
        ScriptedGateway::new().revise_err(GatewayErrorKind::Unauthorized, "API key not valid"),
    );
    let session = WizardSession::new(gateway);
    session.start().await.unwrap();
    session.set_answer(0, "draft".to_string()).await.unwrap();

    let snap = session.revise().await.unwrap();
    assert_eq!(snap.answers[0], "draft");
    assert_eq!(
        snap.error.as_deref(),
        Some("Error revising answer: API key not valid")
    );
    assert!(snap.revising.is_empty());
    assert!(snap.can_revise);
}

#[tokio::test]
async fn blank_answer_cannot_be_revised() {
    let gateway = Arc::new(ScriptedGateway::new());
    let session = WizardSession::new(gateway.clone());
    session.start().await.unwrap();
    session.set_answer(0, "   ".to_string()).await.unwrap();

    let err = session.revise().await.unwrap_err();
    assert!(matches!(err, AssistantError::Validation { .. }));
    assert_eq!(
        session.snapshot().await.error.as_deref(),
        Some(MSG_REVISE_EMPTY)
    );
    assert!(gateway.revision_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn in_flight_revision_blocks_a_second_one_then_clears() {
    let gateway = Arc::new(GatedGateway::default());
    let session = WizardSession::new(gateway.clone());
    session.start().await.unwrap();
    session.set_answer(0, "first draft".to_string()).await.unwrap();

    let pending = {
        let session = session.clone();
        tokio::spawn(async move { session.revise().await })
    };
    gateway.started.notified().await;

    let snap = session.snapshot().await;
    assert_eq!(snap.revising, vec![0]);
    assert!(!snap.can_revise);
    let err = session.revise().await.unwrap_err();
    assert!(matches!(err, AssistantError::RevisionInFlight { step: 0 }));

    // other steps stay usable while step 0 is in flight
    session.next().await.unwrap();
    session.set_answer(1, "second".to_string()).await.unwrap();

    gateway.release.notify_one();
    let snap = pending.await.unwrap().unwrap();
    assert!(snap.revising.is_empty());
    assert_eq!(snap.answers[0], "revised: first draft");
    assert_eq!(snap.answers[1], "second");
}

#[tokio::test]
async fn revision_finishing_after_reset_is_discarded() {
    let gateway = Arc::new(GatedGateway::default());
    let session = WizardSession::new(gateway.clone());
    session.start().await.unwrap();
    session.set_answer(0, "draft".to_string()).await.unwrap();

    let pending = {
        let session = session.clone();
        tokio::spawn(async move { session.revise().await })
    };
    gateway.started.notified().await;

    let snap = session.reset().await.unwrap();
    assert_eq!(snap.view, WizardView::Welcome);

    gateway.release.notify_one();
    let snap = pending.await.unwrap().unwrap();
    assert_eq!(snap.view, WizardView::Welcome);
    assert!(snap.answers.iter().all(String::is_empty));
    assert!(snap.revising.is_empty());
}

#[tokio::test]
async fn transitions_outside_their_view_are_rejected() {
    let session = WizardSession::new(Arc::new(ScriptedGateway::new()));
    let err = session.next().await.unwrap_err();
    assert!(matches!(err, AssistantError::InvalidTransition { .. }));

    session.start().await.unwrap();
    let err = session.start().await.unwrap_err();
    assert!(matches!(err, AssistantError::InvalidTransition { .. }));
    assert_eq!(session.snapshot().await.view, WizardView::Form);
}

#[tokio::test]
async fn store_tracks_sessions() {
    let store = SessionStore::new(Arc::new(ScriptedGateway::new()));
    assert!(store.is_empty().await);

    let session = store.create().await;
    assert_eq!(store.len().await, 1);
    assert_eq!(store.get(session.id()).await.unwrap().id(), session.id());

    store.remove(session.id()).await.unwrap();
    assert!(matches!(
        store.get(session.id()).await,
        Err(AssistantError::NotFound { .. })
    ));
    assert!(store.remove(session.id()).await.is_err());
}

#[tokio::test]
async fn panicking_revision_clears_in_flight_flag() {
    let session = WizardSession::new(Arc::new(PanickingGateway));
    session.start().await.unwrap();
    session.set_answer(0, "draft".to_string()).await.unwrap();

    let snap = session.revise().await.unwrap();
    assert!(snap.revising.is_empty());
    assert!(snap.can_revise);
    assert_eq!(snap.answers[0], "draft");
    assert!(
        snap.error
            .as_deref()
            .unwrap()
            .starts_with("Error revising answer: the AI request was interrupted")
    );
}

#[tokio::test]
async fn panicking_report_returns_to_form_and_allows_reset() {
    let session = WizardSession::new(Arc::new(PanickingGateway));
    session.start().await.unwrap();
    answer_all(&session).await;

    let snap = session.submit().await.unwrap();
    assert_eq!(snap.view, WizardView::Form);
    assert!(!snap.has_report);
    assert_eq!(snap.answers[6], "answer 6");
    assert!(
        snap.error
            .as_deref()
            .unwrap()
            .starts_with("Error generating report: the AI request was interrupted")
    );

    let snap = session.reset().await.unwrap();
    assert_eq!(snap.view, WizardView::Welcome);
}
