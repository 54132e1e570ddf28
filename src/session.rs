//! Async wizard sessions.
//!
//! A session owns one `Wizard` behind a mutex that is never held across a
//! gateway call. Gateway calls run in a spawned task so the begin/finish pair
//! always completes, even if the caller stops waiting.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::clients::{AiGateway, GatewayError, GatewayErrorKind};
use crate::error::{AssistantError, Result};
use crate::wizard::{Wizard, WizardSnapshot};

#[derive(Clone)]
pub struct WizardSession {
    id: Uuid,
    wizard: Arc<Mutex<Wizard>>,
    gateway: Arc<dyn AiGateway>,
}

impl WizardSession {
    pub fn new(gateway: Arc<dyn AiGateway>) -> Self {
        Self {
            id: Uuid::new_v4(),
            wizard: Arc::new(Mutex::new(Wizard::new())),
            gateway,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub async fn snapshot(&self) -> WizardSnapshot {
        self.wizard.lock().await.snapshot()
    }

    /// Run a synchronous wizard operation under the lock
    pub async fn with_wizard<T>(&self, op: impl FnOnce(&mut Wizard) -> T) -> T {
        let mut wizard = self.wizard.lock().await;
        op(&mut wizard)
    }

    pub async fn start(&self) -> Result<WizardSnapshot> {
        self.apply(Wizard::start).await
    }

    pub async fn next(&self) -> Result<WizardSnapshot> {
        self.apply(|w| w.next().map(|_| ())).await
    }

    pub async fn back(&self) -> Result<WizardSnapshot> {
        self.apply(|w| w.back().map(|_| ())).await
    }

    pub async fn set_answer(&self, step: usize, text: String) -> Result<WizardSnapshot> {
        self.apply(move |w| w.set_answer(step, text)).await
    }

    pub async fn reset(&self) -> Result<WizardSnapshot> {
        self.apply(Wizard::reset).await
    }

    async fn apply(&self, op: impl FnOnce(&mut Wizard) -> Result<()>) -> Result<WizardSnapshot> {
        let mut wizard = self.wizard.lock().await;
        op(&mut wizard)?;
        Ok(wizard.snapshot())
    }

    /// Revise the currently displayed answer through the gateway.
    ///
    /// Validation problems return `Err`. A gateway failure is not an `Err`:
    /// it is recorded on the wizard and visible in the returned snapshot.
    pub async fn revise(&self) -> Result<WizardSnapshot> {
        let request = self.wizard.lock().await.begin_revision()?;
        debug!(
            session = %self.id,
            step = request.step,
            draft_chars = request.draft.len(),
            "revision started"
        );

        let pending = request.clone();
        let wizard = Arc::clone(&self.wizard);
        let gateway = Arc::clone(&self.gateway);
        let session = self.id;
        let task = tokio::spawn(async move {
            let outcome = gateway
                .revise_answer(request.question, &request.context, &request.draft)
                .await;
            if let Err(err) = &outcome {
                warn!(%session, step = request.step, kind = ?err.kind, "revision failed: {}", err);
            }
            let mut wizard = wizard.lock().await;
            wizard.finish_revision(&request, outcome);
            wizard.snapshot()
        });

        match task.await {
            Ok(snapshot) => Ok(snapshot),
            Err(err) => {
                error!(session = %self.id, step = pending.step, "revision task aborted: {}", err);
                let mut wizard = self.wizard.lock().await;
                wizard.finish_revision(&pending, Err(aborted(err)));
                Ok(wizard.snapshot())
            }
        }
    }

    /// Generate the final report from all answers.
    ///
    /// Same error contract as [`WizardSession::revise`]. A gateway task that
    /// panics still moves the wizard out of `Loading`.
    pub async fn submit(&self) -> Result<WizardSnapshot> {
        let prompt = self.wizard.lock().await.begin_submit()?;
        info!(session = %self.id, prompt_chars = prompt.len(), "generating final report");

        let wizard = Arc::clone(&self.wizard);
        let gateway = Arc::clone(&self.gateway);
        let session = self.id;
        let task = tokio::spawn(async move {
            let outcome = gateway.generate_final_report(&prompt).await;
            match &outcome {
                Ok(result) => info!(
                    %session,
                    report_chars = result.report.len(),
                    sources = result.sources.len(),
                    "final report generated"
                ),
                Err(err) => warn!(%session, kind = ?err.kind, "report generation failed: {}", err),
            }
            let mut wizard = wizard.lock().await;
            wizard.finish_submit(outcome);
            wizard.snapshot()
        });

        match task.await {
            Ok(snapshot) => Ok(snapshot),
            Err(err) => {
                error!(session = %self.id, "report task aborted: {}", err);
                let mut wizard = self.wizard.lock().await;
                wizard.finish_submit(Err(aborted(err)));
                Ok(wizard.snapshot())
            }
        }
    }
}

impl std::fmt::Debug for WizardSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WizardSession").field("id", &self.id).finish()
    }
}

/// A gateway task that died before finishing counts as an ordinary gateway failure
fn aborted(err: JoinError) -> GatewayError {
    GatewayError::new(
        GatewayErrorKind::Unknown,
        format!("the AI request was interrupted: {}", err),
    )
}

/// In-memory registry of live sessions
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, WizardSession>>>,
    gateway: Arc<dyn AiGateway>,
}

impl SessionStore {
    pub fn new(gateway: Arc<dyn AiGateway>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            gateway,
        }
    }

    pub fn gateway(&self) -> Arc<dyn AiGateway> {
        Arc::clone(&self.gateway)
    }

    pub async fn create(&self) -> WizardSession {
        let session = WizardSession::new(self.gateway());
        self.sessions
            .write()
            .await
            .insert(session.id(), session.clone());
        debug!(session = %session.id(), "session created");
        session
    }

    pub async fn get(&self, id: Uuid) -> Result<WizardSession> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| AssistantError::NotFound {
                message: format!("session {} does not exist", id),
            })
    }

    pub async fn remove(&self, id: Uuid) -> Result<()> {
        self.sessions
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AssistantError::NotFound {
                message: format!("session {} does not exist", id),
            })
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
