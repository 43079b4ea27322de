//! IntakeManager: the event surface the presentation layer drives.
//!
//! Every handler takes a session id, locks that session for the duration of
//! the call, and returns a serializable view. Any handled event, reads
//! included, counts as activity for idle expiry. Failed handlers leave the
//! session's answers untouched.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use super::field::{Field, FieldValue};
use super::registry::{IntakeSession, SessionRegistry};
use super::sequencer::{SequencerState, StepSequencer};
use super::session::SessionRecord;
use super::step::{Step, Workflow};
use super::submission::{SubmissionHandler, SubmissionRecord};
use crate::assist::{AssistDispatcher, AssistExchange, CaseReportGenerator, DocumentTemplate};
use crate::error::{IntakeError, Result, ServiceError};
use crate::llm::LlmProvider;
use crate::risk::{PatientRecord, Prediction, RelapseRiskHeuristic, RiskDashboard, RiskModel};
use crate::store::DocumentStore;

/// A field as the presentation surface should render it.
#[derive(Debug, Clone, Serialize)]
pub struct FieldView {
    #[serde(flatten)]
    pub field: Field,
    /// Entered value, or the display default when nothing was entered.
    pub value: Option<FieldValue>,
    pub entered: bool,
    pub issue: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepView {
    pub id: u32,
    pub title: String,
    pub fields: Vec<FieldView>,
    pub can_advance: bool,
    pub is_final: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Progress {
    pub completed_steps: usize,
    pub total_steps: usize,
    pub percent: u8,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub workflow: String,
    pub started_at: DateTime<Utc>,
    pub state: SequencerState,
    pub current_step: Option<StepView>,
    pub values: SessionRecord,
    pub progress: Progress,
}

/// Outcome of a single field change.
#[derive(Debug, Clone, Serialize)]
pub struct FieldChange {
    pub field: String,
    pub value: Option<FieldValue>,
    /// Rule failure of the stored value. It is kept, but blocks advancing.
    pub issue: Option<String>,
    pub can_advance: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderedTemplate {
    pub kind: DocumentTemplate,
    pub title: String,
    pub body: String,
}

/// Text-generation features, present only when a service is configured.
struct TextServices {
    assist: AssistDispatcher,
    reports: CaseReportGenerator,
}

pub struct IntakeManager {
    registry: Arc<SessionRegistry>,
    submissions: SubmissionHandler,
    documents: Arc<dyn DocumentStore>,
    text: Option<TextServices>,
    risk: Arc<dyn RiskModel>,
}

impl IntakeManager {
    pub fn new(
        workflow: Arc<Workflow>,
        documents: Arc<dyn DocumentStore>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            registry: SessionRegistry::new(workflow, idle_timeout),
            submissions: SubmissionHandler::new(Arc::clone(&documents)),
            documents,
            text: None,
            risk: Arc::new(RelapseRiskHeuristic::new()),
        }
    }

    /// Enable the assist chat and case reports.
    pub fn with_llm(mut self, llm: Arc<dyn LlmProvider>, preamble: Option<String>) -> Self {
        self.text = Some(TextServices {
            assist: AssistDispatcher::new(Arc::clone(&llm)).with_preamble(preamble),
            reports: CaseReportGenerator::new(llm),
        });
        self
    }

    pub fn with_risk_model(mut self, model: Arc<dyn RiskModel>) -> Self {
        self.risk = model;
        self
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn workflow(&self) -> &Arc<Workflow> {
        self.registry.workflow()
    }

    // ── Session lifecycle ───────────────────────────────────────────

    pub async fn create_session(&self) -> SessionView {
        let (id, session) = self.registry.create().await;
        let session = session.lock().await;
        info!(session_id = %id, "Intake session started");
        build_view(&session)
    }

    pub async fn view(&self, session_id: Uuid) -> Result<SessionView> {
        let session = self.registry.lock(session_id).await?;
        Ok(build_view(&session))
    }

    pub async fn end_session(&self, session_id: Uuid) -> Result<()> {
        self.registry.end(session_id).await?;
        info!(session_id = %session_id, "Intake session ended");
        Ok(())
    }

    // ── Presentation events ─────────────────────────────────────────

    /// Fields of the active step, ready to render.
    pub async fn render_spec(&self, session_id: Uuid) -> Result<Vec<FieldView>> {
        let session = self.registry.lock(session_id).await?;
        let step = session.sequencer.current_step()?;
        Ok(field_views(step, &session))
    }

    /// Interpret and store a raw value. Type mismatches are rejected and
    /// leave the store unchanged; rule failures are stored and reported.
    pub async fn on_field_change(
        &self,
        session_id: Uuid,
        name: &str,
        raw: &Value,
    ) -> Result<FieldChange> {
        let mut guard = self.registry.lock(session_id).await?;
        let session = &mut *guard;

        if session.sequencer.is_submitted() {
            return Err(IntakeError::InvalidState(
                "The application has already been submitted. Start over to make changes.".into(),
            ));
        }

        let field = self
            .workflow()
            .field(name)
            .ok_or_else(|| IntakeError::not_found("Field", name))?;

        let value = field.interpret(raw)?;
        match &value {
            Some(v) => session.store.set(name, v.clone()),
            None => {
                session.store.unset(name);
            }
        }

        let issue = field
            .validate(session.store.get(name))
            .err()
            .map(|e| e.to_string());
        debug!(
            session_id = %session_id,
            field = name,
            cleared = value.is_none(),
            valid = issue.is_none(),
            "Field changed"
        );

        Ok(FieldChange {
            field: name.to_string(),
            value,
            issue,
            can_advance: session.sequencer.can_advance(&session.store),
        })
    }

    pub async fn on_advance(&self, session_id: Uuid) -> Result<SessionView> {
        let mut guard = self.registry.lock(session_id).await?;
        let session = &mut *guard;

        let step_id = session.sequencer.advance(&session.store)?.id;
        info!(session_id = %session_id, step_id, "Advanced to next step");
        Ok(build_view(session))
    }

    pub async fn on_go_to(&self, session_id: Uuid, step_id: u32) -> Result<SessionView> {
        let mut guard = self.registry.lock(session_id).await?;
        let session = &mut *guard;

        session.sequencer.go_to(step_id, &session.store)?;
        debug!(session_id = %session_id, step_id, "Moved to step");
        Ok(build_view(session))
    }

    pub async fn on_submit(&self, session_id: Uuid) -> Result<SubmissionRecord> {
        let mut guard = self.registry.lock(session_id).await?;
        let session = &mut *guard;

        self.submissions
            .submit(&mut session.sequencer, &session.store)
            .await
    }

    /// Discard every answer and go back to the first step.
    pub async fn on_reset(&self, session_id: Uuid) -> Result<SessionView> {
        let mut session = self.registry.lock(session_id).await?;
        session.store.clear();
        session.sequencer.reset();
        info!(session_id = %session_id, "Session reset");
        Ok(build_view(&session))
    }

    pub async fn progress(&self, session_id: Uuid) -> Result<Progress> {
        let session = self.registry.lock(session_id).await?;
        Ok(progress_of(&session))
    }

    pub async fn template(
        &self,
        session_id: Uuid,
        kind: &str,
    ) -> Result<RenderedTemplate> {
        let template = DocumentTemplate::from_kind(kind)
            .ok_or_else(|| IntakeError::not_found("Template", kind))?;
        let session = self.registry.lock(session_id).await?;
        Ok(RenderedTemplate {
            kind: template,
            title: template.title().to_string(),
            body: template.render(&session.store.snapshot()),
        })
    }

    // ── Stored documents ────────────────────────────────────────────

    pub async fn submissions(&self) -> Result<Vec<SubmissionRecord>> {
        Ok(self.documents.list().await?)
    }

    pub async fn exchanges(&self) -> Result<Vec<AssistExchange>> {
        Ok(self.documents.list_exchanges().await?)
    }

    // ── Assist, reports, risk ───────────────────────────────────────

    /// Ask the assist chat. The exchange is stored only when `record` is set.
    pub async fn assist(&self, query: &str, record: bool) -> Result<AssistExchange> {
        let exchange = self.text_services()?.assist.exchange(query).await?;
        if record {
            self.documents.save_exchange(&exchange).await?;
            debug!(exchange_id = %exchange.id, "Assist exchange recorded");
        }
        Ok(exchange)
    }

    pub async fn case_report(&self, patient_id: &str, notes: &str) -> Result<String> {
        self.text_services()?.reports.generate(patient_id, notes).await
    }

    pub fn predict(&self, features: &Map<String, Value>) -> Result<Prediction> {
        let prediction = self.risk.predict(features)?;
        debug!(
            model = self.risk.name(),
            label = %prediction.label,
            confidence = prediction.confidence,
            "Risk prediction"
        );
        Ok(prediction)
    }

    /// Score a caseload and summarize it, optionally filtered to one level.
    pub fn dashboard(
        &self,
        patients: &[PatientRecord],
        level: Option<&str>,
    ) -> Result<RiskDashboard> {
        let dashboard = RiskDashboard::build(self.risk.as_ref(), patients, level)?;
        debug!(
            model = self.risk.name(),
            patients = dashboard.total,
            high_risk = dashboard.high_risk.len(),
            "Risk dashboard built"
        );
        Ok(dashboard)
    }

    fn text_services(&self) -> Result<&TextServices> {
        self.text.as_ref().ok_or_else(|| {
            ServiceError::RequestFailed {
                service: "text generation".into(),
                reason: "no API key configured".into(),
            }
            .into()
        })
    }
}

// ── View builders ───────────────────────────────────────────────────

fn field_views(step: &Step, session: &IntakeSession) -> Vec<FieldView> {
    step.fields
        .iter()
        .map(|f| {
            let entered = session.store.get(&f.name);
            FieldView {
                field: f.clone(),
                value: session.store.get_or_default(f),
                entered: entered.is_some(),
                issue: entered
                    .and_then(|v| f.validate(Some(v)).err())
                    .map(|e| e.to_string()),
            }
        })
        .collect()
}

fn step_view(step: &Step, session: &IntakeSession) -> StepView {
    let workflow = session.sequencer.workflow();
    StepView {
        id: step.id,
        title: step.title.clone(),
        fields: field_views(step, session),
        can_advance: StepSequencer::is_complete(step, &session.store),
        is_final: workflow.index_of(step.id) == Some(workflow.len() - 1),
    }
}

fn progress_of(session: &IntakeSession) -> Progress {
    let workflow = session.sequencer.workflow();
    let total = workflow.len();
    let completed = workflow
        .steps()
        .iter()
        .filter(|s| StepSequencer::is_complete(s, &session.store))
        .count();

    match session.sequencer.state() {
        SequencerState::Submitted { .. } => Progress {
            completed_steps: total,
            total_steps: total,
            percent: 100,
            status: "Submitted. Awaiting review.".into(),
        },
        SequencerState::Active { step_id } => {
            let position = workflow.index_of(step_id).map(|i| i + 1).unwrap_or(1);
            let percent = if total == 0 {
                0
            } else {
                // Submission is the last stretch, so an active session tops out below 100.
                (completed * 100 / (total + 1)) as u8
            };
            Progress {
                completed_steps: completed,
                total_steps: total,
                percent,
                status: format!("In progress: step {position} of {total}"),
            }
        }
    }
}

fn build_view(session: &IntakeSession) -> SessionView {
    let current_step = session
        .sequencer
        .current_step()
        .ok()
        .map(|step| step_view(step, session));

    SessionView {
        session_id: session.id(),
        workflow: session.sequencer.workflow().name.clone(),
        started_at: session.store.created_at(),
        state: session.sequencer.state(),
        current_step,
        values: session.store.snapshot(),
        progress: progress_of(session),
    }
}
