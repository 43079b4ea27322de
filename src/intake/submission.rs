//! Submission handler: snapshots a completed workflow and hands it to the
//! document store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::sequencer::StepSequencer;
use super::session::{SessionRecord, SessionStore};
use crate::error::{IntakeError, ValidationError};
use crate::store::DocumentStore;

/// An immutable, finalized snapshot of a completed workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub id: Uuid,
    pub session_id: Uuid,
    pub workflow: String,
    pub submitted_at: DateTime<Utc>,
    pub fields: SessionRecord,
}

/// Builds submission records and persists them.
pub struct SubmissionHandler {
    store: Arc<dyn DocumentStore>,
}

impl SubmissionHandler {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Validate every step, persist a snapshot, and move the sequencer to
    /// `Submitted`. On any failure the sequencer and store are untouched.
    pub async fn submit(
        &self,
        sequencer: &mut StepSequencer,
        session: &SessionStore,
    ) -> Result<SubmissionRecord, IntakeError> {
        let incomplete: Vec<String> = sequencer
            .incomplete_steps(session)
            .iter()
            .map(|s| s.title.clone())
            .collect();
        if !incomplete.is_empty() {
            info!(
                session_id = %session.id(),
                incomplete = ?incomplete,
                "Submission rejected: incomplete steps"
            );
            return Err(ValidationError::IncompleteSteps { steps: incomplete }.into());
        }

        let record = SubmissionRecord {
            id: Uuid::new_v4(),
            session_id: session.id(),
            workflow: sequencer.workflow().name.clone(),
            submitted_at: sequencer.next_submission_time(),
            fields: session.snapshot(),
        };

        let saved_id = self.store.save(&record).await.map_err(|e| {
            warn!(session_id = %session.id(), error = %e, "Failed to persist submission");
            IntakeError::from(e)
        })?;

        sequencer.mark_submitted(record.submitted_at);
        info!(
            session_id = %session.id(),
            submission_id = %saved_id,
            fields = record.fields.len(),
            "Application submitted"
        );
        Ok(record)
    }
}
