//! Step sequencer: tracks which step of the workflow is active.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::session::SessionStore;
use super::step::{Step, Workflow};
use crate::error::{IntakeError, ValidationError};

/// Where a session is in the workflow.
///
/// Progresses linearly through the steps; `Submitted` is terminal and only
/// reachable through the submission handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SequencerState {
    Active { step_id: u32 },
    Submitted { at: DateTime<Utc> },
}

impl SequencerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Submitted { .. })
    }
}

impl std::fmt::Display for SequencerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active { step_id } => write!(f, "step {step_id}"),
            Self::Submitted { .. } => write!(f, "submitted"),
        }
    }
}

/// Active-step pointer over an immutable workflow.
#[derive(Debug, Clone)]
pub struct StepSequencer {
    workflow: Arc<Workflow>,
    index: usize,
    submitted_at: Option<DateTime<Utc>>,
}

impl StepSequencer {
    pub fn new(workflow: Arc<Workflow>) -> Self {
        Self {
            workflow,
            index: 0,
            submitted_at: None,
        }
    }

    pub fn workflow(&self) -> &Arc<Workflow> {
        &self.workflow
    }

    pub fn state(&self) -> SequencerState {
        match self.submitted_at {
            Some(at) => SequencerState::Submitted { at },
            None => SequencerState::Active {
                step_id: self.workflow.steps()[self.index].id,
            },
        }
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted_at.is_some()
    }

    pub fn current_step(&self) -> Result<&Step, IntakeError> {
        if self.is_submitted() {
            return Err(IntakeError::InvalidState(
                "The application has already been submitted.".into(),
            ));
        }
        Ok(&self.workflow.steps()[self.index])
    }

    /// Every field problem in `step`, in declaration order.
    pub fn issues(step: &Step, store: &SessionStore) -> Vec<ValidationError> {
        step.fields
            .iter()
            .filter_map(|f| f.validate(store.get(&f.name)).err())
            .collect()
    }

    pub fn is_complete(step: &Step, store: &SessionStore) -> bool {
        step.fields.iter().all(|f| f.validate(store.get(&f.name)).is_ok())
    }

    /// Steps that still block submission.
    pub fn incomplete_steps<'a>(&'a self, store: &SessionStore) -> Vec<&'a Step> {
        self.workflow
            .steps()
            .iter()
            .filter(|s| !Self::is_complete(s, store))
            .collect()
    }

    /// Whether the current step's fields all validate.
    pub fn can_advance(&self, store: &SessionStore) -> bool {
        match self.current_step() {
            Ok(step) => Self::is_complete(step, store),
            Err(_) => false,
        }
    }

    /// Move to the next step. The final step is left only by submitting.
    pub fn advance(&mut self, store: &SessionStore) -> Result<&Step, IntakeError> {
        let step = self.current_step()?;
        if !Self::is_complete(step, store) {
            return Err(IntakeError::InvalidState(format!(
                "Complete '{}' before continuing.",
                step.title
            )));
        }
        if self.index + 1 >= self.workflow.len() {
            return Err(IntakeError::InvalidState(format!(
                "'{}' is the final step; submit the application instead.",
                step.title
            )));
        }
        self.index += 1;
        Ok(&self.workflow.steps()[self.index])
    }

    /// Jump to a step. Going back is always allowed; going forward only when
    /// every step before the target is complete.
    pub fn go_to(&mut self, step_id: u32, store: &SessionStore) -> Result<&Step, IntakeError> {
        let target = self
            .workflow
            .index_of(step_id)
            .ok_or_else(|| IntakeError::not_found("Step", step_id))?;
        if self.is_submitted() {
            return Err(IntakeError::InvalidState(
                "The application has already been submitted.".into(),
            ));
        }
        if target > self.index {
            if let Some(blocking) = self.workflow.steps()[..target]
                .iter()
                .find(|s| !Self::is_complete(s, store))
            {
                return Err(IntakeError::InvalidState(format!(
                    "Complete '{}' before moving ahead.",
                    blocking.title
                )));
            }
        }
        self.index = target;
        Ok(&self.workflow.steps()[self.index])
    }

    /// Timestamp for the next submission: now, but strictly after the previous one.
    pub(crate) fn next_submission_time(&self) -> DateTime<Utc> {
        let now = Utc::now();
        match self.submitted_at {
            Some(previous) if now <= previous => previous + Duration::microseconds(1),
            _ => now,
        }
    }

    pub(crate) fn mark_submitted(&mut self, at: DateTime<Utc>) {
        self.submitted_at = Some(at);
    }

    /// Back to the first step, forgetting any submission.
    pub fn reset(&mut self) {
        self.index = 0;
        self.submitted_at = None;
    }
}
