//! Multi-step intake workflow.
//!
//! A [`Workflow`] of [`Step`]s, each declaring its [`Field`]s, is built once at
//! startup. Every session pairs a [`SessionStore`] of answers with a
//! [`StepSequencer`] pointing at the active step; the [`IntakeManager`] turns
//! presentation events into operations on them and hands completed
//! applications to the document store.

pub mod catalog;
pub mod field;
pub mod manager;
pub mod registry;
pub mod routes;
pub mod sequencer;
pub mod session;
pub mod step;
pub mod submission;

pub use catalog::medicaid_enrollment;
pub use field::{Field, FieldValue, FileRef, Rule, SemanticType, TextPattern};
pub use manager::{FieldChange, FieldView, IntakeManager, Progress, SessionView, StepView};
pub use registry::{IntakeSession, SessionRegistry, spawn_sweep_task};
pub use routes::intake_routes;
pub use sequencer::{SequencerState, StepSequencer};
pub use session::{SessionRecord, SessionStore};
pub use step::{Step, Workflow};
pub use submission::{SubmissionHandler, SubmissionRecord};
