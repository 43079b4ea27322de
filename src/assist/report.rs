//! Case report drafting for substance-use-disorder case management.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{IntakeError, ValidationError};
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};

/// Sections every generated report must contain, in order.
pub const REPORT_SECTIONS: [&str; 6] = [
    "Patient Overview",
    "Diagnosis",
    "Treatment Plan",
    "Medication Dosage and Instructions (if applicable)",
    "Recommendations and Referrals",
    "Follow-Up Plan",
];

/// Build the report prompt for a patient and their case notes.
pub fn case_report_prompt(patient_id: &str, notes: &str) -> String {
    let sections: String = REPORT_SECTIONS
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {s}\n", i + 1))
        .collect();

    format!(
        "Generate a detailed case report for a Substance Use Disorder (SUD) patient.\n\
         Patient ID: {patient_id}.\n\
         Case notes:\n\
         {notes}\n\
         Include the following sections:\n\
         {sections}\
         Format the report for professional documentation."
    )
}

pub struct CaseReportGenerator {
    llm: Arc<dyn LlmProvider>,
}

impl CaseReportGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// Draft a case report. The patient id is required; notes may be empty.
    pub async fn generate(&self, patient_id: &str, notes: &str) -> Result<String, IntakeError> {
        let patient_id = patient_id.trim();
        if patient_id.is_empty() {
            return Err(ValidationError::EmptyInput(
                "Patient ID is required to generate a report.".into(),
            )
            .into());
        }

        let request = CompletionRequest::new(vec![ChatMessage::user(case_report_prompt(
            patient_id, notes,
        ))]);

        let response = self.llm.complete(request).await.map_err(|e| {
            warn!(patient_id, error = %e, "Case report generation failed");
            IntakeError::from(e)
        })?;

        info!(patient_id, chars = response.content.len(), "Case report generated");
        Ok(response.content)
    }
}
