//! The Medicaid enrollment workflow.

use super::field::{Field, FieldValue, Rule};
use super::step::Workflow;
use crate::error::IntakeError;

pub const MEDICAID_ENROLLMENT: &str = "Medicaid Enrollment";

pub const EMPLOYMENT_OPTIONS: &[&str] = &["Employed", "Unemployed", "Self-Employed"];
pub const INSURANCE_OPTIONS: &[&str] = &["Yes", "No"];
pub const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "png", "jpg", "jpeg"];

/// Three-step Medicaid application: personal, financial, additional details.
pub fn medicaid_enrollment() -> Result<Workflow, IntakeError> {
    Workflow::builder(MEDICAID_ENROLLMENT)
        .step(
            "Personal Information",
            vec![
                Field::text("full_name", "Full Name").required(),
                Field::date("dob", "Date of Birth")
                    .required()
                    .with_rule(Rule::NotInFuture),
                Field::text("address", "Current Address")
                    .required()
                    .with_help("Type 'No Fixed Address' if you don't have one."),
            ],
        )
        .step(
            "Financial Information",
            vec![
                Field::number("income", "Monthly Income ($)")
                    .required()
                    .with_rule(Rule::Min { value: 0.0 })
                    .with_default(FieldValue::Number(0.0)),
                Field::single_choice("employment_status", "Employment Status", EMPLOYMENT_OPTIONS)
                    .required(),
            ],
        )
        .step(
            "Additional Information",
            vec![
                Field::number("household_size", "Number of People in Household")
                    .required()
                    .with_rule(Rule::Min { value: 1.0 })
                    .with_rule(Rule::Integer)
                    .with_default(FieldValue::Number(1.0)),
                Field::text(
                    "health_conditions",
                    "Describe any medical conditions (if applicable)",
                )
                .with_rule(Rule::MaxLength { chars: 2000 }),
                Field::single_choice(
                    "insurance_status",
                    "Do you currently have health insurance?",
                    INSURANCE_OPTIONS,
                )
                .required(),
                Field::file(
                    "documents",
                    "Upload your ID or proof of eligibility (PDF, PNG, JPG)",
                    DOCUMENT_EXTENSIONS,
                ),
            ],
        )
        .build()
}
