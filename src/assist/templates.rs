//! Letter templates, the required-documents checklist of the document hub,
//! and the help page's frequently asked questions.

use serde::{Deserialize, Serialize};

use crate::intake::SessionRecord;

/// A document the applicant should prepare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RequiredDocument {
    pub title: &'static str,
    pub examples: &'static str,
    /// Only needed in some cases.
    pub conditional: bool,
}

pub const REQUIRED_DOCUMENTS: &[RequiredDocument] = &[
    RequiredDocument {
        title: "Proof of Identity",
        examples: "Government-issued photo ID, birth certificate, or Social Security card.",
        conditional: false,
    },
    RequiredDocument {
        title: "Proof of Citizenship or Immigration Status",
        examples: "U.S. birth certificate, naturalization certificate, or green card.",
        conditional: false,
    },
    RequiredDocument {
        title: "Proof of Residency",
        examples: "Utility bill, lease agreement, or shelter address letter.",
        conditional: false,
    },
    RequiredDocument {
        title: "Proof of Income",
        examples: "Pay stubs, tax returns, employer letter, or self-employment records.",
        conditional: false,
    },
    RequiredDocument {
        title: "Health Insurance Information",
        examples: "Insurance card (if applicable).",
        conditional: true,
    },
    RequiredDocument {
        title: "Proof of Resources",
        examples: "Bank statements, property ownership documents, or retirement accounts.",
        conditional: true,
    },
    RequiredDocument {
        title: "Medical Necessity Documents",
        examples: "Physician's statement, medical records, or hospital bills.",
        conditional: true,
    },
];

/// Shown wherever documents are uploaded.
pub const COMPLIANCE_REMINDER: &str =
    "Ensure that all uploaded documents are accurate to avoid delays.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FaqEntry {
    pub question: &'static str,
    pub answer: &'static str,
}

pub const FAQ: &[FaqEntry] = &[
    FaqEntry {
        question: "What is Medicaid?",
        answer: "Medicaid is a healthcare program for individuals in need.",
    },
    FaqEntry {
        question: "What documents do I need?",
        answer: "Refer to the Document Hub for a complete list.",
    },
    FaqEntry {
        question: "Is my data secure?",
        answer: "Yes, your data is encrypted and complies with HIPAA regulations.",
    },
    FaqEntry {
        question: "Who can I contact for help?",
        answer: "Email support@medicaidassist.com or call (555) 123-4567.",
    },
];

const NAME_PLACEHOLDER: &str = "[Your Name]";
const AMOUNT_PLACEHOLDER: &str = "[amount]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentTemplate {
    AddressWaiver,
    IncomeVerification,
}

impl DocumentTemplate {
    pub fn title(&self) -> &'static str {
        match self {
            Self::AddressWaiver => "Address Waiver Letter",
            Self::IncomeVerification => "Income Verification Letter",
        }
    }

    /// Parse the snake_case kind used in URLs.
    pub fn from_kind(kind: &str) -> Option<Self> {
        match kind {
            "address_waiver" => Some(Self::AddressWaiver),
            "income_verification" => Some(Self::IncomeVerification),
            _ => None,
        }
    }

    /// Render the letter, filling in `full_name` and `income` from the
    /// record when present. Missing answers keep their bracketed placeholder.
    pub fn render(&self, record: &SessionRecord) -> String {
        let name = answer(record, "full_name").unwrap_or_else(|| NAME_PLACEHOLDER.to_string());

        let body = match self {
            Self::AddressWaiver => "I currently do not have a fixed address. Please accept this \
                                    letter as a declaration of my living situation."
                .to_string(),
            Self::IncomeVerification => {
                let amount =
                    answer(record, "income").unwrap_or_else(|| AMOUNT_PLACEHOLDER.to_string());
                format!(
                    "I currently earn an informal income of approximately ${amount} per month. \
                     Please accept this letter as verification of my income."
                )
            }
        };

        format!("To whom it may concern:\n\n{body}\n\nSincerely,\n{name}")
    }
}

fn answer(record: &SessionRecord, name: &str) -> Option<String> {
    record
        .get(name)
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string().trim().to_string())
}
