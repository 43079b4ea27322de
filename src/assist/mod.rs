//! Text-generation features: the assist chat, case report drafting, document
//! templates and help content.

pub mod dispatcher;
pub mod report;
pub mod templates;

pub use dispatcher::{AssistDispatcher, AssistExchange};
pub use report::CaseReportGenerator;
pub use templates::{
    COMPLIANCE_REMINDER, DocumentTemplate, FAQ, FaqEntry, REQUIRED_DOCUMENTS, RequiredDocument,
};
