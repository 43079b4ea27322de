//! Anchor Intake: multi-step Medicaid intake with conversational assist.

pub mod assist;
pub mod config;
pub mod error;
pub mod intake;
pub mod llm;
pub mod risk;
pub mod store;
