//! LLM integration for Anchor Intake.
//!
//! The Text Generation Service is reached through the `LlmProvider` trait.
//! The only concrete backend is Google Gemini over its REST API.

pub mod gemini;
pub mod provider;

pub use gemini::GeminiProvider;
pub use provider::*;

use std::sync::Arc;

use secrecy::SecretString;

/// Supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Gemini,
}

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub api_key: SecretString,
    pub model: String,
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Arc<dyn LlmProvider> {
    match config.backend {
        LlmBackend::Gemini => {
            tracing::info!("Using Gemini (model: {})", config.model);
            Arc::new(GeminiProvider::new(config.api_key.clone(), &config.model))
        }
    }
}
