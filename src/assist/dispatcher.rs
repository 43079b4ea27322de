//! Assist dispatcher: forwards free-text questions to the text generation
//! service. No retry, no cache, no conversation history.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{IntakeError, ValidationError};
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};

/// One question/answer pair. Persisted only when the caller asks for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistExchange {
    pub id: Uuid,
    pub query: String,
    pub response: String,
    pub issued_at: DateTime<Utc>,
}

pub struct AssistDispatcher {
    llm: Arc<dyn LlmProvider>,
    preamble: Option<String>,
}

impl AssistDispatcher {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            preamble: None,
        }
    }

    /// Send this text as the system instruction with every query.
    /// A blank preamble sends none.
    pub fn with_preamble(mut self, preamble: Option<String>) -> Self {
        self.preamble = preamble.filter(|p| !p.trim().is_empty());
        self
    }

    /// Ask the service a question. The query is forwarded verbatim.
    pub async fn ask(&self, query: &str) -> Result<String, IntakeError> {
        if query.trim().is_empty() {
            return Err(ValidationError::EmptyInput("Please enter a question.".into()).into());
        }

        let mut messages = Vec::with_capacity(2);
        if let Some(preamble) = &self.preamble {
            messages.push(ChatMessage::system(preamble.as_str()));
        }
        messages.push(ChatMessage::user(query));

        debug!(model = self.llm.model_name(), chars = query.len(), "Dispatching assist query");
        let response = self
            .llm
            .complete(CompletionRequest::new(messages))
            .await
            .map_err(|e| {
                warn!(model = self.llm.model_name(), error = %e, "Assist query failed");
                IntakeError::from(e)
            })?;

        Ok(response.content)
    }

    /// `ask`, wrapped with an id and timestamp.
    pub async fn exchange(&self, query: &str) -> Result<AssistExchange, IntakeError> {
        let response = self.ask(query).await?;
        Ok(AssistExchange {
            id: Uuid::new_v4(),
            query: query.to_string(),
            response,
            issued_at: Utc::now(),
        })
    }
}
