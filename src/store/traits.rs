//! `DocumentStore` trait: append-only persistence for finished records.

use async_trait::async_trait;
use uuid::Uuid;

use crate::assist::AssistExchange;
use crate::error::DatabaseError;
use crate::intake::SubmissionRecord;

/// Backend-agnostic document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Append a submission. Returns its id.
    async fn save(&self, record: &SubmissionRecord) -> Result<Uuid, DatabaseError>;

    /// All submissions, oldest first.
    async fn list(&self) -> Result<Vec<SubmissionRecord>, DatabaseError>;

    /// Append an assist exchange. Returns its id.
    async fn save_exchange(&self, exchange: &AssistExchange) -> Result<Uuid, DatabaseError>;

    /// All stored assist exchanges, oldest first.
    async fn list_exchanges(&self) -> Result<Vec<AssistExchange>, DatabaseError>;
}
