//! libSQL backend: async `DocumentStore` implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::assist::AssistExchange;
use crate::error::DatabaseError;
use crate::intake::{SessionRecord, SubmissionRecord};
use crate::store::migrations;
use crate::store::traits::DocumentStore;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db)?;
        migrations::run_migrations(backend.conn()).await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let backend = Self::from_database(db)?;
        migrations::run_migrations(backend.conn()).await?;
        Ok(backend)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Fixed-width RFC 3339 so stored timestamps sort and round-trip exactly.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::Serialization(format!("bad timestamp '{s}': {e}")))
}

fn parse_uuid(s: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s).map_err(|e| DatabaseError::Serialization(format!("bad uuid '{s}': {e}")))
}

fn text_column(row: &libsql::Row, idx: i32, ctx: &str) -> Result<String, DatabaseError> {
    row.get::<String>(idx)
        .map_err(|e| DatabaseError::Query(format!("{ctx}: column {idx}: {e}")))
}

/// Column order: id, session_id, workflow, submitted_at, fields
fn row_to_submission(row: &libsql::Row) -> Result<SubmissionRecord, DatabaseError> {
    let id = text_column(row, 0, "submission")?;
    let session_id = text_column(row, 1, "submission")?;
    let workflow = text_column(row, 2, "submission")?;
    let submitted_at = text_column(row, 3, "submission")?;
    let fields = text_column(row, 4, "submission")?;

    let fields: SessionRecord = serde_json::from_str(&fields)
        .map_err(|e| DatabaseError::Serialization(format!("submission fields: {e}")))?;

    Ok(SubmissionRecord {
        id: parse_uuid(&id)?,
        session_id: parse_uuid(&session_id)?,
        workflow,
        submitted_at: parse_datetime(&submitted_at)?,
        fields,
    })
}

/// Column order: id, query, response, issued_at
fn row_to_exchange(row: &libsql::Row) -> Result<AssistExchange, DatabaseError> {
    let id = text_column(row, 0, "exchange")?;
    let query = text_column(row, 1, "exchange")?;
    let response = text_column(row, 2, "exchange")?;
    let issued_at = text_column(row, 3, "exchange")?;

    Ok(AssistExchange {
        id: parse_uuid(&id)?,
        query,
        response,
        issued_at: parse_datetime(&issued_at)?,
    })
}

#[async_trait]
impl DocumentStore for LibSqlBackend {
    async fn save(&self, record: &SubmissionRecord) -> Result<Uuid, DatabaseError> {
        let fields = serde_json::to_string(&record.fields)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;

        self.conn()
            .execute(
                "INSERT INTO submissions (id, session_id, workflow, submitted_at, fields)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.id.to_string(),
                    record.session_id.to_string(),
                    record.workflow.clone(),
                    format_datetime(&record.submitted_at),
                    fields,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("save submission: {e}")))?;

        debug!(id = %record.id, session_id = %record.session_id, "Submission stored");
        Ok(record.id)
    }

    async fn list(&self) -> Result<Vec<SubmissionRecord>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id, session_id, workflow, submitted_at, fields
                 FROM submissions ORDER BY rowid ASC",
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list submissions: {e}")))?;

        let mut records = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list submissions: {e}")))?
        {
            records.push(row_to_submission(&row)?);
        }
        Ok(records)
    }

    async fn save_exchange(&self, exchange: &AssistExchange) -> Result<Uuid, DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO assist_exchanges (id, query, response, issued_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    exchange.id.to_string(),
                    exchange.query.clone(),
                    exchange.response.clone(),
                    format_datetime(&exchange.issued_at),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("save exchange: {e}")))?;

        debug!(id = %exchange.id, "Assist exchange stored");
        Ok(exchange.id)
    }

    async fn list_exchanges(&self) -> Result<Vec<AssistExchange>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id, query, response, issued_at
                 FROM assist_exchanges ORDER BY rowid ASC",
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list exchanges: {e}")))?;

        let mut exchanges = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list exchanges: {e}")))?
        {
            exchanges.push(row_to_exchange(&row)?);
        }
        Ok(exchanges)
    }
}
