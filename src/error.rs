//! Error types for Anchor Intake.

use uuid::Uuid;

/// Top-level error type for the intake core.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Feature mismatch: {0}")]
    FeatureMismatch(#[from] FeatureMismatchError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Invalid workflow definition: {0}")]
    Definition(String),
}

impl IntakeError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn session_not_found(id: Uuid) -> Self {
        Self::not_found("Session", id)
    }

    /// Short machine-readable kind, used as the `error` key in API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Service(_) => "service",
            Self::FeatureMismatch(_) => "feature_mismatch",
            Self::NotFound { .. } => "not_found",
            Self::InvalidState(_) => "invalid_state",
            Self::Database(_) => "database",
            Self::Definition(_) => "definition",
        }
    }

    /// Message safe to show the person filling in the form.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(e) => e.to_string(),
            Self::Service(_) => {
                "Sorry, I couldn't process your request. Please try again later.".to_string()
            }
            Self::FeatureMismatch(e) => {
                format!("A prediction could not be made: {e}")
            }
            Self::NotFound { entity, .. } => format!("{entity} not found."),
            Self::InvalidState(reason) => reason.clone(),
            Self::Database(_) => {
                "Your information could not be saved. Please try submitting again.".to_string()
            }
            Self::Definition(_) => {
                "The application is misconfigured. Please contact support.".to_string()
            }
        }
    }
}

/// A required field is missing, or a value does not satisfy its field's rules.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Please complete: {}", .steps.join(", "))]
    IncompleteSteps { steps: Vec<String> },

    #[error("{0}")]
    EmptyInput(String),

    #[error("Request body is not valid: {0}")]
    MalformedBody(String),
}

impl ValidationError {
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// External service (text generation, speech) failures.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Service {service} request failed: {reason}")]
    RequestFailed { service: String, reason: String },

    #[error("Invalid response from {service}: {reason}")]
    InvalidResponse { service: String, reason: String },

    #[error("Authentication failed for {service}")]
    AuthFailed { service: String },

    #[error("Service {service} rate limited")]
    RateLimited { service: String },
}

/// Risk Model input does not match the model's feature schema.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FeatureMismatchError {
    #[error("missing feature '{0}'")]
    Missing(String),

    #[error("unexpected feature '{0}'")]
    Unexpected(String),

    #[error("feature '{name}' expected {expected}")]
    WrongType { name: String, expected: String },

    #[error("feature '{name}' has unknown category '{value}'")]
    UnknownCategory { name: String, value: String },

    #[error("feature '{name}' value {value} outside {min}..={max}")]
    OutOfRange {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Document store errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Configuration errors. These surface at startup, before any request.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Result type alias for the intake core.
pub type Result<T> = std::result::Result<T, IntakeError>;
