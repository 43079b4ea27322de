//! REST endpoints for the intake workflow, assist chat, reports and risk.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Path, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;
use uuid::Uuid;

use super::manager::IntakeManager;
use crate::assist::{COMPLIANCE_REMINDER, FAQ, REQUIRED_DOCUMENTS};
use crate::error::{IntakeError, ValidationError};
use crate::risk::PatientRecord;

/// Shared state for intake routes.
#[derive(Clone)]
pub struct IntakeRouteState {
    pub manager: Arc<IntakeManager>,
}

impl IntakeError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::FeatureMismatch(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Service(_) => StatusCode::BAD_GATEWAY,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::InvalidState(_) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Definition(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for IntakeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() || status == StatusCode::BAD_GATEWAY {
            warn!(error = %self, "Request failed");
        }
        (
            status,
            Json(serde_json::json!({
                "error": self.kind(),
                "message": self.user_message(),
            })),
        )
            .into_response()
    }
}

impl From<JsonRejection> for IntakeError {
    fn from(rejection: JsonRejection) -> Self {
        ValidationError::MalformedBody(rejection.body_text()).into()
    }
}

/// `Json` whose rejections use the `{error, message}` body of every other failure.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = IntakeError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

type ApiResult<T> = Result<Json<T>, IntakeError>;

fn session_id(raw: &str) -> Result<Uuid, IntakeError> {
    Uuid::parse_str(raw).map_err(|_| IntakeError::not_found("Session", raw))
}

fn step_id(raw: &str) -> Result<u32, IntakeError> {
    raw.parse().map_err(|_| IntakeError::not_found("Step", raw))
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "anchor-intake"
    }))
}

// ── Sessions ────────────────────────────────────────────────────────────

async fn create_session(State(state): State<IntakeRouteState>) -> impl IntoResponse {
    let view = state.manager.create_session().await;
    (StatusCode::CREATED, Json(view))
}

async fn get_session(
    State(state): State<IntakeRouteState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, IntakeError> {
    Ok(Json(state.manager.view(session_id(&id)?).await?))
}

async fn end_session(
    State(state): State<IntakeRouteState>,
    Path(id): Path<String>,
) -> Result<StatusCode, IntakeError> {
    state.manager.end_session(session_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct FieldChangeBody {
    #[serde(default)]
    value: Value,
}

async fn change_field(
    State(state): State<IntakeRouteState>,
    Path((id, name)): Path<(String, String)>,
    ApiJson(body): ApiJson<FieldChangeBody>,
) -> Result<impl IntoResponse, IntakeError> {
    let change = state
        .manager
        .on_field_change(session_id(&id)?, &name, &body.value)
        .await?;
    Ok(Json(change))
}

async fn advance(
    State(state): State<IntakeRouteState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, IntakeError> {
    Ok(Json(state.manager.on_advance(session_id(&id)?).await?))
}

async fn go_to_step(
    State(state): State<IntakeRouteState>,
    Path((id, step)): Path<(String, String)>,
) -> Result<impl IntoResponse, IntakeError> {
    Ok(Json(
        state
            .manager
            .on_go_to(session_id(&id)?, step_id(&step)?)
            .await?,
    ))
}

async fn submit(
    State(state): State<IntakeRouteState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, IntakeError> {
    let record = state.manager.on_submit(session_id(&id)?).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn reset(
    State(state): State<IntakeRouteState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, IntakeError> {
    Ok(Json(state.manager.on_reset(session_id(&id)?).await?))
}

async fn render_template(
    State(state): State<IntakeRouteState>,
    Path((id, kind)): Path<(String, String)>,
) -> Result<impl IntoResponse, IntakeError> {
    Ok(Json(state.manager.template(session_id(&id)?, &kind).await?))
}

// ── Documents ───────────────────────────────────────────────────────────

async fn list_submissions(
    State(state): State<IntakeRouteState>,
) -> Result<impl IntoResponse, IntakeError> {
    Ok(Json(state.manager.submissions().await?))
}

async fn required_documents() -> impl IntoResponse {
    Json(REQUIRED_DOCUMENTS)
}

async fn faq() -> impl IntoResponse {
    Json(serde_json::json!({
        "entries": FAQ,
        "reminder": COMPLIANCE_REMINDER,
    }))
}

// ── Assist, reports, risk ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct AssistBody {
    #[serde(default)]
    query: String,
    #[serde(default)]
    record: bool,
}

async fn assist(
    State(state): State<IntakeRouteState>,
    ApiJson(body): ApiJson<AssistBody>,
) -> Result<impl IntoResponse, IntakeError> {
    Ok(Json(state.manager.assist(&body.query, body.record).await?))
}

#[derive(Debug, Deserialize)]
struct PredictBody {
    features: Map<String, Value>,
}

async fn predict(
    State(state): State<IntakeRouteState>,
    ApiJson(body): ApiJson<PredictBody>,
) -> Result<impl IntoResponse, IntakeError> {
    Ok(Json(state.manager.predict(&body.features)?))
}

#[derive(Debug, Deserialize)]
struct DashboardBody {
    patients: Vec<PatientRecord>,
    #[serde(default)]
    level: Option<String>,
}

async fn dashboard(
    State(state): State<IntakeRouteState>,
    ApiJson(body): ApiJson<DashboardBody>,
) -> Result<impl IntoResponse, IntakeError> {
    Ok(Json(
        state
            .manager
            .dashboard(&body.patients, body.level.as_deref())?,
    ))
}

#[derive(Debug, Deserialize)]
struct CaseReportBody {
    patient_id: String,
    #[serde(default)]
    notes: String,
}

async fn case_report(
    State(state): State<IntakeRouteState>,
    ApiJson(body): ApiJson<CaseReportBody>,
) -> ApiResult<Value> {
    let report = state
        .manager
        .case_report(&body.patient_id, &body.notes)
        .await?;
    Ok(Json(serde_json::json!({
        "patient_id": body.patient_id.trim(),
        "report": report,
    })))
}

/// Build the intake REST routes.
pub fn intake_routes(manager: Arc<IntakeManager>) -> Router {
    let state = IntakeRouteState { manager };

    Router::new()
        .route("/health", get(health))
        .route("/api/intake/sessions", post(create_session))
        .route("/api/intake/sessions/{id}", get(get_session).delete(end_session))
        .route("/api/intake/sessions/{id}/fields/{name}", put(change_field))
        .route("/api/intake/sessions/{id}/advance", post(advance))
        .route("/api/intake/sessions/{id}/steps/{step_id}", post(go_to_step))
        .route("/api/intake/sessions/{id}/submit", post(submit))
        .route("/api/intake/sessions/{id}/reset", post(reset))
        .route("/api/intake/sessions/{id}/templates/{kind}", get(render_template))
        .route("/api/intake/submissions", get(list_submissions))
        .route("/api/intake/documents", get(required_documents))
        .route("/api/intake/faq", get(faq))
        .route("/api/assist", post(assist))
        .route("/api/risk/predict", post(predict))
        .route("/api/risk/dashboard", post(dashboard))
        .route("/api/reports/case", post(case_report))
        .with_state(state)
}
