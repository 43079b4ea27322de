//! Integration tests for the intake REST API.
//!
//! Each test spins up an Axum server on a random port backed by an in-memory
//! database and a stub text-generation provider, then drives it with reqwest.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;

use anchor_intake::error::ServiceError;
use anchor_intake::intake::{IntakeManager, Workflow, intake_routes, medicaid_enrollment};
use anchor_intake::intake::field::{Field, Rule};
use anchor_intake::llm::{CompletionRequest, CompletionResponse, FinishReason, LlmProvider};
use anchor_intake::store::LibSqlBackend;

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Stub LLM provider for integration tests (no real API calls).
struct StubLlm {
    calls: AtomicUsize,
}

#[async_trait]
impl LlmProvider for StubLlm {
    fn model_name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let question = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Ok(CompletionResponse {
            content: format!("stub answer to: {question}"),
            input_tokens: 0,
            output_tokens: 0,
            finish_reason: FinishReason::Stop,
        })
    }
}

struct TestServer {
    base: String,
    client: reqwest::Client,
    llm: Arc<StubLlm>,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let resp = self.client.post(self.url(path)).json(&body).send().await.unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    async fn put(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let resp = self.client.put(self.url(path)).json(&body).send().await.unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    async fn new_session(&self) -> String {
        let (status, body) = self.post("/api/intake/sessions", json!({})).await;
        assert_eq!(status, StatusCode::CREATED);
        body["session_id"].as_str().unwrap().to_string()
    }

    async fn set(&self, session: &str, field: &str, value: Value) -> (StatusCode, Value) {
        self.put(
            &format!("/api/intake/sessions/{session}/fields/{field}"),
            json!({ "value": value }),
        )
        .await
    }
}

/// Start an Axum server on a random port for the given workflow.
async fn start_server_with(workflow: Workflow) -> TestServer {
    let db = Arc::new(LibSqlBackend::new_memory().await.unwrap());
    let llm = Arc::new(StubLlm {
        calls: AtomicUsize::new(0),
    });
    let manager = IntakeManager::new(Arc::new(workflow), db, Duration::from_secs(600))
        .with_llm(llm.clone(), Some("You help with Medicaid enrollment.".into()));
    let app = intake_routes(Arc::new(manager));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestServer {
        base: format!("http://127.0.0.1:{port}"),
        client: reqwest::Client::new(),
        llm,
    }
}

async fn start_server() -> TestServer {
    start_server_with(medicaid_enrollment().unwrap()).await
}

fn two_step_workflow() -> Workflow {
    Workflow::builder("two-step")
        .step(
            "Personal",
            vec![
                Field::text("name", "Name").required(),
                Field::date("dob", "Date of Birth").required(),
            ],
        )
        .step(
            "Financial",
            vec![Field::number("income", "Income")
                .required()
                .with_rule(Rule::Min { value: 0.0 })],
        )
        .build()
        .unwrap()
}

// ── Workflow ─────────────────────────────────────────────────────────

#[tokio::test]
async fn health_reports_ok() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        let (status, body) = server.get("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn two_step_scenario_submits_once_complete() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server_with(two_step_workflow()).await;
        let id = server.new_session().await;

        // Advancing with nothing entered is refused.
        let (status, body) = server.post(&format!("/api/intake/sessions/{id}/advance"), json!({})).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "invalid_state");

        server.set(&id, "name", json!("Jane")).await;
        let (status, body) = server.set(&id, "dob", json!("1990-01-01")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["can_advance"], true);

        let (status, body) = server.post(&format!("/api/intake/sessions/{id}/advance"), json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"]["step_id"], 2);
        assert_eq!(body["current_step"]["is_final"], true);

        // A negative income is stored but blocks submission.
        let (status, body) = server.set(&id, "income", json!(-1)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["issue"].is_string());
        let (status, body) = server.post(&format!("/api/intake/sessions/{id}/submit"), json!({})).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["message"], "Please complete: Financial");

        server.set(&id, "income", json!(1200)).await;
        let (status, record) = server.post(&format!("/api/intake/sessions/{id}/submit"), json!({})).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(record["session_id"], id.as_str());
        assert_eq!(record["fields"]["income"]["value"], 1200.0);

        // Submitted is terminal for advancing.
        let (status, _) = server.post(&format!("/api/intake/sessions/{id}/advance"), json!({})).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, list) = server.get("/api/intake/submissions").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn double_submit_creates_two_records() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server_with(two_step_workflow()).await;
        let id = server.new_session().await;
        server.set(&id, "name", json!("Jane")).await;
        server.set(&id, "dob", json!("1990-01-01")).await;
        server.set(&id, "income", json!(0)).await;

        let (_, first) = server.post(&format!("/api/intake/sessions/{id}/submit"), json!({})).await;
        let (status, second) = server.post(&format!("/api/intake/sessions/{id}/submit"), json!({})).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(first["fields"], second["fields"]);
        assert_ne!(first["submitted_at"], second["submitted_at"]);

        let (_, list) = server.get("/api/intake/submissions").await;
        assert_eq!(list.as_array().unwrap().len(), 2);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn medicaid_session_renders_first_step() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        let id = server.new_session().await;

        let (status, view) = server.get(&format!("/api/intake/sessions/{id}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["workflow"], "Medicaid Enrollment");
        assert_eq!(view["current_step"]["title"], "Personal Information");
        let names: Vec<&str> = view["current_step"]["fields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["full_name", "dob", "address"]);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn invalid_choice_is_rejected_without_storing() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        let id = server.new_session().await;

        let (status, body) = server.set(&id, "employment_status", json!("Retired")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "validation");

        let (_, view) = server.get(&format!("/api/intake/sessions/{id}")).await;
        assert!(view["values"].get("employment_status").is_none());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn go_to_and_reset() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        let id = server.new_session().await;

        let (status, _) = server.post(&format!("/api/intake/sessions/{id}/steps/2"), json!({})).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let (status, body) = server.post(&format!("/api/intake/sessions/{id}/steps/7"), json!({})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");

        server.set(&id, "full_name", json!("Jane Doe")).await;
        let (status, view) = server.post(&format!("/api/intake/sessions/{id}/reset"), json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["values"], json!({}));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn unknown_and_ended_sessions_are_not_found() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;

        let (status, _) = server.get("/api/intake/sessions/not-a-uuid").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let id = server.new_session().await;
        let resp = server
            .client
            .delete(server.url(&format!("/api/intake/sessions/{id}")))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let (status, _) = server.get(&format!("/api/intake/sessions/{id}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn malformed_requests_get_json_errors() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        let id = server.new_session().await;

        let (status, body) = server.post("/api/assist", json!({})).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "validation");
        assert_eq!(server.llm.calls.load(Ordering::SeqCst), 0);

        let resp = server
            .client
            .put(server.url(&format!("/api/intake/sessions/{id}/fields/full_name")))
            .body("Jane Doe")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "validation");
        assert!(body["message"].as_str().unwrap().contains("Content-Type"));

        let (status, body) = server.post("/api/risk/predict", json!({"features": 5})).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "validation");

        let (status, body) = server
            .post(&format!("/api/intake/sessions/{id}/steps/abc"), json!({}))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
        assert_eq!(body["message"], "Step not found.");

        let (_, view) = server.get(&format!("/api/intake/sessions/{id}")).await;
        assert_eq!(view["values"], json!({}));
    })
    .await
    .expect("test timed out");
}

// ── Documents ────────────────────────────────────────────────────────

#[tokio::test]
async fn templates_and_checklist() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        let id = server.new_session().await;
        server.set(&id, "full_name", json!("Jane Doe")).await;

        let (status, body) = server
            .get(&format!("/api/intake/sessions/{id}/templates/address_waiver"))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Address Waiver Letter");
        assert!(body["body"].as_str().unwrap().ends_with("Jane Doe"));

        let (status, docs) = server.get("/api/intake/documents").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(docs[0]["title"], "Proof of Identity");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn faq_carries_compliance_reminder() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;

        let (status, body) = server.get("/api/intake/faq").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["entries"].as_array().unwrap().len(), 4);
        assert_eq!(body["entries"][0]["question"], "What is Medicaid?");
        assert_eq!(
            body["reminder"],
            "Ensure that all uploaded documents are accurate to avoid delays."
        );
    })
    .await
    .expect("test timed out");
}

// ── Assist, reports, risk ────────────────────────────────────────────

#[tokio::test]
async fn empty_assist_query_never_reaches_service() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;

        let (status, body) = server.post("/api/assist", json!({"query": "   "})).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "validation");
        assert_eq!(server.llm.calls.load(Ordering::SeqCst), 0);

        let (status, body) = server
            .post("/api/assist", json!({"query": "What is Medicaid?"}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "stub answer to: What is Medicaid?");
        assert_eq!(server.llm.calls.load(Ordering::SeqCst), 1);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn case_report_requires_patient_id() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;

        let (status, _) = server
            .post("/api/reports/case", json!({"patient_id": "", "notes": "doing well"}))
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(server.llm.calls.load(Ordering::SeqCst), 0);

        let (status, body) = server
            .post("/api/reports/case", json!({"patient_id": "PID12345", "notes": "doing well"}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["patient_id"], "PID12345");
        assert!(body["report"].as_str().unwrap().contains("Follow-Up Plan"));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn risk_prediction_and_feature_mismatch() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        let mut features = json!({
            "age": 34,
            "gender": "Male",
            "substance_type": "Cocaine",
            "treatment_type": "Detox",
            "support_system": "Strong",
            "treatment_outcome": "Recovered",
        });

        let (status, body) = server
            .post("/api/risk/predict", json!({ "features": features.clone() }))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["label"], "High");
        assert_eq!(body["confidence"], 0.85);

        features.as_object_mut().unwrap().remove("support_system");
        let (status, body) = server
            .post("/api/risk/predict", json!({ "features": features }))
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "feature_mismatch");
        assert!(body.get("label").is_none());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn risk_dashboard_summarizes_caseload() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        let patient = |id: &str, substance: &str, outcome: &str| {
            json!({
                "patient_id": id,
                "features": {
                    "age": 29,
                    "gender": "Female",
                    "substance_type": substance,
                    "treatment_type": "Residential Rehab",
                    "support_system": "Strong",
                    "treatment_outcome": outcome,
                }
            })
        };
        let patients = json!([
            patient("PID1", "Methamphetamine", "Recovered"),
            patient("PID2", "Cannabis", "Recovered"),
            patient("PID3", "Alcohol", "Ongoing"),
        ]);

        let (status, body) = server
            .post("/api/risk/dashboard", json!({ "patients": patients, "level": "Low" }))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 3);
        assert_eq!(body["distribution"], json!({"High": 2, "Low": 1}));
        assert_eq!(body["high_risk"][0]["patient_id"], "PID1");
        assert_eq!(body["high_risk"][1]["substance_type"], "Alcohol");
        assert_eq!(body["filtered"][0]["patient_id"], "PID2");

        let (status, body) = server
            .post(
                "/api/risk/dashboard",
                json!({ "patients": [{"patient_id": "PID9", "features": {}}] }),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "validation");
        assert!(body["message"].as_str().unwrap().starts_with("patient PID9"));
    })
    .await
    .expect("test timed out");
}
