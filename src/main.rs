use std::sync::Arc;

use anyhow::Context;
use axum::http::{Method, header};
use tower_http::cors::{Any, CorsLayer};

use anchor_intake::config::IntakeConfig;
use anchor_intake::intake::{self, IntakeManager, intake_routes};
use anchor_intake::llm::{LlmBackend, LlmConfig, create_provider};
use anchor_intake::store::{DocumentStore, LibSqlBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = IntakeConfig::from_env().context("invalid configuration")?;

    eprintln!("🩺 Anchor Intake v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Database: {}", config.db_path.display());
    eprintln!("   API: http://0.0.0.0:{}/api/intake/sessions", config.port);
    match config.api_key {
        Some(_) => eprintln!("   Assist model: {}", config.model),
        None => eprintln!("   Assist: disabled (set GEMINI_API_KEY to enable)"),
    }

    let db: Arc<dyn DocumentStore> = Arc::new(
        LibSqlBackend::new_local(&config.db_path)
            .await
            .context("failed to open database")?,
    );

    let workflow = Arc::new(intake::medicaid_enrollment()?);
    let mut manager = IntakeManager::new(workflow, db, config.session_idle_timeout);

    if let Some(api_key) = config.api_key.clone() {
        let llm = create_provider(&LlmConfig {
            backend: LlmBackend::Gemini,
            api_key,
            model: config.model.clone(),
        });
        manager = manager.with_llm(llm, config.assist_preamble.clone());
    } else {
        tracing::warn!("No API key configured; assist and case reports will be unavailable");
    }

    let manager = Arc::new(manager);
    let _sweep_handle =
        intake::spawn_sweep_task(Arc::clone(manager.registry()), config.sweep_interval);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);
    let app = intake_routes(manager).layer(cors);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;
    tracing::info!(port = config.port, "Intake API listening");

    axum::serve(listener, app).await.context("HTTP server failed")?;
    Ok(())
}
