use std::net::SocketAddr;

use melvis_core::QuestionBank;
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

mod app;
mod auth;
mod config;
mod error;
mod extract;
mod middleware;
mod routes;
mod state;
mod store;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Melvis API",
        version = "0.1.0",
        description = "Self-assessment for mental-health symptoms: accounts, guided attempts, scoring and history."
    ),
    paths(
        routes::health::health_check,
        routes::auth::signup,
        routes::auth::login,
        routes::auth::logout,
        routes::auth::me,
        routes::assessment::list_questions,
        routes::assessment::start_attempt,
        routes::assessment::get_attempt,
        routes::assessment::record_answer,
        routes::assessment::advance_attempt,
        routes::assessment::retreat_attempt,
        routes::assessment::score_attempt,
        routes::assessment::abandon_attempt,
        routes::assessment::list_history,
    ),
    components(schemas(
        HealthResponse,
        melvis_core::error::ApiError,
        melvis_core::session::UserProfile,
        melvis_core::Question,
        melvis_core::ScoreResult,
        melvis_core::Tier,
        routes::auth::SignupRequest,
        routes::auth::LoginRequest,
        routes::auth::SessionResponse,
        routes::assessment::QuestionsResponse,
        routes::assessment::AttemptView,
        routes::assessment::RecordAnswerRequest,
        routes::assessment::AdvanceStatus,
        routes::assessment::AdvanceResponse,
        routes::assessment::HistoryResponse,
        store::AssessmentRecord,
    )),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            utoipa::openapi::security::SecurityScheme::Http(
                utoipa::openapi::security::Http::new(
                    utoipa::openapi::security::HttpAuthScheme::Bearer,
                ),
            ),
        );
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    QuestionBank(#[from] melvis_core::questions::QuestionBankLoadError),
    #[error("question bank {0} has no questions")]
    EmptyBank(String),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

#[tokio::main]
async fn main() {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "melvis_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    if let Err(err) = run().await {
        tracing::error!(error = %err, "melvis api failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    let config = config::ApiConfig::from_env()?;

    let bank = match &config.question_bank {
        Some(path) => QuestionBank::load(path)?,
        None => QuestionBank::standard(),
    };
    if bank.is_empty() {
        let source = config
            .question_bank
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "standard".to_string());
        return Err(StartupError::EmptyBank(source));
    }
    tracing::info!(
        questions = bank.len(),
        completeness = ?config.scoring.completeness,
        max_score = ?config.scoring.max_score,
        session_ttl_hours = config.session_ttl.num_hours(),
        "assessment configuration loaded"
    );

    let store = store::MemoryStore::new(config.session_ttl);
    let app_state = state::AppState::new(bank, config.scoring, store);

    // Expired sessions are evicted lazily on lookup; sweep the rest hourly.
    // Attempts left idle for a full session lifetime go with them.
    let sweeper_store = app_state.store.clone();
    let attempt_idle = config.session_ttl;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(3600));
        loop {
            interval.tick().await;
            let purged = sweeper_store.purge_expired_sessions().await;
            if purged > 0 {
                tracing::debug!(purged, "expired sessions purged");
            }
            let purged = sweeper_store
                .purge_stale_attempts(chrono::Utc::now(), attempt_idle)
                .await;
            if purged > 0 {
                tracing::info!(purged, "idle assessment attempts purged");
            }
        }
    });

    let app = app::build_router(app_state, &config.cors_origins, true);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind { addr, source })?;
    tracing::info!("Melvis API listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(StartupError::Serve)
}
