mod config;
mod errors;
mod grading;
mod interview;
mod llm_client;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::grading::ConsensusGrader;
use crate::interview::manager::SessionManager;
use crate::llm_client::{LlmClient, TextGenerator};
use crate::routes::build_router;
use crate::state::AppState;

/// How often idle interview sessions are swept.
const EVICTION_SWEEP_SECS: u64 = 60;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing API keys or malformed numbers)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Interviewer API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let llm = LlmClient::new(config.groq_api_keys.clone(), config.groq_model.clone())?;
    info!(
        "LLM client initialized (model: {}, keys: {})",
        llm.model(),
        config.groq_api_keys.len()
    );

    // Session manager owns every live interview; the generator is injected here
    let generator: Arc<dyn TextGenerator> = Arc::new(llm.clone());
    let sessions = Arc::new(SessionManager::new(generator, config.interview.clone()));
    info!(
        "Interview pacing: {} topics, {} follow-up(s) per topic, idle timeout {}s",
        config.interview.pacing.max_primary_questions,
        config.interview.pacing.max_elaborations,
        config.interview.session_idle_timeout.as_secs()
    );

    let _sweeper = sessions
        .clone()
        .spawn_eviction_sweeper(Duration::from_secs(EVICTION_SWEEP_SECS));

    let state = AppState {
        sessions,
        grader: Arc::new(ConsensusGrader(llm)),
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict CORS to the frontend origin once it is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
