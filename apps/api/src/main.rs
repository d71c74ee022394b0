mod config;
mod errors;
mod llm_client;
mod routes;
mod screening;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, LlmProvider};
use crate::llm_client::{AnthropicClient, EvaluationClient, OpenAiClient};
use crate::routes::build_router;
use crate::screening::extractor::PdfTextExtractor;
use crate::screening::orchestrator::EvaluationOrchestrator;
use crate::screening::session::SessionStore;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on a missing API key)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Recruit API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the model backend
    let client = build_evaluation_client(&config)?;
    info!(
        "Evaluation client initialized (model: {}, timeout: {}s)",
        client.model(),
        config.evaluation_timeout.as_secs()
    );

    let orchestrator = EvaluationOrchestrator::new(
        Arc::new(PdfTextExtractor),
        client,
        config.evaluation_timeout,
    );

    // Sessions live in memory only; idle ones are swept in the background
    let sessions = SessionStore::new(config.session_idle_ttl);
    sessions.spawn_sweeper(sweep_interval(config.session_idle_ttl));
    info!(
        "Session store initialized (idle ttl: {}s)",
        config.session_idle_ttl.as_secs()
    );

    // Build app state
    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        sessions,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the UI has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_evaluation_client(config: &Config) -> Result<Arc<dyn EvaluationClient>> {
    let client: Arc<dyn EvaluationClient> = match config.llm_provider {
        LlmProvider::Anthropic => Arc::new(AnthropicClient::new(config.llm_api_key.clone())?),
        LlmProvider::OpenAi => Arc::new(OpenAiClient::new(config.llm_api_key.clone())?),
    };
    Ok(client)
}

fn sweep_interval(idle_ttl: Duration) -> Duration {
    (idle_ttl / 4).max(Duration::from_secs(1))
}
