mod config;
mod errors;
mod llm_client;
mod reactions;
mod routes;
mod state;
mod voters;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::GeminiClient;
use crate::reactions::generator::ReactionGenerator;
use crate::routes::build_router;
use crate::state::AppState;
use crate::voters::cache::VoterCache;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed values)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Political Agents API v{}", env!("CARGO_PKG_VERSION"));

    // Load the voter file up front so a bad dataset fails at startup
    let voters = Arc::new(VoterCache::new(config.voter_file.clone()));
    let store = voters
        .get()
        .await
        .with_context(|| format!("Failed to load voters from {}", voters.path().display()))?;
    info!("Voter store ready: {} records", store.len());

    // Initialize LLM client
    let llm = GeminiClient::new(
        config.gemini_api_key.clone(),
        config.gemini_base_url.clone(),
    )?;
    if llm.is_configured() {
        info!("LLM client initialized (model: {})", llm_client::MODEL);
    } else {
        warn!("GEMINI_API_KEY not set. Reaction generation will fail until it is configured.");
    }

    let settings = config.generation_settings();
    info!(
        "Reaction generator: concurrency={}, timeout={:?}, max_retries={}",
        settings.concurrency, settings.call_timeout, settings.max_retries
    );
    let reactions = ReactionGenerator::new(Arc::new(llm), settings);

    // Build app state
    let state = AppState {
        voters,
        reactions,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
