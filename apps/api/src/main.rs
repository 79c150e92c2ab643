mod ats;
mod config;
mod errors;
mod extraction;
mod llm_client;
mod memory;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::extraction::{PdfPageLoader, ResumeExtractor};
use crate::llm_client::LlmClient;
use crate::memory::ConversationStore;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing GOOGLE_API_KEY)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http={}",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log,
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ATS API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let llm = LlmClient::new(&config).context("Failed to build Gemini HTTP client")?;
    info!("LLM client initialized (model: {})", config.gemini_model);

    // Uploads are staged here one unique file per request
    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("Cannot create upload dir {}", config.upload_dir.display()))?;
    let extractor = ResumeExtractor::new(config.upload_dir.clone(), Arc::new(PdfPageLoader));
    info!("Staging uploads in {}", extractor.upload_dir().display());

    let memory = ConversationStore::new(config.memory_max_turns, config.memory_max_sessions);
    info!(
        "Conversation memory: {} turn(s) per session, {} session(s) max",
        config.memory_max_turns, config.memory_max_sessions
    );

    // Build app state
    let state = AppState {
        llm: Arc::new(llm),
        extractor,
        memory,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the frontend host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
