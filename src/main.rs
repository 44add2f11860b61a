mod agent;
mod config;
mod container;
mod errors;
mod models;
mod routes;
mod service;
mod store;

use tracing::info;

use crate::agent::OllamaAgentService;
use crate::config::AppConfig;
use crate::container::ContainerManager;
use crate::routes::AppState;
use crate::service::chat_service::ChatService;
use crate::service::ollama_service::OllamaService;
use crate::store::upload_repository::UploadRepository;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (development convenience)
    dotenvy::dotenv().ok();

    // Initialise tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "local_llm_chat=debug,tower_http=debug".into()),
        )
        .init();

    let config = AppConfig::from_env();
    info!(
        "Using model {} via {} (container {})",
        config.model, config.ollama_base_url, config.container_name
    );

    // ── Upload storage ────────────────────────────────────────────────────────
    let uploads = UploadRepository::new(&config.upload_dir);
    uploads.init().await?;

    // ── Dependency wiring ─────────────────────────────────────────────────────
    let agent = OllamaAgentService::new(&config.ollama_base_url, &config.model)?;
    let containers = ContainerManager::new(&config.container_name, &config.image, config.use_gpu)
        .with_docker_binary(&config.docker_binary);

    let state = AppState {
        chat: ChatService::new(agent.clone(), containers.clone(), uploads.clone()),
        ollama: OllamaService::new(agent, containers),
        uploads,
    };

    // ── Listen ────────────────────────────────────────────────────────────────
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{addr}/");

    axum::serve(listener, routes::router(state)).await?;
    Ok(())
}
