use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use harvester_core::{
    config::LogFormat, load_config, validate_config, ApiKeyGuard, ArxivClient, OpenAiTranslator,
    PipelineOrchestrator, Scheduler, SqliteArticleStore, TranslationService,
};
use harvester_server::{api::create_router, state::AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn run() -> Result<()> {
    // Determine config path
    let config_path = std::env::var("HARVESTER_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Logging format lives in the config, so load first and report errors after
    let loaded = load_config(&config_path);
    init_tracing(
        loaded
            .as_ref()
            .map(|c| c.logging.format)
            .unwrap_or_default(),
    );

    info!("Loading configuration from {:?}", config_path);
    let config =
        loaded.with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        config_hash = &config_hash[..16],
        categories = config.catalog.categories.len(),
        "Configuration loaded successfully"
    );
    info!("Auth method: {:?}", config.auth.method);
    info!("Database path: {:?}", config.database.path);

    // Store: one table per category
    let store = Arc::new(SqliteArticleStore::from_config(&config.database));
    for mapping in &config.catalog.categories {
        store
            .ensure_table(&mapping.table)
            .with_context(|| format!("Failed to prepare table {}", mapping.table))?;
    }
    info!("Article store initialized");

    let catalog =
        Arc::new(ArxivClient::new(&config.catalog).context("Failed to create arXiv client")?);

    let translator = Arc::new(
        OpenAiTranslator::from_config(&config.translator)
            .context("Failed to create translator")?,
    );
    info!(
        model = %config.translator.model,
        max_attempts = config.translator.max_attempts,
        "Translator initialized"
    );
    let translation = Arc::new(TranslationService::from_config(
        translator,
        &config.translator,
    ));

    let orchestrator = Arc::new(PipelineOrchestrator::from_config(
        &config.catalog,
        catalog,
        store.clone(),
        store,
        translation,
    ));

    let scheduler = Arc::new(Scheduler::new(orchestrator, &config.schedule));
    let guard = ApiKeyGuard::from_config(&config.auth).context("Failed to create API key guard")?;
    info!("Using authentication: {:?}", guard.method());

    let addr = SocketAddr::new(config.server.host, config.server.port);
    let state = Arc::new(AppState::new(
        Arc::new(config),
        guard,
        Arc::clone(&scheduler),
    ));

    scheduler.start().await;

    let app = create_router(state);

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    scheduler.stop().await;

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
