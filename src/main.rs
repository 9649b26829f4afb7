use anyhow::{Context, Result};
use lingo_relay::activity::ActivityLog;
use lingo_relay::config::Config;
use lingo_relay::coordinator::LoadCoordinator;
use lingo_relay::engine::NativeRuntime;
use lingo_relay::language::WhichlangDetector;
use lingo_relay::metrics::EngineMetrics;
use lingo_relay::registry::ModelRegistry;
use lingo_relay::server::{self, AppState};
use lingo_relay::translator::Translator;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("lingo_relay=info".parse()?),
        )
        .init();

    info!("Starting lingo-relay");

    let config = Config::from_env()?;
    let addr = config.server_addr()?;

    if !config.models_dir.exists() {
        info!("Creating models directory {}", config.models_dir.display());
        std::fs::create_dir_all(&config.models_dir).with_context(|| {
            format!(
                "Failed to create models directory {}",
                config.models_dir.display()
            )
        })?;
    }

    let registry = Arc::new(ModelRegistry::new());
    registry
        .scan(&config.models_dir)
        .context("Failed to load translation models")?;
    if config.preload_artifacts {
        info!("Preloading artifacts for {} model(s)", registry.len());
        registry.preload_artifacts().await;
    }

    let library = config
        .engine_library
        .as_deref()
        .context("ENGINE_LIBRARY must point to the translation engine shared library")?;
    let runtime = Arc::new(NativeRuntime::load(library)?);

    let metrics = Arc::new(EngineMetrics::new());
    let coordinator = Arc::new(LoadCoordinator::new(
        Arc::clone(&registry),
        runtime,
        config.load_timeout,
        Arc::clone(&metrics),
    ));
    let activity = Arc::new(ActivityLog::new(
        config.activity_log_max,
        config.activity_log_retention,
    ));

    let translator = Translator::new(
        registry,
        Arc::clone(&coordinator),
        Box::new(WhichlangDetector::new(&config.hub_language)),
        activity,
        metrics,
        &config.hub_language,
    );

    server::serve(addr, Arc::new(AppState { translator })).await?;

    if let Some(key) = coordinator.evict().await {
        info!("Released engine {}", key);
    }
    info!("Server has been shut down gracefully");
    Ok(())
}
