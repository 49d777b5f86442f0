use sam::agents::{CatalogRecipeAgent, FlyerPriceAgent, SpoonacularRecipeAgent};
use sam::config::{AppConfig, LoggingConfig};
use sam::coordinator::CoordinationEngine;
use sam::error::Result;
use sam::signals::SignalSource;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},sam=debug", config.level)));

    // `tracing_appender::rolling::daily` panics if it cannot create the first
    // file, so check the directory is writable up front.
    let file_layer = config.dir.as_deref().and_then(|log_dir| {
        if let Err(e) = std::fs::create_dir_all(log_dir) {
            eprintln!("Warning: Could not create log directory {log_dir} ({e}), file logging disabled");
            return None;
        }
        let test_path = std::path::Path::new(log_dir).join(".sam_write_test");
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&test_path)
        {
            Ok(_) => {
                let _ = std::fs::remove_file(&test_path);
                let file_appender = tracing_appender::rolling::daily(log_dir, "sam.log");
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
                // Keep the guard alive for the life of the process
                Box::leak(Box::new(guard));
                Some(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .with_target(true),
                )
            }
            Err(e) => {
                eprintln!("Warning: Could not write to log directory {log_dir} ({e}), file logging disabled");
                None
            }
        }
    });

    // Plans go to stdout; logs go to stderr so the two never interleave.
    let (json_layer, text_layer) = if config.json {
        (
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            ),
            None,
        )
    } else {
        (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            ),
        )
    };

    let file_logging_enabled = file_layer.is_some();
    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .with(file_layer)
        .init();

    if let (true, Some(dir)) = (file_logging_enabled, config.dir.as_deref()) {
        eprintln!("Logging to: {dir}/sam.log");
    }
}

pub fn init_logging_simple() {
    // Minimal logging for one-shot commands
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(tracing::Level::WARN)
        .try_init();
}

/// Engine with every agent enabled in `config`, in a fixed registration order.
pub fn build_engine(config: &AppConfig, signals: Arc<dyn SignalSource>) -> Result<CoordinationEngine> {
    let mut engine = CoordinationEngine::new(
        config.coordinator.clone(),
        config.reconcile.clone(),
        signals,
    );

    let agents = &config.agents;
    if agents.recipe_catalog.enabled {
        engine.register_agent(Arc::new(CatalogRecipeAgent::new(
            "recipe_catalog",
            sam::demo::recipe_catalog(),
            agents.recipe_catalog.top_n,
        )))?;
    }
    if agents.spoonacular.enabled {
        let api_key = agents.spoonacular.api_key.clone().unwrap_or_default();
        engine.register_agent(Arc::new(SpoonacularRecipeAgent::new(
            "spoonacular",
            agents.spoonacular.base_url.clone(),
            api_key,
            agents.spoonacular.top_n,
        )?))?;
    }
    if agents.flyer.enabled {
        let mut flyer = FlyerPriceAgent::new("flyer", agents.flyer.low_stock_threshold);
        if let Some(location) = &agents.flyer.location {
            flyer = flyer.with_location(location.clone());
        }
        engine.register_agent(Arc::new(flyer))?;
    }

    info!(agents = ?engine.agent_ids(), "coordination engine ready");
    Ok(engine)
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
