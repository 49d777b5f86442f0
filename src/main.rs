use chrono::{Duration as ChronoDuration, Utc};
use clap::Parser;
use sam::cli::{self, Cli, Commands};
use sam::config::AppConfig;
use sam::coordinator::{CycleOutcome, JsonLinesPublisher, TracingPublisher};
use sam::error::{Result, SamError};
use sam::inventory::{InMemoryInventoryStore, InventoryStore};
use sam::scheduler::ChangeTriggerScheduler;
use sam::signals::{ExternalSignals, SharedSignals};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

mod main_runtime;

use main_runtime::{build_engine, init_logging, init_logging_simple, shutdown_signal};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load_from(&cli.config_dir)?;

    match cli.command {
        Some(Commands::CheckConfig) => {
            init_logging_simple();
            check_config(&config, &cli.config_dir)
        }
        Some(Commands::Inventory { seed, limit }) => {
            init_logging_simple();
            let store = seeded_store(seed).await?;
            cli::print_inventory(&store.list_items(limit).await);
            Ok(())
        }
        Some(Commands::Plan { seed, compact }) => {
            init_logging_simple();
            validate(&config)?;
            run_single_cycle(&config, seed, compact).await
        }
        Some(Commands::Run { seed }) => {
            init_logging(&config.logging);
            validate(&config)?;
            run_service(config, seed).await
        }
        None => {
            init_logging(&config.logging);
            validate(&config)?;
            run_service(config, None).await
        }
    }
}

fn validate(config: &AppConfig) -> Result<()> {
    config.validate().map_err(|errors| {
        for e in &errors {
            error!("config: {e}");
        }
        SamError::Validation(errors.join("; "))
    })
}

fn check_config(config: &AppConfig, dir: &std::path::Path) -> Result<()> {
    match config.validate() {
        Ok(()) => {
            println!("Configuration in {} is valid", dir.display());
            println!("{}", serde_json::to_string_pretty(config)?);
            Ok(())
        }
        Err(errors) => {
            for e in &errors {
                println!("  ✗ {e}");
            }
            Err(SamError::Validation(format!("{} configuration problem(s)", errors.len())))
        }
    }
}

async fn seeded_store(seed: Option<PathBuf>) -> Result<Arc<InMemoryInventoryStore>> {
    let store = Arc::new(InMemoryInventoryStore::new());
    let rows = cli::load_seed(seed.as_deref())?;
    if !rows.is_empty() {
        store.insert_items(rows).await?;
    }
    Ok(store)
}

fn seeded_signals(config: &AppConfig) -> ExternalSignals {
    // demo flyer runs for the coming week
    let valid_until = (Utc::now() + ChronoDuration::days(7)).date_naive();
    let mut signals = sam::demo::ottawa_signals(valid_until);
    signals.constraints = config.constraints.clone();
    signals
}

async fn run_single_cycle(config: &AppConfig, seed: Option<PathBuf>, compact: bool) -> Result<()> {
    let store = seeded_store(seed).await?;
    let signals = Arc::new(SharedSignals::new(seeded_signals(config)));
    let engine = build_engine(config, signals)?;

    let snapshot = Arc::new(store.snapshot().await?);
    match engine.run_cycle(snapshot).await? {
        CycleOutcome::Completed(plan) => {
            for line in cli::plan_summary(&plan) {
                eprintln!("{line}");
            }
            cli::print_plan(&plan, compact)
        }
        other => Err(SamError::Internal(format!(
            "single cycle did not complete: {other:?}"
        ))),
    }
}

async fn run_service(config: AppConfig, seed: Option<PathBuf>) -> Result<()> {
    let store = seeded_store(seed).await?;
    let signals = Arc::new(SharedSignals::new(seeded_signals(&config)));

    let mut engine = build_engine(&config, signals.clone())?;
    engine.add_publisher(Arc::new(TracingPublisher));
    engine.add_publisher(Arc::new(JsonLinesPublisher::stdout()));
    let engine = Arc::new(engine);

    let scheduler = ChangeTriggerScheduler::new(
        Arc::clone(&engine),
        store.clone(),
        config.scheduler.clone(),
    )
    .with_price_updates(signals.subscribe());
    let trigger = scheduler.handle();

    // First plan without waiting for a change
    trigger.trigger().await?;
    info!(
        version = store.version().await,
        debounce_ms = config.scheduler.debounce_ms,
        "sam running, Ctrl+C to stop"
    );

    match scheduler.serve(shutdown_signal()).await {
        Ok(stats) => {
            info!(?stats, "scheduler stopped");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "scheduler stopped with a fatal error");
            Err(e)
        }
    }
}
