use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::coordinator::CoordinatorConfig;
use crate::reconcile::ReconcileConfig;
use crate::scheduler::SchedulerConfig;
use crate::signals::UserConstraints;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub coordinator: CoordinatorConfig,
    pub scheduler: SchedulerConfig,
    pub reconcile: ReconcileConfig,
    pub agents: AgentsConfig,
    /// Household location, exclusions and watch list
    pub constraints: UserConstraints,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentsConfig {
    pub recipe_catalog: CatalogAgentConfig,
    pub spoonacular: SpoonacularConfig,
    pub flyer: FlyerAgentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogAgentConfig {
    pub enabled: bool,
    /// Recipes proposed per cycle
    pub top_n: usize,
}

impl Default for CatalogAgentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            top_n: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpoonacularConfig {
    pub enabled: bool,
    pub base_url: String,
    /// Falls back to `SPOONACULAR_API_KEY` when unset
    pub api_key: Option<String>,
    pub top_n: usize,
}

impl Default for SpoonacularConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: crate::agents::spoonacular::DEFAULT_BASE_URL.to_string(),
            api_key: None,
            top_n: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlyerAgentConfig {
    pub enabled: bool,
    /// Overrides `constraints.location` for flyer lookups
    pub location: Option<String>,
    /// Items at or below this quantity are considered for restocking
    pub low_stock_threshold: Decimal,
}

impl Default for FlyerAgentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            location: None,
            low_stock_threshold: Decimal::ONE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` wins when set
    pub level: String,
    /// Enable JSON formatted logs
    pub json: bool,
    /// Directory for daily-rotated log files; console only when unset
    pub dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            dir: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .set_default("logging.level", "info")?
            .set_default("scheduler.debounce_ms", 2000)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("SAM_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (SAM__SCHEDULER__DEBOUNCE_MS, etc.)
            .add_source(
                Environment::with_prefix("SAM")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut config: Self = builder.build()?.try_deserialize()?;
        if config.agents.spoonacular.api_key.is_none() {
            config.agents.spoonacular.api_key = std::env::var("SPOONACULAR_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty());
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        errors.extend(self.coordinator.validate());
        errors.extend(self.scheduler.validate());
        errors.extend(self.reconcile.validate());

        let agents = &self.agents;
        if !agents.recipe_catalog.enabled && !agents.spoonacular.enabled && !agents.flyer.enabled {
            errors.push("at least one agent must be enabled".to_string());
        }
        if agents.recipe_catalog.enabled && agents.recipe_catalog.top_n == 0 {
            errors.push("agents.recipe_catalog.top_n must be at least 1".to_string());
        }
        if agents.spoonacular.enabled {
            if agents.spoonacular.api_key.as_deref().map_or(true, str::is_empty) {
                errors.push(
                    "agents.spoonacular.api_key (or SPOONACULAR_API_KEY) is required when enabled"
                        .to_string(),
                );
            }
            if !agents.spoonacular.base_url.starts_with("http") {
                errors.push("agents.spoonacular.base_url must be an http(s) URL".to_string());
            }
        }
        if agents.flyer.low_stock_threshold < Decimal::ZERO {
            errors.push("agents.flyer.low_stock_threshold must not be negative".to_string());
        }
        if self.constraints.location.trim().is_empty() {
            errors.push("constraints.location must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
