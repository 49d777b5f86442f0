use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::domain::{Feasibility, InventoryItem, Plan};
use crate::error::Result;
use crate::inventory::NewItem;

#[derive(Parser)]
#[command(name = "sam")]
#[command(version)]
#[command(about = "Household inventory-to-action orchestrator", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Directory holding default.toml and <SAM_ENV>.toml
    #[arg(short, long, default_value = "config", env = "SAM_CONFIG_DIR")]
    pub config_dir: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Watch inventory and prices, recompute the plan on every change
    Run {
        /// JSON array of items to seed the pantry with (demo pantry if omitted)
        #[arg(short, long)]
        seed: Option<PathBuf>,
    },
    /// Run a single coordination cycle and print the plan
    Plan {
        #[arg(short, long)]
        seed: Option<PathBuf>,
        /// Compact single-line JSON
        #[arg(long)]
        compact: bool,
    },
    /// List pantry items, most recently updated first
    Inventory {
        #[arg(short, long)]
        seed: Option<PathBuf>,
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Load and validate the configuration
    CheckConfig,
}

/// Read seed rows from a JSON file, or fall back to the demo pantry.
pub fn load_seed(path: Option<&Path>) -> Result<Vec<NewItem>> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading seed file {}", path.display()))?;
            let rows = serde_json::from_str(&raw)
                .with_context(|| format!("parsing seed file {}", path.display()))?;
            Ok(rows)
        }
        None => Ok(crate::demo::sample_pantry(chrono::Utc::now())),
    }
}

pub fn print_inventory(items: &[InventoryItem]) {
    if items.is_empty() {
        println!("Inventory is empty");
        return;
    }
    println!("{:<20} {:>10} {:<12} {}", "ITEM", "QTY", "UNIT", "EXPIRES");
    for item in items {
        let expires = item
            .expires_at
            .map(|e| e.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<20} {:>10} {:<12} {}",
            item.id.as_str(),
            item.quantity.normalize(),
            item.unit,
            expires
        );
    }
}

pub fn print_plan(plan: &Plan, compact: bool) -> Result<()> {
    let json = if compact {
        serde_json::to_string(plan)?
    } else {
        serde_json::to_string_pretty(plan)?
    };
    println!("{json}");
    Ok(())
}

/// One line per entry, for terminals
pub fn plan_summary(plan: &Plan) -> Vec<String> {
    if plan.is_empty() {
        return vec![format!("v{}: no suggestions this cycle", plan.snapshot_version)];
    }
    plan.entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let flag = match &entry.feasibility {
                Feasibility::Ready => "ready".to_string(),
                Feasibility::RequiresRestock { shortfalls } => {
                    format!("restock {}", join_items(shortfalls.iter().map(|s| s.item.as_str())))
                }
                Feasibility::Infeasible { shortfalls } => {
                    format!("missing {}", join_items(shortfalls.iter().map(|s| s.item.as_str())))
                }
            };
            format!(
                "{:>2}. [{:.3}] {} ({}) <- {}",
                i + 1,
                entry.score,
                entry.suggestion.title,
                flag,
                join_items(entry.provenance.iter().map(|a| a.as_str()))
            )
        })
        .collect()
}

fn join_items<'a>(items: impl Iterator<Item = &'a str>) -> String {
    items.collect::<Vec<_>>().join(", ")
}
