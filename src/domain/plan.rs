use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::inventory::ItemId;
use super::proposal::{AgentId, Suggestion};

/// Missing stock for one requirement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortfall {
    pub item: ItemId,
    pub needed: Decimal,
    pub available: Decimal,
}

/// Whether a plan entry can be acted on with the snapshot's stock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Feasibility {
    /// All requirements reserved from inventory
    Ready,
    /// Satisfiable on its own, but higher-ranked entries took the stock
    RequiresRestock { shortfalls: Vec<Shortfall> },
    /// The snapshot never held enough, even without competition
    Infeasible { shortfalls: Vec<Shortfall> },
}

impl Feasibility {
    pub fn is_ready(&self) -> bool {
        matches!(self, Feasibility::Ready)
    }

    pub fn shortfalls(&self) -> &[Shortfall] {
        match self {
            Feasibility::Ready => &[],
            Feasibility::RequiresRestock { shortfalls } | Feasibility::Infeasible { shortfalls } => {
                shortfalls
            }
        }
    }
}

/// One ranked entry of a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub suggestion: Suggestion,
    /// Contributing agents, in registration order
    pub provenance: Vec<AgentId>,
    pub score: f64,
    pub nearest_expiry: Option<DateTime<Utc>>,
    pub feasibility: Feasibility,
}

impl PlanEntry {
    pub fn is_feasible(&self) -> bool {
        self.feasibility.is_ready()
    }
}

/// Reconciled, ranked output of one coordination cycle.
///
/// Valid for `snapshot_version` only; stale once a newer snapshot is published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub snapshot_version: u64,
    pub entries: Vec<PlanEntry>,
}

impl Plan {
    pub fn empty(snapshot_version: u64) -> Self {
        Self {
            snapshot_version,
            entries: Vec::new(),
        }
    }

    /// No suggestions this cycle. A valid outcome, not an error.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn feasible(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries.iter().filter(|e| e.is_feasible())
    }

    pub fn entry(&self, key: &str) -> Option<&PlanEntry> {
        self.entries.iter().find(|e| e.suggestion.key == key)
    }

    pub fn is_stale_for(&self, latest_version: u64) -> bool {
        self.snapshot_version < latest_version
    }
}
