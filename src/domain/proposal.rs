use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::inventory::ItemId;

/// Identity of a registered agent adapter
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// What a suggestion asks the household to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    /// Cook something from what is on hand
    Recipe,
    /// Buy something, usually at a discount
    Shopping,
}

impl std::fmt::Display for SuggestionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuggestionKind::Recipe => write!(f, "recipe"),
            SuggestionKind::Shopping => write!(f, "shopping"),
        }
    }
}

/// Inventory a suggestion consumes, expressed in the item's own unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub item: ItemId,
    pub quantity: Decimal,
}

impl Requirement {
    pub fn new(item: impl Into<ItemId>, quantity: Decimal) -> Self {
        Self {
            item: item.into(),
            quantity,
        }
    }
}

/// One scored recommendation inside a proposal.
///
/// `key` is the identity used for deduplication across agents
/// (e.g. `recipe:715538`, `shop:chicken`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub key: String,
    pub title: String,
    pub kind: SuggestionKind,
    /// Agent-reported confidence in [0, 1]
    pub confidence: f64,
    pub requirements: Vec<Requirement>,
    pub estimated_savings: Option<Decimal>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Suggestion {
    pub fn new(
        key: impl Into<String>,
        title: impl Into<String>,
        kind: SuggestionKind,
        confidence: f64,
    ) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            key: key.into(),
            title: title.into(),
            kind,
            confidence,
            requirements: Vec::new(),
            estimated_savings: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn requires(mut self, item: impl Into<ItemId>, quantity: Decimal) -> Self {
        self.requirements.push(Requirement::new(item, quantity));
        self
    }

    pub fn with_savings(mut self, savings: Decimal) -> Self {
        self.estimated_savings = Some(savings);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// An agent's raw output for one coordination cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub agent_id: AgentId,
    pub snapshot_version: u64,
    pub computed_at: DateTime<Utc>,
    pub suggestions: Vec<Suggestion>,
}

impl Proposal {
    pub fn new(agent_id: AgentId, snapshot_version: u64, suggestions: Vec<Suggestion>) -> Self {
        Self {
            agent_id,
            snapshot_version,
            computed_at: Utc::now(),
            suggestions,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.suggestions.is_empty()
    }
}
