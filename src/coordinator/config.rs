//! Coordinator Configuration

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::agents::AgentKind;
use crate::domain::AgentId;

/// Configuration for the coordination engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Default deadline for recipe agents (ms)
    pub recipe_timeout_ms: u64,
    /// Default deadline for price-optimization agents (ms)
    pub price_timeout_ms: u64,
    /// Per-agent deadline overrides keyed by agent id (ms)
    pub agent_timeouts_ms: HashMap<String, u64>,
    /// Retries after a transient error, per agent per cycle
    pub max_retries: u32,
    /// Number of cycle records kept in memory
    pub history_limit: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            recipe_timeout_ms: 5_000,
            price_timeout_ms: 10_000,
            agent_timeouts_ms: HashMap::new(),
            max_retries: 1,
            history_limit: 50,
        }
    }
}

impl CoordinatorConfig {
    /// Deadline budget for one agent: per-agent override, else its kind default.
    pub fn timeout_for(&self, agent: &AgentId, kind: AgentKind) -> Duration {
        let ms = self
            .agent_timeouts_ms
            .get(agent.as_str())
            .copied()
            .unwrap_or(match kind {
                AgentKind::Recipe => self.recipe_timeout_ms,
                AgentKind::PriceOptimization => self.price_timeout_ms,
            });
        Duration::from_millis(ms)
    }

    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.recipe_timeout_ms == 0 {
            errors.push("coordinator.recipe_timeout_ms must be positive".to_string());
        }
        if self.price_timeout_ms == 0 {
            errors.push("coordinator.price_timeout_ms must be positive".to_string());
        }
        for (agent, ms) in &self.agent_timeouts_ms {
            if *ms == 0 {
                errors.push(format!("coordinator.agent_timeouts_ms.{agent} must be positive"));
            }
        }
        if self.history_limit == 0 {
            errors.push("coordinator.history_limit must be at least 1".to_string());
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_beats_kind_default() {
        let mut config = CoordinatorConfig::default();
        config.agent_timeouts_ms.insert("slow-api".into(), 750);

        assert_eq!(
            config.timeout_for(&AgentId::new("slow-api"), AgentKind::Recipe),
            Duration::from_millis(750)
        );
        assert_eq!(
            config.timeout_for(&AgentId::new("catalog"), AgentKind::Recipe),
            Duration::from_secs(5)
        );
        assert_eq!(
            config.timeout_for(&AgentId::new("flyer"), AgentKind::PriceOptimization),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let config = CoordinatorConfig {
            recipe_timeout_ms: 0,
            history_limit: 0,
            ..CoordinatorConfig::default()
        };
        assert_eq!(config.validate().len(), 2);
        assert!(CoordinatorConfig::default().validate().is_empty());
    }
}
