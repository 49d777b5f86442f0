//! Scheduler Configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Quiet period after the last change before a cycle starts (ms)
    pub debounce_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { debounce_ms: 2_000 }
    }
}

impl SchedulerConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn validate(&self) -> Vec<String> {
        if self.debounce_ms == 0 {
            vec!["scheduler.debounce_ms must be positive".to_string()]
        } else {
            Vec::new()
        }
    }
}
