//! Cycle bookkeeping: per-agent outcomes and bounded history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use uuid::Uuid;

use crate::agents::AgentKind;
use crate::domain::{AgentId, Plan};

/// What happened to one agent's slot in a cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AgentOutcome {
    Succeeded { suggestions: usize, attempts: u32 },
    TimedOut { attempts: u32 },
    Failed { error: String, attempts: u32 },
    /// The cycle was superseded before this slot settled; the call was left running
    Abandoned,
}

impl AgentOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AgentOutcome::Succeeded { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            AgentOutcome::Succeeded { attempts, .. }
            | AgentOutcome::TimedOut { attempts }
            | AgentOutcome::Failed { attempts, .. } => *attempts,
            AgentOutcome::Abandoned => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub agent_id: AgentId,
    pub kind: AgentKind,
    pub outcome: AgentOutcome,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CycleStatus {
    Completed { entries: usize },
    /// A newer snapshot version started; results were discarded
    Superseded { latest: u64 },
    /// Engine invariant violated; the error was returned to the caller
    Aborted { error: String },
}

/// Bookkeeping for one coordination cycle
#[derive(Debug, Clone)]
pub struct CycleRecord {
    pub cycle_id: Uuid,
    pub snapshot_version: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// In agent registration order
    pub agents: Vec<AgentRecord>,
    pub status: CycleStatus,
    pub plan: Option<Arc<Plan>>,
}

impl CycleRecord {
    pub fn outcome_of(&self, agent: &AgentId) -> Option<&AgentOutcome> {
        self.agents
            .iter()
            .find(|r| &r.agent_id == agent)
            .map(|r| &r.outcome)
    }

    pub fn successful_agents(&self) -> usize {
        self.agents.iter().filter(|r| r.outcome.is_success()).count()
    }
}

/// Last `limit` cycle records, oldest first
#[derive(Debug, Clone)]
pub struct CycleHistory {
    limit: usize,
    records: VecDeque<CycleRecord>,
}

impl CycleHistory {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            limit,
            records: VecDeque::with_capacity(limit),
        }
    }

    pub fn push(&mut self, record: CycleRecord) {
        while self.records.len() >= self.limit {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn latest(&self) -> Option<&CycleRecord> {
        self.records.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CycleRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}
