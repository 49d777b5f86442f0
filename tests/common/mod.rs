#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sam::agents::{AgentAdapter, AgentKind, CoordinationContext};
use sam::domain::{AgentId, InventoryItem, InventorySnapshot, Proposal, Suggestion, SuggestionKind};
use sam::error::AgentError;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Step a scripted agent plays on each call
#[derive(Clone)]
pub enum Step {
    Suggest(Vec<Suggestion>),
    Fail(AgentError),
}

/// Adapter that sleeps, then replays a script. The last step repeats.
pub struct ScriptedAgent {
    id: AgentId,
    kind: AgentKind,
    delay: Duration,
    script: Mutex<VecDeque<Step>>,
    calls: AtomicU32,
    finished: Arc<AtomicU32>,
}

impl ScriptedAgent {
    pub fn new(id: &str, kind: AgentKind, steps: Vec<Step>) -> Self {
        Self {
            id: AgentId::new(id),
            kind,
            delay: Duration::ZERO,
            script: Mutex::new(steps.into()),
            calls: AtomicU32::new(0),
            finished: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn suggesting(id: &str, suggestions: Vec<Suggestion>) -> Self {
        Self::new(id, AgentKind::Recipe, vec![Step::Suggest(suggestions)])
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Counter of calls that ran to completion, shared so it outlives the engine
    pub fn finished_counter(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.finished)
    }

    fn next_step(&self) -> Step {
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script
                .front()
                .cloned()
                .unwrap_or(Step::Suggest(Vec::new()))
        }
    }
}

#[async_trait]
impl AgentAdapter for ScriptedAgent {
    fn identity(&self) -> AgentId {
        self.id.clone()
    }

    fn kind(&self) -> AgentKind {
        self.kind
    }

    async fn propose(
        &self,
        ctx: &CoordinationContext,
        _deadline: Instant,
    ) -> Result<Proposal, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let step = self.next_step();
        self.finished.fetch_add(1, Ordering::SeqCst);
        match step {
            Step::Suggest(suggestions) => {
                Ok(Proposal::new(self.id.clone(), ctx.version(), suggestions))
            }
            Step::Fail(err) => Err(err),
        }
    }
}

pub fn recipe(key: &str, confidence: f64) -> Suggestion {
    Suggestion::new(key, key, SuggestionKind::Recipe, confidence)
}

pub fn snapshot(version: u64, items: Vec<(&str, Decimal)>) -> Arc<InventorySnapshot> {
    Arc::new(InventorySnapshot::new(
        version,
        Utc::now(),
        items
            .into_iter()
            .map(|(name, qty)| InventoryItem::new(name, qty, "each"))
            .collect(),
    ))
}
