//! CoordinationEngine: one coordination cycle per snapshot version
//!
//! `run_cycle()`:
//!   - freezes the snapshot and current external signals into a context
//!   - spawns every registered adapter under its own deadline
//!   - retries transient failures, records timeouts and failures
//!   - reconciles whatever arrived into a plan and publishes it
//!
//! A newer snapshot version supersedes a running cycle. The engine stops
//! waiting for it and discards its results; spawned adapter calls are left to
//! finish on their own.

use chrono::Utc;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::{watch, RwLock};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::config::CoordinatorConfig;
use super::plan_cell::PlanCell;
use super::publisher::PlanPublisher;
use super::record::{AgentOutcome, AgentRecord, CycleHistory, CycleRecord, CycleStatus};
use crate::agents::{AgentAdapter, AgentKind, CoordinationContext, SupersedeSignal};
use crate::domain::{AgentId, InventorySnapshot, Plan, Proposal};
use crate::error::{Result, SamError};
use crate::reconcile::{ReconcileConfig, Reconciler};
use crate::signals::SignalSource;

/// Result of `run_cycle`
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Plan computed and installed as the current plan
    Completed(Arc<Plan>),
    /// A newer snapshot version took over; nothing was published
    Superseded { version: u64, latest: u64 },
    /// Another cycle for this version is still running
    AlreadyInFlight { version: u64 },
}

impl CycleOutcome {
    pub fn plan(&self) -> Option<&Arc<Plan>> {
        match self {
            CycleOutcome::Completed(plan) => Some(plan),
            _ => None,
        }
    }
}

struct RegisteredAgent {
    id: AgentId,
    kind: AgentKind,
    adapter: Arc<dyn AgentAdapter>,
}

/// Settled result of one adapter slot
struct AgentCall {
    outcome: AgentOutcome,
    proposal: Option<Proposal>,
    elapsed_ms: u64,
}

/// Removes a version from the in-flight set when the cycle ends or is dropped
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<u64>>,
    version: u64,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(set: &'a Mutex<HashSet<u64>>, version: u64) -> Option<Self> {
        let inserted = set
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(version);
        if inserted {
            Some(Self { set, version })
        } else {
            None
        }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.version);
    }
}

pub struct CoordinationEngine {
    config: CoordinatorConfig,
    reconciler: Reconciler,
    signals: Arc<dyn SignalSource>,
    agents: Vec<RegisteredAgent>,
    publishers: Vec<Arc<dyn PlanPublisher>>,
    /// Newest snapshot version seen; drives supersede signals
    latest: watch::Sender<u64>,
    in_flight: Mutex<HashSet<u64>>,
    plan: PlanCell,
    history: RwLock<CycleHistory>,
}

impl CoordinationEngine {
    pub fn new(
        config: CoordinatorConfig,
        reconcile: ReconcileConfig,
        signals: Arc<dyn SignalSource>,
    ) -> Self {
        let (latest, _) = watch::channel(0);
        let history = CycleHistory::new(config.history_limit);
        Self {
            config,
            reconciler: Reconciler::new(reconcile),
            signals,
            agents: Vec::new(),
            publishers: Vec::new(),
            latest,
            in_flight: Mutex::new(HashSet::new()),
            plan: PlanCell::new(),
            history: RwLock::new(history),
        }
    }

    /// Register an adapter. Registration order breaks ranking ties.
    pub fn register_agent(&mut self, adapter: Arc<dyn AgentAdapter>) -> Result<()> {
        let id = adapter.identity();
        if self.agents.iter().any(|a| a.id == id) {
            return Err(SamError::Validation(format!(
                "agent '{id}' is already registered"
            )));
        }
        let kind = adapter.kind();
        info!(agent = %id, %kind, "agent registered");
        self.agents.push(RegisteredAgent { id, kind, adapter });
        Ok(())
    }

    pub fn add_publisher(&mut self, publisher: Arc<dyn PlanPublisher>) {
        debug!(publisher = publisher.name(), "plan publisher added");
        self.publishers.push(publisher);
    }

    pub fn agent_ids(&self) -> Vec<AgentId> {
        self.agents.iter().map(|a| a.id.clone()).collect()
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn plan_cell(&self) -> &PlanCell {
        &self.plan
    }

    pub fn current_plan(&self) -> Option<Arc<Plan>> {
        self.plan.current()
    }

    pub fn latest_version(&self) -> u64 {
        *self.latest.borrow()
    }

    /// Record that a newer snapshot version exists. Running cycles for older
    /// versions stop waiting and discard their results.
    pub fn announce_version(&self, version: u64) -> bool {
        let advanced = self.latest.send_if_modified(|latest| {
            if version > *latest {
                *latest = version;
                true
            } else {
                false
            }
        });
        if advanced {
            debug!(version, "newer snapshot version announced");
        }
        advanced
    }

    pub async fn history(&self) -> Vec<CycleRecord> {
        self.history.read().await.iter().cloned().collect()
    }

    pub async fn last_record(&self) -> Option<CycleRecord> {
        self.history.read().await.latest().cloned()
    }

    /// Run one coordination cycle against `snapshot`.
    ///
    /// Agent failures and timeouts are recorded, never returned. Errors are
    /// engine invariant violations or a failing signal source.
    pub async fn run_cycle(&self, snapshot: Arc<InventorySnapshot>) -> Result<CycleOutcome> {
        let version = snapshot.version;
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight, version) else {
            warn!(version, "cycle already in flight for this version");
            return Ok(CycleOutcome::AlreadyInFlight { version });
        };

        let cycle_id = Uuid::new_v4();
        let started_at = Utc::now();
        self.announce_version(version);

        let latest = self.latest_version();
        if latest > version {
            info!(version, latest, "cycle superseded before start");
            self.record(CycleRecord {
                cycle_id,
                snapshot_version: version,
                started_at,
                finished_at: Utc::now(),
                agents: Vec::new(),
                status: CycleStatus::Superseded { latest },
                plan: None,
            })
            .await;
            return Ok(CycleOutcome::Superseded { version, latest });
        }

        let signals = Arc::new(self.signals.current().await?);
        let ctx = Arc::new(CoordinationContext {
            cycle_id,
            snapshot: Arc::clone(&snapshot),
            signals,
            supersede: SupersedeSignal::new(version, self.latest.subscribe()),
        });

        info!(
            %cycle_id,
            version,
            items = snapshot.len(),
            agents = self.agents.len(),
            "coordination cycle started"
        );

        let start = Instant::now();
        let tasks: Vec<_> = self
            .agents
            .iter()
            .map(|agent| {
                let deadline = start + self.config.timeout_for(&agent.id, agent.kind);
                tokio::spawn(invoke(
                    Arc::clone(&agent.adapter),
                    agent.id.clone(),
                    Arc::clone(&ctx),
                    deadline,
                    self.config.max_retries,
                ))
            })
            .collect();

        // Dropping the join handles detaches the adapter tasks; they are not aborted.
        let settled = tokio::select! {
            settled = join_all(tasks) => settled,
            latest = ctx.supersede.superseded() => {
                info!(%cycle_id, version, latest, "cycle superseded while agents were running");
                let elapsed_ms = start.elapsed().as_millis() as u64;
                let abandoned = self
                    .agents
                    .iter()
                    .map(|agent| AgentRecord {
                        agent_id: agent.id.clone(),
                        kind: agent.kind,
                        outcome: AgentOutcome::Abandoned,
                        elapsed_ms,
                    })
                    .collect();
                self.record_superseded(cycle_id, version, started_at, abandoned, latest).await;
                return Ok(CycleOutcome::Superseded { version, latest });
            }
        };

        let mut agent_records = Vec::with_capacity(self.agents.len());
        let mut proposals = Vec::new();
        for (agent, joined) in self.agents.iter().zip(settled) {
            let call = joined.unwrap_or_else(|e| AgentCall {
                outcome: AgentOutcome::Failed {
                    error: format!("adapter task ended abnormally: {e}"),
                    attempts: 1,
                },
                proposal: None,
                elapsed_ms: start.elapsed().as_millis() as u64,
            });
            agent_records.push(AgentRecord {
                agent_id: agent.id.clone(),
                kind: agent.kind,
                outcome: call.outcome,
                elapsed_ms: call.elapsed_ms,
            });
            proposals.extend(call.proposal);
        }

        if ctx.supersede.is_superseded() {
            let latest = self.latest_version();
            info!(%cycle_id, version, latest, "cycle superseded; results discarded");
            self.record_superseded(cycle_id, version, started_at, agent_records, latest)
                .await;
            return Ok(CycleOutcome::Superseded { version, latest });
        }

        let plan = match self
            .reconciler
            .reconcile(&snapshot, &ctx.signals.constraints, &proposals)
        {
            Ok(plan) => Arc::new(plan),
            Err(e) => {
                error!(%cycle_id, version, error = %e, "reconciliation failed");
                self.record(CycleRecord {
                    cycle_id,
                    snapshot_version: version,
                    started_at,
                    finished_at: Utc::now(),
                    agents: agent_records,
                    status: CycleStatus::Aborted {
                        error: e.to_string(),
                    },
                    plan: None,
                })
                .await;
                return Err(e);
            }
        };

        if !self.plan.store(Arc::clone(&plan)) {
            let latest = self.plan.version().unwrap_or(version);
            info!(%cycle_id, version, latest, "newer plan already installed; results discarded");
            self.record_superseded(cycle_id, version, started_at, agent_records, latest)
                .await;
            return Ok(CycleOutcome::Superseded { version, latest });
        }

        for publisher in &self.publishers {
            if let Err(e) = publisher.publish(Arc::clone(&plan)).await {
                warn!(publisher = publisher.name(), error = %e, "plan publication failed");
            }
        }

        let succeeded = agent_records.iter().filter(|r| r.outcome.is_success()).count();
        info!(
            %cycle_id,
            version,
            entries = plan.len(),
            succeeded,
            failed = agent_records.len() - succeeded,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "coordination cycle completed"
        );
        if plan.is_empty() {
            info!(%cycle_id, version, "no suggestions this cycle");
        }

        self.record(CycleRecord {
            cycle_id,
            snapshot_version: version,
            started_at,
            finished_at: Utc::now(),
            agents: agent_records,
            status: CycleStatus::Completed {
                entries: plan.len(),
            },
            plan: Some(Arc::clone(&plan)),
        })
        .await;

        Ok(CycleOutcome::Completed(plan))
    }

    async fn record_superseded(
        &self,
        cycle_id: Uuid,
        version: u64,
        started_at: chrono::DateTime<Utc>,
        agents: Vec<AgentRecord>,
        latest: u64,
    ) {
        self.record(CycleRecord {
            cycle_id,
            snapshot_version: version,
            started_at,
            finished_at: Utc::now(),
            agents,
            status: CycleStatus::Superseded { latest },
            plan: None,
        })
        .await;
    }

    async fn record(&self, record: CycleRecord) {
        self.history.write().await.push(record);
    }
}

/// Call one adapter until it succeeds, fails terminally, exhausts its retries
/// or hits the deadline. Retries share the original deadline.
async fn invoke(
    adapter: Arc<dyn AgentAdapter>,
    id: AgentId,
    ctx: Arc<CoordinationContext>,
    deadline: Instant,
    max_retries: u32,
) -> AgentCall {
    let started = Instant::now();
    let expected = ctx.version();
    let mut attempts = 0u32;

    let (outcome, proposal) = loop {
        attempts += 1;
        match timeout_at(deadline, adapter.propose(&ctx, deadline)).await {
            Err(_) => {
                warn!(agent = %id, attempts, "agent timed out");
                break (AgentOutcome::TimedOut { attempts }, None);
            }
            Ok(Ok(mut proposal)) => {
                if proposal.snapshot_version != expected {
                    warn!(
                        agent = %id,
                        expected,
                        found = proposal.snapshot_version,
                        "agent answered for another snapshot version"
                    );
                    let error = format!(
                        "proposal computed against version {} in cycle for version {}",
                        proposal.snapshot_version, expected
                    );
                    break (AgentOutcome::Failed { error, attempts }, None);
                }
                proposal.agent_id = id.clone();
                let suggestions = proposal.suggestions.len();
                break (
                    AgentOutcome::Succeeded {
                        suggestions,
                        attempts,
                    },
                    Some(proposal),
                );
            }
            Ok(Err(e)) if e.is_timeout() => {
                warn!(agent = %id, attempts, error = %e, "agent ran out of time");
                break (AgentOutcome::TimedOut { attempts }, None);
            }
            Ok(Err(e)) if e.is_transient() && attempts <= max_retries => {
                debug!(agent = %id, attempts, error = %e, "transient agent error; retrying");
            }
            Ok(Err(e)) => {
                warn!(agent = %id, attempts, error = %e, "agent failed");
                break (
                    AgentOutcome::Failed {
                        error: e.to_string(),
                        attempts,
                    },
                    None,
                );
            }
        }
    };

    AgentCall {
        outcome,
        proposal,
        elapsed_ms: started.elapsed().as_millis() as u64,
    }
}
