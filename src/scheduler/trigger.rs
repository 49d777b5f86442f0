//! ChangeTriggerScheduler: turns change events into coordination cycles
//!
//! The `run()` loop uses `tokio::select!` over:
//!   - inventory change notifications
//!   - price updates (optional)
//!   - manual triggers from `TriggerHandle`
//!   - the debounce timer
//!   - completion of the running cycle
//!   - shutdown

use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

use super::config::SchedulerConfig;
use super::state::{DebounceMachine, SchedulerAction, SchedulerEvent};
use crate::coordinator::{CoordinationEngine, CycleOutcome};
use crate::error::{Result, SamError};
use crate::inventory::{InventoryStore, InventorySubscription, SubscriptionEvent};
use crate::signals::PriceUpdate;

/// Counters exposed for observability
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    pub changes_seen: u64,
    pub coalesced: u64,
    pub cycles_started: u64,
    pub cycles_completed: u64,
    pub cycles_superseded: u64,
    pub cycles_failed: u64,
}

/// Clonable handle for requesting a recomputation
#[derive(Clone)]
pub struct TriggerHandle {
    tx: mpsc::Sender<()>,
}

impl TriggerHandle {
    pub async fn trigger(&self) -> Result<()> {
        self.tx
            .send(())
            .await
            .map_err(|_| SamError::Internal("scheduler trigger channel closed".into()))
    }

    /// Non-blocking; a full channel already guarantees a follow-up cycle.
    pub fn try_trigger(&self) -> bool {
        !matches!(self.tx.try_send(()), Err(mpsc::error::TrySendError::Closed(_)))
    }
}

type CycleTask = JoinHandle<Result<CycleOutcome>>;

pub struct ChangeTriggerScheduler {
    engine: Arc<CoordinationEngine>,
    store: Arc<dyn InventoryStore>,
    config: SchedulerConfig,
    subscription: InventorySubscription,
    price_updates: Option<broadcast::Receiver<PriceUpdate>>,
    manual_tx: mpsc::Sender<()>,
    manual_rx: mpsc::Receiver<()>,
    stats: Arc<RwLock<SchedulerStats>>,
}

impl ChangeTriggerScheduler {
    /// Subscribes to the store immediately so no change after construction is missed.
    pub fn new(
        engine: Arc<CoordinationEngine>,
        store: Arc<dyn InventoryStore>,
        config: SchedulerConfig,
    ) -> Self {
        let subscription = store.subscribe();
        let (manual_tx, manual_rx) = mpsc::channel(16);
        Self {
            engine,
            store,
            config,
            subscription,
            price_updates: None,
            manual_tx,
            manual_rx,
            stats: Arc::new(RwLock::new(SchedulerStats::default())),
        }
    }

    pub fn with_price_updates(mut self, updates: broadcast::Receiver<PriceUpdate>) -> Self {
        self.price_updates = Some(updates);
        self
    }

    pub fn handle(&self) -> TriggerHandle {
        TriggerHandle {
            tx: self.manual_tx.clone(),
        }
    }

    pub fn stats(&self) -> Arc<RwLock<SchedulerStats>> {
        Arc::clone(&self.stats)
    }

    /// Run until shutdown. Returns the final counters, or the first fatal
    /// error (state machine contract violation, snapshot version mismatch).
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<SchedulerStats> {
        let Self {
            engine,
            store,
            config,
            mut subscription,
            mut price_updates,
            manual_tx: _keep_open,
            mut manual_rx,
            stats,
        } = self;

        let mut machine = DebounceMachine::new(config.debounce());
        let mut running: Option<CycleTask> = None;
        let mut inventory_open = true;

        info!(debounce_ms = config.debounce_ms, "change trigger scheduler started");

        loop {
            let event = tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("scheduler shutting down");
                    break;
                }
                change = subscription.next(), if inventory_open => match change {
                    SubscriptionEvent::Changed(change) => {
                        debug!(version = change.version, item = %change.item, kind = ?change.kind, "inventory changed");
                        SchedulerEvent::Change { at: Instant::now() }
                    }
                    SubscriptionEvent::Lagged(missed) => {
                        warn!(missed, "inventory notifications lagged");
                        SchedulerEvent::Change { at: Instant::now() }
                    }
                    SubscriptionEvent::Closed => {
                        warn!("inventory subscription closed");
                        inventory_open = false;
                        continue;
                    }
                },
                update = next_price_update(&mut price_updates) => match update {
                    Ok(update) => {
                        debug!(items = update.items.len(), "prices changed");
                        SchedulerEvent::Change { at: Instant::now() }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "price updates lagged");
                        SchedulerEvent::Change { at: Instant::now() }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        warn!("price update channel closed");
                        price_updates = None;
                        continue;
                    }
                },
                Some(()) = manual_rx.recv() => {
                    debug!("manual trigger");
                    SchedulerEvent::Change { at: Instant::now() }
                }
                _ = wait_until(machine.deadline()) => SchedulerEvent::TimerElapsed { at: Instant::now() },
                joined = wait_cycle(&mut running) => {
                    running = None;
                    settle(joined, &stats).await?;
                    SchedulerEvent::CycleFinished { at: Instant::now() }
                }
            };

            if matches!(event, SchedulerEvent::Change { .. }) {
                stats.write().await.changes_seen += 1;
            }

            match machine.on_event(event) {
                Ok(SchedulerAction::StartCycle) => {
                    if running.is_some() {
                        let err = SamError::SchedulerOverload(
                            "cycle start requested while a cycle is running".into(),
                        );
                        error!(error = %err, "scheduler invariant violated");
                        return Err(err);
                    }
                    stats.write().await.cycles_started += 1;
                    running = Some(spawn_cycle(Arc::clone(&engine), Arc::clone(&store)));
                }
                Ok(SchedulerAction::ArmTimer(deadline)) => {
                    debug!(in_ms = deadline.saturating_duration_since(Instant::now()).as_millis() as u64, "debounce timer armed");
                }
                Ok(SchedulerAction::Nothing) => {}
                Err(e) => {
                    error!(error = %e, "scheduler invariant violated");
                    return Err(e);
                }
            }
            stats.write().await.coalesced = machine.coalesced();
        }

        if running.is_some() {
            info!("leaving the running cycle to finish in the background");
        }
        let final_stats = stats.read().await.clone();
        Ok(final_stats)
    }
}

impl ChangeTriggerScheduler {
    /// Run in a background task until `shutdown` resolves or the loop stops
    /// on its own. A loop that stops early is returned at once so a fatal
    /// error is never left unnoticed.
    pub async fn serve<F>(self, shutdown: F) -> Result<SchedulerStats>
    where
        F: Future<Output = ()>,
    {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let mut task = tokio::spawn(self.run(shutdown_rx));

        let joined = tokio::select! {
            joined = &mut task => {
                warn!("scheduler stopped before shutdown was requested");
                joined
            }
            _ = shutdown => {
                info!("shutdown requested");
                let _ = shutdown_tx.send(());
                task.await
            }
        };
        joined.map_err(|e| SamError::Internal(format!("scheduler task ended abnormally: {e}")))?
    }
}

fn spawn_cycle(engine: Arc<CoordinationEngine>, store: Arc<dyn InventoryStore>) -> CycleTask {
    tokio::spawn(async move {
        let snapshot = store.snapshot().await?;
        engine.run_cycle(Arc::new(snapshot)).await
    })
}

/// Update counters for a settled cycle; only invariant violations are fatal.
async fn settle(
    joined: std::result::Result<Result<CycleOutcome>, tokio::task::JoinError>,
    stats: &RwLock<SchedulerStats>,
) -> Result<()> {
    let mut stats = stats.write().await;
    match joined {
        Ok(Ok(CycleOutcome::Completed(plan))) => {
            stats.cycles_completed += 1;
            debug!(version = plan.snapshot_version, entries = plan.len(), "cycle settled");
        }
        Ok(Ok(CycleOutcome::Superseded { version, latest })) => {
            stats.cycles_superseded += 1;
            debug!(version, latest, "cycle superseded");
        }
        Ok(Ok(CycleOutcome::AlreadyInFlight { version })) => {
            stats.cycles_superseded += 1;
            debug!(version, "cycle skipped, already in flight");
        }
        Ok(Err(e @ SamError::SnapshotVersionMismatch { .. })) => {
            stats.cycles_failed += 1;
            error!(error = %e, "coordination invariant violated");
            return Err(e);
        }
        Ok(Err(e)) => {
            stats.cycles_failed += 1;
            error!(error = %e, "coordination cycle failed");
        }
        Err(e) => {
            stats.cycles_failed += 1;
            error!(error = %e, "coordination cycle task ended abnormally");
        }
    }
    Ok(())
}

async fn wait_cycle(
    running: &mut Option<CycleTask>,
) -> std::result::Result<Result<CycleOutcome>, tokio::task::JoinError> {
    match running {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn next_price_update(
    updates: &mut Option<broadcast::Receiver<PriceUpdate>>,
) -> std::result::Result<PriceUpdate, broadcast::error::RecvError> {
    match updates {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
