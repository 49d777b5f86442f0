pub mod agents;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod demo;
pub mod domain;
pub mod error;
pub mod inventory;
pub mod reconcile;
pub mod scheduler;
pub mod signals;

pub use agents::{AgentAdapter, AgentId, AgentKind, CoordinationContext};
pub use config::AppConfig;
pub use coordinator::{
    AgentOutcome, CoordinationEngine, CoordinatorConfig, CycleOutcome, CycleRecord, PlanCell,
    PlanPublisher,
};
pub use domain::{InventoryItem, InventorySnapshot, ItemId, Plan, PlanEntry, Proposal, Suggestion};
pub use error::{AgentError, Result, SamError};
pub use inventory::{InMemoryInventoryStore, InventoryStore};
pub use reconcile::{ReconcileConfig, Reconciler, ScoreWeights};
pub use scheduler::{ChangeTriggerScheduler, SchedulerConfig, TriggerHandle};
pub use signals::{ExternalSignals, SharedSignals, SignalSource};
