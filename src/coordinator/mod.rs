//! Coordination Engine
//!
//! Runs coordination cycles: fan out to every registered agent adapter under
//! per-agent deadlines, reconcile the proposals that arrived, and install the
//! resulting plan as the current plan. Keeps a bounded history of cycles.

pub mod config;
pub mod engine;
pub mod plan_cell;
pub mod publisher;
pub mod record;

pub use config::CoordinatorConfig;
pub use engine::{CoordinationEngine, CycleOutcome};
pub use plan_cell::PlanCell;
pub use publisher::{ChannelPublisher, JsonLinesPublisher, PlanPublisher, TracingPublisher};
pub use record::{AgentOutcome, AgentRecord, CycleHistory, CycleRecord, CycleStatus};
