//! Change Trigger Scheduler
//!
//! Debounces inventory and price changes into coordination cycles. At most one
//! cycle runs at a time and a storm of changes during a run collapses into a
//! single follow-up cycle.

pub mod config;
pub mod state;
pub mod trigger;

pub use config::SchedulerConfig;
pub use state::{DebounceMachine, SchedulerAction, SchedulerEvent, SchedulerState};
pub use trigger::{ChangeTriggerScheduler, SchedulerStats, TriggerHandle};
