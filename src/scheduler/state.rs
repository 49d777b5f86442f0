//! Debounce state machine: Idle → Debouncing → Running
//!
//! Pure and clock-free: callers pass the time of each event, so every
//! transition can be tested without a runtime.

use std::time::Duration;
use tokio::time::Instant;

use crate::error::{Result, SamError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    /// Waiting for the burst to quiet down
    Debouncing { deadline: Instant },
    /// A cycle is running; `pending` remembers at most one follow-up
    Running { pending: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// Inventory or price change, or a manual trigger
    Change { at: Instant },
    /// The debounce timer fired
    TimerElapsed { at: Instant },
    /// The running cycle settled (completed, superseded or failed)
    CycleFinished { at: Instant },
}

/// What the driver must do after a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerAction {
    /// (Re)arm the debounce timer for this instant
    ArmTimer(Instant),
    /// Snapshot the inventory and run a cycle
    StartCycle,
    Nothing,
}

#[derive(Debug, Clone)]
pub struct DebounceMachine {
    state: SchedulerState,
    window: Duration,
    coalesced: u64,
}

impl DebounceMachine {
    pub fn new(window: Duration) -> Self {
        Self {
            state: SchedulerState::Idle,
            window,
            coalesced: 0,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            SchedulerState::Debouncing { deadline } => Some(deadline),
            _ => None,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, SchedulerState::Running { .. })
    }

    /// Changes absorbed into an already scheduled or pending cycle
    pub fn coalesced(&self) -> u64 {
        self.coalesced
    }

    /// Apply one event. Events that cannot happen in the current state mean
    /// the driver lost track of its timer or cycle and are reported as
    /// `SchedulerOverload`.
    pub fn on_event(&mut self, event: SchedulerEvent) -> Result<SchedulerAction> {
        let (next, action) = match (self.state, event) {
            (SchedulerState::Idle, SchedulerEvent::Change { at }) => {
                let deadline = at + self.window;
                (SchedulerState::Debouncing { deadline }, SchedulerAction::ArmTimer(deadline))
            }
            (SchedulerState::Debouncing { .. }, SchedulerEvent::Change { at }) => {
                self.coalesced += 1;
                let deadline = at + self.window;
                (SchedulerState::Debouncing { deadline }, SchedulerAction::ArmTimer(deadline))
            }
            (SchedulerState::Debouncing { deadline }, SchedulerEvent::TimerElapsed { at }) => {
                if at < deadline {
                    // timer from before the last restart
                    (self.state, SchedulerAction::Nothing)
                } else {
                    (SchedulerState::Running { pending: false }, SchedulerAction::StartCycle)
                }
            }
            (SchedulerState::Running { pending }, SchedulerEvent::Change { .. }) => {
                if pending {
                    self.coalesced += 1;
                }
                (SchedulerState::Running { pending: true }, SchedulerAction::Nothing)
            }
            (SchedulerState::Running { pending: false }, SchedulerEvent::CycleFinished { .. }) => {
                (SchedulerState::Idle, SchedulerAction::Nothing)
            }
            (SchedulerState::Running { pending: true }, SchedulerEvent::CycleFinished { at }) => {
                let deadline = at + self.window;
                (SchedulerState::Debouncing { deadline }, SchedulerAction::ArmTimer(deadline))
            }
            (state, event) => {
                return Err(SamError::SchedulerOverload(format!(
                    "unexpected {event:?} in state {state:?}"
                )));
            }
        };
        self.state = next;
        Ok(action)
    }
}
