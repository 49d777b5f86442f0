//! AgentAdapter trait: bounded-latency proposal interface
//!
//! The engine hands every adapter the same read-only context and a deadline.
//! Adapters return a `Proposal` computed against `ctx.version()` or an
//! `AgentError`; they never see other agents' output.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::context::CoordinationContext;
use crate::domain::{AgentId, Proposal};
use crate::error::AgentError;

/// Agent class, used for timeout and weight lookup only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// Recipe suggestion from on-hand ingredients
    Recipe,
    /// Grocery price optimization (may call external price feeds)
    PriceOptimization,
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentKind::Recipe => write!(f, "recipe"),
            AgentKind::PriceOptimization => write!(f, "price_optimization"),
        }
    }
}

/// Uniform capability wrapper around one recommendation agent.
///
/// `propose()` may be called concurrently for different cycles and may be
/// abandoned by the engine (superseded cycle); it is never force-terminated,
/// so side effects it starts will complete.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AgentAdapter: Send + Sync + 'static {
    /// Stable identity, unique within one engine
    fn identity(&self) -> AgentId;

    fn kind(&self) -> AgentKind;

    /// Produce a proposal for `ctx` before `deadline`.
    async fn propose(
        &self,
        ctx: &CoordinationContext,
        deadline: Instant,
    ) -> Result<Proposal, AgentError>;
}
