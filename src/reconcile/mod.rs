//! Reconciliation / ranking layer
//!
//! Turns the proposals of one cycle into a single plan: duplicates merged,
//! entries scored and ordered, scarce inventory allocated greedily so lower
//! ranked entries are flagged rather than dropped.

pub mod reconciler;
pub mod scoring;

pub use reconciler::Reconciler;
pub use scoring::{freshness, nearest_expiry, savings_norm, ReconcileConfig, ScoreWeights};
