//! Composite scoring: confidence, freshness and savings

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{InventorySnapshot, Suggestion};

/// Relative weight of each score component
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub confidence: f64,
    pub freshness: f64,
    pub savings: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            confidence: 0.5,
            freshness: 0.3,
            savings: 0.2,
        }
    }
}

impl ScoreWeights {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for (name, w) in [
            ("confidence", self.confidence),
            ("freshness", self.freshness),
            ("savings", self.savings),
        ] {
            if !w.is_finite() || w < 0.0 {
                errors.push(format!("reconcile.weights.{name} must be a non-negative number"));
            }
        }
        if self.confidence + self.freshness + self.savings <= 0.0 {
            errors.push("reconcile.weights must not all be zero".to_string());
        }
        errors
    }

    pub fn combine(&self, confidence: f64, freshness: f64, savings: f64) -> f64 {
        self.confidence * confidence + self.freshness * freshness + self.savings * savings
    }
}

/// Reconciliation policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    pub weights: ScoreWeights,
    /// Items expiring this many days out or later add no freshness
    pub freshness_horizon_days: f64,
    /// Savings of this amount normalize to 0.5
    pub savings_scale: Decimal,
    /// Keep at most this many entries after ranking
    pub max_entries: Option<usize>,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            freshness_horizon_days: 7.0,
            savings_scale: Decimal::TEN,
            max_entries: None,
        }
    }
}

impl ReconcileConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = self.weights.validate();
        if !self.freshness_horizon_days.is_finite() || self.freshness_horizon_days <= 0.0 {
            errors.push("reconcile.freshness_horizon_days must be positive".to_string());
        }
        if self.savings_scale <= Decimal::ZERO {
            errors.push("reconcile.savings_scale must be positive".to_string());
        }
        if self.max_entries == Some(0) {
            errors.push("reconcile.max_entries must be at least 1 when set".to_string());
        }
        errors
    }
}

/// Waste-reduction urgency of a suggestion, in [0, 1].
///
/// The most urgent required item wins. Expired items count as 1, items
/// without an expiry as 0. Days are measured from the snapshot time.
pub fn freshness(snapshot: &InventorySnapshot, suggestion: &Suggestion, horizon_days: f64) -> f64 {
    suggestion
        .requirements
        .iter()
        .filter_map(|req| snapshot.get(&req.item))
        .filter_map(|item| item.days_until_expiry(snapshot.taken_at))
        .map(|days| {
            if days <= 0.0 {
                1.0
            } else {
                (1.0 - days / horizon_days).clamp(0.0, 1.0)
            }
        })
        .fold(0.0, f64::max)
}

/// Savings mapped into [0, 1) with `s / (s + scale)`
pub fn savings_norm(savings: Option<Decimal>, scale: Decimal) -> f64 {
    match savings {
        Some(s) if s > Decimal::ZERO => (s / (s + scale)).to_f64().unwrap_or(0.0),
        _ => 0.0,
    }
}

pub fn nearest_expiry(snapshot: &InventorySnapshot, suggestion: &Suggestion) -> Option<DateTime<Utc>> {
    suggestion
        .requirements
        .iter()
        .filter_map(|req| snapshot.expiry_of(&req.item))
        .min()
}
