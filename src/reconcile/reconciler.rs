//! Merge proposals into one ranked, feasibility-checked plan

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

use super::scoring::{freshness, nearest_expiry, savings_norm, ReconcileConfig};
use crate::domain::{
    AgentId, Feasibility, InventorySnapshot, ItemId, Plan, PlanEntry, Proposal, Shortfall,
    Suggestion, SuggestionKind,
};
use crate::error::{Result, SamError};
use crate::signals::UserConstraints;

/// A deduplicated suggestion before scoring
struct Candidate {
    suggestion: Suggestion,
    provenance: Vec<AgentId>,
    /// Registration index of the first contributing agent
    first_seen: usize,
}

struct Ranked {
    candidate: Candidate,
    score: f64,
    nearest_expiry: Option<DateTime<Utc>>,
}

/// Stateless merge of one cycle's proposals.
///
/// Pure: the same snapshot, constraints and proposals always give an equal plan.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    config: ReconcileConfig,
}

impl Reconciler {
    pub fn new(config: ReconcileConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Reconcile proposals given in agent registration order.
    pub fn reconcile(
        &self,
        snapshot: &InventorySnapshot,
        constraints: &UserConstraints,
        proposals: &[Proposal],
    ) -> Result<Plan> {
        if let Some(stale) = proposals
            .iter()
            .find(|p| p.snapshot_version != snapshot.version)
        {
            return Err(SamError::SnapshotVersionMismatch {
                expected: snapshot.version,
                found: stale.snapshot_version,
                agent_id: stale.agent_id.to_string(),
            });
        }

        let candidates = dedup(proposals, constraints);
        let mut ranked: Vec<Ranked> = candidates
            .into_iter()
            .map(|candidate| self.score(snapshot, candidate))
            .collect();
        ranked.sort_by(compare_ranked);

        let mut entries = allocate(snapshot, ranked);
        if let Some(max) = self.config.max_entries {
            entries.truncate(max);
        }

        debug!(
            version = snapshot.version,
            proposals = proposals.len(),
            entries = entries.len(),
            ready = entries.iter().filter(|e| e.is_feasible()).count(),
            "reconcile: plan built"
        );

        Ok(Plan {
            snapshot_version: snapshot.version,
            entries,
        })
    }

    fn score(&self, snapshot: &InventorySnapshot, candidate: Candidate) -> Ranked {
        let s = &candidate.suggestion;
        let fresh = freshness(snapshot, s, self.config.freshness_horizon_days);
        let savings = savings_norm(s.estimated_savings, self.config.savings_scale);
        let score = self.config.weights.combine(s.confidence, fresh, savings);
        Ranked {
            nearest_expiry: nearest_expiry(snapshot, s),
            score,
            candidate,
        }
    }
}

/// The item a shopping suggestion is about
fn shopping_item(suggestion: &Suggestion) -> Option<ItemId> {
    if suggestion.kind != SuggestionKind::Shopping {
        return None;
    }
    suggestion
        .metadata
        .get("item")
        .map(ItemId::new)
        .or_else(|| suggestion.key.strip_prefix("shop:").map(ItemId::new))
}

/// Collapse suggestions sharing a key. The highest confidence instance wins,
/// ties go to the earlier agent, and every contributor is kept as provenance.
fn dedup(proposals: &[Proposal], constraints: &UserConstraints) -> Vec<Candidate> {
    let mut by_key: BTreeMap<String, Candidate> = BTreeMap::new();

    for (index, proposal) in proposals.iter().enumerate() {
        for suggestion in &proposal.suggestions {
            if shopping_item(suggestion).is_some_and(|item| constraints.excludes(&item)) {
                continue;
            }
            match by_key.get_mut(&suggestion.key) {
                Some(existing) => {
                    if !existing.provenance.contains(&proposal.agent_id) {
                        existing.provenance.push(proposal.agent_id.clone());
                    }
                    if suggestion.confidence > existing.suggestion.confidence {
                        existing.suggestion = suggestion.clone();
                    }
                }
                None => {
                    by_key.insert(
                        suggestion.key.clone(),
                        Candidate {
                            suggestion: suggestion.clone(),
                            provenance: vec![proposal.agent_id.clone()],
                            first_seen: index,
                        },
                    );
                }
            }
        }
    }

    by_key.into_values().collect()
}

/// Score desc, nearest expiry asc (none last), registration order, key.
fn compare_ranked(a: &Ranked, b: &Ranked) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| match (a.nearest_expiry, b.nearest_expiry) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.candidate.first_seen.cmp(&b.candidate.first_seen))
        .then_with(|| a.candidate.suggestion.key.cmp(&b.candidate.suggestion.key))
}

/// Greedy allocation in rank order. An entry reserves all of its
/// requirements or none of them.
fn allocate(snapshot: &InventorySnapshot, ranked: Vec<Ranked>) -> Vec<PlanEntry> {
    let mut remaining: BTreeMap<ItemId, Decimal> = snapshot
        .items
        .iter()
        .map(|(id, item)| (id.clone(), item.quantity))
        .collect();

    ranked
        .into_iter()
        .map(|r| {
            let needed = total_needed(&r.candidate.suggestion);
            let feasibility = check(snapshot, &remaining, &needed);
            if feasibility.is_ready() {
                for (item, qty) in &needed {
                    if let Some(left) = remaining.get_mut(item) {
                        *left -= *qty;
                    }
                }
            }
            PlanEntry {
                suggestion: r.candidate.suggestion,
                provenance: r.candidate.provenance,
                score: r.score,
                nearest_expiry: r.nearest_expiry,
                feasibility,
            }
        })
        .collect()
}

fn total_needed(suggestion: &Suggestion) -> BTreeMap<ItemId, Decimal> {
    let mut needed: BTreeMap<ItemId, Decimal> = BTreeMap::new();
    for req in &suggestion.requirements {
        if req.quantity > Decimal::ZERO {
            *needed.entry(req.item.clone()).or_insert(Decimal::ZERO) += req.quantity;
        }
    }
    needed
}

fn check(
    snapshot: &InventorySnapshot,
    remaining: &BTreeMap<ItemId, Decimal>,
    needed: &BTreeMap<ItemId, Decimal>,
) -> Feasibility {
    let never_enough: Vec<Shortfall> = needed
        .iter()
        .filter_map(|(item, qty)| {
            let on_hand = snapshot.quantity_of(item);
            (*qty > on_hand).then(|| Shortfall {
                item: item.clone(),
                needed: *qty,
                available: on_hand,
            })
        })
        .collect();
    if !never_enough.is_empty() {
        return Feasibility::Infeasible {
            shortfalls: never_enough,
        };
    }

    let taken: Vec<Shortfall> = needed
        .iter()
        .filter_map(|(item, qty)| {
            let left = remaining.get(item).copied().unwrap_or(Decimal::ZERO);
            (*qty > left).then(|| Shortfall {
                item: item.clone(),
                needed: *qty,
                available: left,
            })
        })
        .collect();
    if taken.is_empty() {
        Feasibility::Ready
    } else {
        Feasibility::RequiresRestock { shortfalls: taken }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InventoryItem;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 18, 8, 0, 0).unwrap()
    }

    fn snapshot(version: u64) -> InventorySnapshot {
        InventorySnapshot::new(
            version,
            now(),
            vec![
                InventoryItem::new("eggs", dec!(4), "each").with_expiry(now() + Duration::days(3)),
                InventoryItem::new("bacon", dec!(1), "pack").with_expiry(now() + Duration::days(1)),
                InventoryItem::new("flour", dec!(2), "kg"),
            ],
        )
    }

    fn proposal(agent: &str, version: u64, suggestions: Vec<Suggestion>) -> Proposal {
        Proposal::new(AgentId::new(agent), version, suggestions)
    }

    fn recipe(key: &str, confidence: f64) -> Suggestion {
        Suggestion::new(key, key, SuggestionKind::Recipe, confidence)
    }

    #[test]
    fn test_scarce_item_goes_to_higher_score() {
        let r = Reconciler::default();
        let plan = r
            .reconcile(
                &snapshot(1),
                &UserConstraints::default(),
                &[proposal(
                    "recipes",
                    1,
                    vec![
                        recipe("recipe:b", 0.6).requires("eggs", dec!(3)),
                        recipe("recipe:a", 0.9).requires("eggs", dec!(3)),
                    ],
                )],
            )
            .unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!(plan.entries[0].suggestion.key, "recipe:a");
        assert!(plan.entries[0].feasibility.is_ready());
        assert_eq!(
            plan.entries[1].feasibility,
            Feasibility::RequiresRestock {
                shortfalls: vec![Shortfall {
                    item: ItemId::new("eggs"),
                    needed: dec!(3),
                    available: dec!(1),
                }]
            }
        );
    }

    #[test]
    fn test_never_enough_is_infeasible() {
        let r = Reconciler::default();
        let plan = r
            .reconcile(
                &snapshot(1),
                &UserConstraints::default(),
                &[proposal(
                    "recipes",
                    1,
                    vec![recipe("recipe:cake", 0.9).requires("flour", dec!(5))],
                )],
            )
            .unwrap();
        assert!(matches!(
            plan.entries[0].feasibility,
            Feasibility::Infeasible { .. }
        ));
    }

    #[test]
    fn test_dedup_keeps_highest_confidence_and_all_provenance() {
        let r = Reconciler::default();
        let plan = r
            .reconcile(
                &snapshot(2),
                &UserConstraints::default(),
                &[
                    proposal("catalog", 2, vec![recipe("recipe:1", 0.4).with_metadata("src", "catalog")]),
                    proposal("api", 2, vec![recipe("recipe:1", 0.8).with_metadata("src", "api")]),
                ],
            )
            .unwrap();
        assert_eq!(plan.len(), 1);
        let entry = &plan.entries[0];
        assert_eq!(entry.suggestion.confidence, 0.8);
        assert_eq!(entry.suggestion.metadata.get("src").map(String::as_str), Some("api"));
        assert_eq!(entry.provenance, vec![AgentId::new("catalog"), AgentId::new("api")]);
    }

    #[test]
    fn test_ties_break_on_expiry_then_registration() {
        let r = Reconciler::new(ReconcileConfig {
            weights: crate::reconcile::ScoreWeights {
                confidence: 1.0,
                freshness: 0.0,
                savings: 0.0,
            },
            ..ReconcileConfig::default()
        });
        let plan = r
            .reconcile(
                &snapshot(1),
                &UserConstraints::default(),
                &[
                    proposal("first", 1, vec![recipe("recipe:z", 0.5)]),
                    proposal(
                        "second",
                        1,
                        vec![
                            recipe("recipe:y", 0.5),
                            recipe("recipe:x", 0.5).requires("eggs", dec!(1)),
                            recipe("recipe:w", 0.5).requires("bacon", dec!(1)),
                        ],
                    ),
                ],
            )
            .unwrap();
        let keys: Vec<&str> = plan.entries.iter().map(|e| e.suggestion.key.as_str()).collect();
        assert_eq!(keys, vec!["recipe:w", "recipe:x", "recipe:z", "recipe:y"]);
    }

    #[test]
    fn test_excluded_shopping_items_dropped() {
        let r = Reconciler::default();
        let constraints = UserConstraints {
            excluded_items: vec![ItemId::new("bacon")],
            ..UserConstraints::default()
        };
        let plan = r
            .reconcile(
                &snapshot(1),
                &constraints,
                &[proposal(
                    "flyer",
                    1,
                    vec![
                        Suggestion::new("shop:bacon", "Buy bacon", SuggestionKind::Shopping, 0.9),
                        Suggestion::new("shop:eggs", "Buy eggs", SuggestionKind::Shopping, 0.7)
                            .with_savings(dec!(3)),
                        recipe("recipe:blt", 0.5).requires("bacon", dec!(1)),
                    ],
                )],
            )
            .unwrap();
        assert!(plan.entry("shop:bacon").is_none());
        assert!(plan.entry("shop:eggs").is_some());
        assert!(plan.entry("recipe:blt").is_some());
    }

    #[test]
    fn test_version_mismatch_is_fatal() {
        let r = Reconciler::default();
        let err = r
            .reconcile(
                &snapshot(3),
                &UserConstraints::default(),
                &[proposal("recipes", 2, vec![])],
            )
            .unwrap_err();
        assert!(matches!(
            err,
            SamError::SnapshotVersionMismatch {
                expected: 3,
                found: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_max_entries_truncates_after_ranking() {
        let r = Reconciler::new(ReconcileConfig {
            max_entries: Some(1),
            ..ReconcileConfig::default()
        });
        let plan = r
            .reconcile(
                &snapshot(1),
                &UserConstraints::default(),
                &[proposal("recipes", 1, vec![recipe("recipe:low", 0.1), recipe("recipe:high", 0.9)])],
            )
            .unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.entries[0].suggestion.key, "recipe:high");
    }

    #[test]
    fn test_no_proposals_gives_empty_plan() {
        let plan = Reconciler::default()
            .reconcile(&snapshot(5), &UserConstraints::default(), &[])
            .unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.snapshot_version, 5);
    }
}
