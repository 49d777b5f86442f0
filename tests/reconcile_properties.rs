//! Reconciliation invariants over generated proposal sets

use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use sam::domain::{
    AgentId, Feasibility, InventoryItem, InventorySnapshot, ItemId, Proposal, Suggestion,
    SuggestionKind,
};
use sam::reconcile::{ReconcileConfig, Reconciler};
use sam::signals::UserConstraints;
use std::collections::{BTreeMap, BTreeSet};

const ITEMS: [&str; 5] = ["eggs", "milk", "flour", "butter", "cheese"];
const AGENTS: [&str; 3] = ["catalog", "spoonacular", "flyer"];

/// Small deterministic generator so failures reproduce
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }
}

struct Case {
    snapshot: InventorySnapshot,
    proposals: Vec<Proposal>,
}

fn generate(seed: u64) -> Case {
    let mut rng = Lcg(seed);
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
    let version = 1 + rng.below(100);

    let items = ITEMS
        .iter()
        .map(|name| {
            let item = InventoryItem::new(name, Decimal::from(rng.below(7)), "each");
            match rng.below(3) {
                0 => item,
                _ => item.with_expiry(now + Duration::days(rng.below(12) as i64 - 1)),
            }
        })
        .collect();
    let snapshot = InventorySnapshot::new(version, now, items);

    let proposals = AGENTS
        .iter()
        .map(|agent| {
            let mut keys = BTreeSet::new();
            for _ in 0..rng.below(6) {
                keys.insert(rng.below(8));
            }
            let suggestions = keys
                .into_iter()
                .map(|k| {
                    let confidence = rng.below(11) as f64 / 10.0;
                    let mut s = Suggestion::new(
                        format!("recipe:k{k}"),
                        format!("Recipe {k}"),
                        SuggestionKind::Recipe,
                        confidence,
                    );
                    let mut used = BTreeSet::new();
                    for _ in 0..rng.below(3) {
                        used.insert(rng.below(ITEMS.len() as u64) as usize);
                    }
                    for i in used {
                        s = s.requires(ITEMS[i], Decimal::from(1 + rng.below(4)));
                    }
                    s
                })
                .collect();
            Proposal::new(AgentId::new(*agent), version, suggestions)
        })
        .collect();

    Case {
        snapshot,
        proposals,
    }
}

fn reconciler() -> Reconciler {
    Reconciler::new(ReconcileConfig::default())
}

#[test]
fn test_reconcile_is_pure() {
    for seed in 0..200 {
        let case = generate(seed);
        let constraints = UserConstraints::default();
        let a = reconciler()
            .reconcile(&case.snapshot, &constraints, &case.proposals)
            .unwrap();
        let b = reconciler()
            .reconcile(&case.snapshot, &constraints, &case.proposals)
            .unwrap();
        assert_eq!(a, b, "seed {seed}");
    }
}

#[test]
fn test_scores_are_non_increasing() {
    for seed in 0..200 {
        let case = generate(seed);
        let plan = reconciler()
            .reconcile(&case.snapshot, &UserConstraints::default(), &case.proposals)
            .unwrap();
        for pair in plan.entries.windows(2) {
            assert!(pair[0].score >= pair[1].score, "seed {seed}: {pair:?}");
        }
    }
}

#[test]
fn test_every_distinct_suggestion_appears_once() {
    for seed in 0..200 {
        let case = generate(seed);
        let plan = reconciler()
            .reconcile(&case.snapshot, &UserConstraints::default(), &case.proposals)
            .unwrap();

        let proposed: BTreeSet<&str> = case
            .proposals
            .iter()
            .flat_map(|p| p.suggestions.iter().map(|s| s.key.as_str()))
            .collect();
        let planned: Vec<&str> = plan
            .entries
            .iter()
            .map(|e| e.suggestion.key.as_str())
            .collect();
        let unique: BTreeSet<&str> = planned.iter().copied().collect();

        assert_eq!(planned.len(), unique.len(), "seed {seed}: duplicate keys");
        assert_eq!(unique, proposed, "seed {seed}");
    }
}

#[test]
fn test_ready_entries_never_overdraw_inventory() {
    for seed in 0..200 {
        let case = generate(seed);
        let plan = reconciler()
            .reconcile(&case.snapshot, &UserConstraints::default(), &case.proposals)
            .unwrap();

        let mut reserved: BTreeMap<ItemId, Decimal> = BTreeMap::new();
        for entry in plan.entries.iter().filter(|e| e.feasibility.is_ready()) {
            for req in &entry.suggestion.requirements {
                *reserved.entry(req.item.clone()).or_default() += req.quantity;
            }
        }
        for (item, total) in reserved {
            assert!(
                total <= case.snapshot.quantity_of(&item),
                "seed {seed}: {item} reserved {total}"
            );
        }
    }
}

#[test]
fn test_feasibility_classes_match_snapshot_stock() {
    for seed in 0..200 {
        let case = generate(seed);
        let plan = reconciler()
            .reconcile(&case.snapshot, &UserConstraints::default(), &case.proposals)
            .unwrap();

        for entry in &plan.entries {
            let fits_alone = entry
                .suggestion
                .requirements
                .iter()
                .all(|r| r.quantity <= case.snapshot.quantity_of(&r.item));
            match &entry.feasibility {
                Feasibility::Infeasible { shortfalls } => {
                    assert!(!fits_alone, "seed {seed}");
                    assert!(!shortfalls.is_empty());
                }
                Feasibility::RequiresRestock { shortfalls } => {
                    assert!(fits_alone, "seed {seed}");
                    assert!(!shortfalls.is_empty());
                }
                Feasibility::Ready => assert!(fits_alone, "seed {seed}"),
            }
        }
    }
}

#[test]
fn test_provenance_follows_registration_order() {
    for seed in 0..200 {
        let case = generate(seed);
        let plan = reconciler()
            .reconcile(&case.snapshot, &UserConstraints::default(), &case.proposals)
            .unwrap();

        for entry in &plan.entries {
            let positions: Vec<usize> = entry
                .provenance
                .iter()
                .map(|id| AGENTS.iter().position(|a| *a == id.as_str()).unwrap())
                .collect();
            assert!(
                positions.windows(2).all(|w| w[0] < w[1]),
                "seed {seed}: {:?}",
                entry.provenance
            );
        }
    }
}

#[test]
fn test_suggestion_order_within_a_proposal_does_not_matter() {
    for seed in 0..100 {
        let case = generate(seed);
        let mut reversed = case.proposals.clone();
        for proposal in &mut reversed {
            proposal.suggestions.reverse();
        }
        let constraints = UserConstraints::default();
        let a = reconciler()
            .reconcile(&case.snapshot, &constraints, &case.proposals)
            .unwrap();
        let b = reconciler()
            .reconcile(&case.snapshot, &constraints, &reversed)
            .unwrap();
        assert_eq!(a, b, "seed {seed}");
    }
}

#[test]
fn test_four_eggs_two_omelette_recipes() {
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
    let snapshot = InventorySnapshot::new(
        9,
        now,
        vec![InventoryItem::new("eggs", Decimal::from(4), "each")
            .with_expiry(now + Duration::days(2))],
    );
    let proposals = vec![
        Proposal::new(
            AgentId::new("catalog"),
            9,
            vec![Suggestion::new("recipe:omelette", "Omelette", SuggestionKind::Recipe, 0.9)
                .requires("eggs", Decimal::from(3))],
        ),
        Proposal::new(
            AgentId::new("spoonacular"),
            9,
            vec![Suggestion::new("recipe:shakshuka", "Shakshuka", SuggestionKind::Recipe, 0.7)
                .requires("eggs", Decimal::from(3))],
        ),
    ];

    let plan = reconciler()
        .reconcile(&snapshot, &UserConstraints::default(), &proposals)
        .unwrap();

    assert_eq!(plan.entries[0].suggestion.key, "recipe:omelette");
    assert_eq!(plan.entries[0].feasibility, Feasibility::Ready);
    assert_eq!(plan.entries[1].suggestion.key, "recipe:shakshuka");
    let shortfalls = plan.entries[1].feasibility.shortfalls();
    assert!(matches!(
        plan.entries[1].feasibility,
        Feasibility::RequiresRestock { .. }
    ));
    assert_eq!(shortfalls[0].item, ItemId::new("eggs"));
    assert_eq!(shortfalls[0].needed, Decimal::from(3));
    assert_eq!(shortfalls[0].available, Decimal::from(1));
}
