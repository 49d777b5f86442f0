//! Seed data for the binary: a small recipe catalog, Ottawa grocery prices
//! and a sample pantry.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::agents::RecipeSpec;
use crate::domain::ItemId;
use crate::inventory::NewItem;
use crate::signals::{ExternalSignals, FlyerDeal, PriceQuote, UserConstraints};

const FLYER_CITY: &str = "Ottawa";

pub fn recipe_catalog() -> Vec<RecipeSpec> {
    vec![
        RecipeSpec::new("bacon-and-eggs", "Bacon and Eggs")
            .ingredient("eggs", dec!(3))
            .ingredient("bacon", dec!(0.5)),
        RecipeSpec::new("mushroom-omelette", "Mushroom Omelette")
            .ingredient("eggs", dec!(3))
            .ingredient("mushrooms", dec!(0.5))
            .ingredient("cheese", dec!(0.25))
            .ingredient("butter", dec!(0.05)),
        RecipeSpec::new("roast-chicken-potatoes", "Roast Chicken with Potatoes")
            .ingredient("chicken", dec!(2))
            .ingredient("potatoes", dec!(2))
            .ingredient("butter", dec!(0.1)),
        RecipeSpec::new("shepherds-pie", "Shepherd's Pie")
            .ingredient("beef", dec!(1))
            .ingredient("potatoes", dec!(3))
            .ingredient("milk", dec!(0.1))
            .ingredient("butter", dec!(0.1)),
        RecipeSpec::new("potato-hash", "Potato and Bacon Hash")
            .ingredient("potatoes", dec!(1.5))
            .ingredient("bacon", dec!(0.5))
            .ingredient("eggs", dec!(2)),
        RecipeSpec::new("grilled-cheese", "Grilled Cheese")
            .ingredient("bread", dec!(0.25))
            .ingredient("cheese", dec!(0.25))
            .ingredient("butter", dec!(0.05)),
        RecipeSpec::new("french-toast", "French Toast")
            .ingredient("bread", dec!(0.5))
            .ingredient("eggs", dec!(2))
            .ingredient("milk", dec!(0.1)),
        RecipeSpec::new("apple-crumble", "Apple Crumble")
            .ingredient("apples", dec!(2))
            .ingredient("butter", dec!(0.25)),
    ]
}

fn flyer_deal(store: &str, price: Decimal, detail: &str, valid_until: NaiveDate) -> FlyerDeal {
    FlyerDeal {
        store: store.to_string(),
        price,
        detail: detail.to_string(),
        location: FLYER_CITY.to_string(),
        valid_until: Some(valid_until),
    }
}

fn quote(regular: Decimal, unit: &str, deals: Vec<FlyerDeal>) -> PriceQuote {
    PriceQuote {
        regular,
        unit: unit.to_string(),
        deals,
    }
}

/// Ottawa flyer deals, valid through `valid_until`, plus standard shelf prices
pub fn ottawa_signals(valid_until: NaiveDate) -> ExternalSignals {
    let deal = |store: &str, price: Decimal, detail: &str| flyer_deal(store, price, detail, valid_until);
    let prices = [
        (
            "chicken",
            quote(
                dec!(6.49),
                "lb",
                vec![
                    deal("Metro", dec!(4.88), "Chicken breast, per lb"),
                    deal("No Frills", dec!(3.99), "Chicken thighs, per lb"),
                    deal("Food Basics", dec!(1.98), "Chicken drumsticks, each"),
                ],
            ),
        ),
        (
            "bacon",
            quote(
                dec!(5.99),
                "pack",
                vec![
                    deal("Metro", dec!(2.99), "Bacon 375g"),
                    deal("Giant Tiger", dec!(3.97), "Bacon 500g"),
                ],
            ),
        ),
        (
            "eggs",
            quote(
                dec!(5.49),
                "dozen",
                vec![
                    deal("Adonis", dec!(7.97), "Large eggs, 30-pack"),
                    deal("Independent", dec!(4.98), "Large eggs, dozen"),
                ],
            ),
        ),
        (
            "potatoes",
            quote(
                dec!(5.99),
                "10lb bag",
                vec![
                    deal("Maxi", dec!(1.88), "Potatoes, 10lb bag"),
                    deal("Metro", dec!(1.88), "Potatoes, 10lb bag"),
                    deal("Independent", dec!(3.50), "Potatoes, 10lb bag"),
                ],
            ),
        ),
        (
            "mushrooms",
            quote(
                dec!(2.99),
                "container",
                vec![
                    deal("No Frills", dec!(1.44), "White mushrooms, 227g"),
                    deal("Maxi", dec!(1.88), "White mushrooms, 227g"),
                ],
            ),
        ),
        (
            "beef",
            quote(
                dec!(6.99),
                "lb",
                vec![
                    deal("Loblaws", dec!(5.25), "Lean ground beef, per lb"),
                    deal("Maxi", dec!(4.88), "Lean ground beef, per lb"),
                ],
            ),
        ),
        ("milk", quote(dec!(5.85), "4L", vec![])),
        ("bread", quote(dec!(3.45), "loaf", vec![])),
        ("butter", quote(dec!(7.25), "454g", vec![])),
        ("cheese", quote(dec!(6.50), "400g", vec![])),
        ("apples", quote(dec!(2.49), "lb", vec![])),
    ];

    ExternalSignals {
        prices: prices
            .into_iter()
            .map(|(item, q)| (ItemId::new(item), q))
            .collect(),
        constraints: UserConstraints::default(),
    }
}

/// A realistic fridge: some items about to expire, some running out
pub fn sample_pantry(now: DateTime<Utc>) -> Vec<NewItem> {
    vec![
        NewItem::new("Eggs", dec!(8), "each").expiring(now + Duration::days(6)),
        NewItem::new("Bacon", dec!(1), "pack").expiring(now + Duration::days(2)),
        NewItem::new("Mushrooms", dec!(1), "container").expiring(now + Duration::days(1)),
        NewItem::new("Potatoes", dec!(5), "lb").expiring(now + Duration::days(20)),
        NewItem::new("Milk", dec!(0.5), "4L").expiring(now + Duration::days(3)),
        NewItem::new("Cheese", dec!(0.5), "400g").expiring(now + Duration::days(10)),
        NewItem::new("Butter", dec!(0.4), "454g").expiring(now + Duration::days(30)),
        NewItem::new("Bread", dec!(1), "loaf").expiring(now + Duration::days(4)),
        NewItem::new("Apples", dec!(0), "lb"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_ids_are_unique() {
        let catalog = recipe_catalog();
        let mut ids: Vec<&str> = catalog.iter().map(|r| r.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), catalog.len());
    }

    #[test]
    fn test_cheapest_chicken_deal() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 19).unwrap();
        let signals = ottawa_signals(today + Duration::days(2));
        let chicken = signals.price_of(&ItemId::new("chicken")).unwrap();
        assert_eq!(chicken.best_deal("Ottawa", today).unwrap().store, "Food Basics");
        assert!(signals.price_of(&ItemId::new("milk")).unwrap().deals.is_empty());
        assert!(chicken.best_deal("Ottawa", today + Duration::days(3)).is_none());
    }
}
