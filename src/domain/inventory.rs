use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Inventory item identity: the normalized product name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// One perishable (or shelf-stable) item on hand.
///
/// Quantity never goes below zero; the store rejects mutations that would.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: ItemId,
    pub quantity: Decimal,
    pub unit: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    pub fn new(name: impl AsRef<str>, quantity: Decimal, unit: impl Into<String>) -> Self {
        Self {
            id: ItemId::new(name),
            quantity: quantity.max(Decimal::ZERO),
            unit: unit.into(),
            expires_at: None,
            updated_at: Utc::now(),
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn is_depleted(&self) -> bool {
        self.quantity <= Decimal::ZERO
    }

    /// Whole days until expiry, measured from `now`. Negative once expired.
    pub fn days_until_expiry(&self, now: DateTime<Utc>) -> Option<f64> {
        self.expires_at
            .map(|exp| exp.signed_duration_since(now).num_seconds() as f64 / 86_400.0)
    }
}

/// Immutable, versioned copy of the whole inventory.
///
/// The engine computes every cycle against exactly one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    pub version: u64,
    pub taken_at: DateTime<Utc>,
    pub items: BTreeMap<ItemId, InventoryItem>,
}

impl InventorySnapshot {
    pub fn new(version: u64, taken_at: DateTime<Utc>, items: Vec<InventoryItem>) -> Self {
        Self {
            version,
            taken_at,
            items: items.into_iter().map(|i| (i.id.clone(), i)).collect(),
        }
    }

    pub fn empty(version: u64) -> Self {
        Self::new(version, Utc::now(), Vec::new())
    }

    pub fn get(&self, item: &ItemId) -> Option<&InventoryItem> {
        self.items.get(item)
    }

    /// Quantity on hand; zero for unknown items.
    pub fn quantity_of(&self, item: &ItemId) -> Decimal {
        self.items
            .get(item)
            .map(|i| i.quantity)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn expiry_of(&self, item: &ItemId) -> Option<DateTime<Utc>> {
        self.items.get(item).and_then(|i| i.expires_at)
    }

    /// Items with stock on hand, in id order.
    pub fn available(&self) -> impl Iterator<Item = &InventoryItem> {
        self.items.values().filter(|i| !i.is_depleted())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    #[test]
    fn test_item_id_normalizes() {
        assert_eq!(ItemId::new("  Chicken Thighs "), ItemId::new("chicken thighs"));
        assert_eq!(ItemId::new("EGGS").as_str(), "eggs");
    }

    #[test]
    fn test_item_quantity_clamped() {
        let item = InventoryItem::new("milk", dec!(-2), "L");
        assert_eq!(item.quantity, Decimal::ZERO);
        assert!(item.is_depleted());
    }

    #[test]
    fn test_snapshot_lookups() {
        let now = Utc::now();
        let snap = InventorySnapshot::new(
            3,
            now,
            vec![
                InventoryItem::new("eggs", dec!(6), "ea").with_expiry(now + Duration::days(5)),
                InventoryItem::new("flour", dec!(0), "kg"),
            ],
        );
        assert_eq!(snap.quantity_of(&"eggs".into()), dec!(6));
        assert_eq!(snap.quantity_of(&"bacon".into()), Decimal::ZERO);
        assert!(snap.expiry_of(&"eggs".into()).is_some());
        assert_eq!(snap.available().count(), 1);
    }

    #[test]
    fn test_days_until_expiry() {
        let now = Utc::now();
        let item = InventoryItem::new("spinach", dec!(1), "bag").with_expiry(now + Duration::days(2));
        let days = item.days_until_expiry(now).unwrap();
        assert!((days - 2.0).abs() < 1e-6);
    }
}
