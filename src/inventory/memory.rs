//! In-memory inventory store
//!
//! Mirrors the household pantry operations (batch insert, list, restock,
//! consume, remove). Every committed mutation bumps the store version and is
//! broadcast to subscribers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

use super::store::{ChangeKind, InventoryChange, InventoryStore, InventorySubscription};
use crate::domain::{InventoryItem, InventorySnapshot, ItemId};
use crate::error::{Result, SamError};

const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Row accepted by `insert_items` (and by JSON seed files)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub product_name: String,
    pub quantity: Decimal,
    pub unit: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewItem {
    pub fn new(product_name: impl Into<String>, quantity: Decimal, unit: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
            quantity,
            unit: unit.into(),
            expires_at: None,
        }
    }

    pub fn expiring(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

#[derive(Debug, Default)]
struct StoreState {
    version: u64,
    items: BTreeMap<ItemId, InventoryItem>,
}

/// Reference `InventoryStore` backed by a `BTreeMap`
pub struct InMemoryInventoryStore {
    state: RwLock<StoreState>,
    changes: broadcast::Sender<InventoryChange>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            state: RwLock::new(StoreState::default()),
            changes,
        }
    }

    /// Current store version (bumped once per committed mutation)
    pub async fn version(&self) -> u64 {
        self.state.read().await.version
    }

    /// Insert a batch of rows. Existing items are restocked with the row's quantity.
    ///
    /// Returns the number of rows applied.
    pub async fn insert_items(&self, items: Vec<NewItem>) -> Result<usize> {
        if items.is_empty() {
            return Err(SamError::Validation("No items provided".into()));
        }
        for row in &items {
            if row.product_name.trim().is_empty() {
                return Err(SamError::Validation("product_name cannot be empty".into()));
            }
            if row.quantity < Decimal::ZERO {
                return Err(SamError::Validation(format!(
                    "quantity for {} cannot be negative",
                    row.product_name
                )));
            }
        }

        let mut state = self.state.write().await;
        state.version += 1;
        let version = state.version;
        let now = Utc::now();
        let mut touched = Vec::with_capacity(items.len());

        for row in items {
            let id = ItemId::new(&row.product_name);
            let kind = match state.items.get_mut(&id) {
                Some(existing) => {
                    apply_restock(existing, row.quantity, row.expires_at, now);
                    ChangeKind::Restocked
                }
                None => {
                    let mut item = InventoryItem::new(&row.product_name, row.quantity, row.unit);
                    item.expires_at = row.expires_at;
                    item.updated_at = now;
                    state.items.insert(id.clone(), item);
                    ChangeKind::Inserted
                }
            };
            touched.push((id, kind));
        }

        let inserted = touched.len();
        for (item, kind) in touched {
            self.notify(InventoryChange {
                version,
                item,
                kind,
            });
        }
        info!(version, inserted, "inventory: inserted rows");
        Ok(inserted)
    }

    /// Most recently updated items first, at most `limit`.
    pub async fn list_items(&self, limit: usize) -> Vec<InventoryItem> {
        let state = self.state.read().await;
        let mut items: Vec<InventoryItem> = state.items.values().cloned().collect();
        items.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        items.truncate(limit);
        items
    }

    pub async fn get(&self, name: &str) -> Option<InventoryItem> {
        self.state.read().await.items.get(&ItemId::new(name)).cloned()
    }

    /// Add stock. This is the only operation that may move an expiry date, and
    /// it only moves it later unless the item had been fully used up.
    pub async fn restock(
        &self,
        name: &str,
        quantity: Decimal,
        unit: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<InventoryItem> {
        if quantity <= Decimal::ZERO {
            return Err(SamError::Validation(format!(
                "restock quantity for {} must be positive",
                name
            )));
        }
        let id = ItemId::new(name);
        if id.is_empty() {
            return Err(SamError::Validation("product_name cannot be empty".into()));
        }

        let mut state = self.state.write().await;
        state.version += 1;
        let version = state.version;
        let now = Utc::now();

        let (item, kind) = match state.items.get_mut(&id) {
            Some(existing) => {
                apply_restock(existing, quantity, expires_at, now);
                (existing.clone(), ChangeKind::Restocked)
            }
            None => {
                let mut item = InventoryItem::new(name, quantity, unit);
                item.expires_at = expires_at;
                item.updated_at = now;
                state.items.insert(id.clone(), item.clone());
                (item, ChangeKind::Inserted)
            }
        };

        debug!(version, item = %id, quantity = %item.quantity, "inventory: restocked");
        self.notify(InventoryChange {
            version,
            item: id,
            kind,
        });
        Ok(item)
    }

    /// Use up stock. Fails rather than letting the quantity go negative.
    pub async fn consume(&self, name: &str, quantity: Decimal) -> Result<InventoryItem> {
        if quantity <= Decimal::ZERO {
            return Err(SamError::Validation(format!(
                "consume quantity for {} must be positive",
                name
            )));
        }
        let id = ItemId::new(name);

        let mut state = self.state.write().await;
        let existing = state
            .items
            .get(&id)
            .ok_or_else(|| SamError::ItemNotFound(id.to_string()))?;
        if quantity > existing.quantity {
            return Err(SamError::Inventory(format!(
                "cannot consume {} {} of {}, only {} on hand",
                quantity, existing.unit, id, existing.quantity
            )));
        }

        state.version += 1;
        let version = state.version;
        let item = match state.items.get_mut(&id) {
            Some(item) => {
                item.quantity -= quantity;
                item.updated_at = Utc::now();
                item.clone()
            }
            None => return Err(SamError::ItemNotFound(id.to_string())),
        };

        debug!(version, item = %id, remaining = %item.quantity, "inventory: consumed");
        self.notify(InventoryChange {
            version,
            item: id,
            kind: ChangeKind::Consumed,
        });
        Ok(item)
    }

    pub async fn remove(&self, name: &str) -> Result<InventoryItem> {
        let id = ItemId::new(name);
        let mut state = self.state.write().await;
        let removed = state
            .items
            .remove(&id)
            .ok_or_else(|| SamError::ItemNotFound(id.to_string()))?;
        state.version += 1;
        let version = state.version;

        self.notify(InventoryChange {
            version,
            item: id,
            kind: ChangeKind::Removed,
        });
        Ok(removed)
    }

    fn notify(&self, change: InventoryChange) {
        // No subscribers is fine; the store is still authoritative.
        let _ = self.changes.send(change);
    }
}

impl Default for InMemoryInventoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_restock(
    item: &mut InventoryItem,
    quantity: Decimal,
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) {
    if item.is_depleted() {
        item.expires_at = expires_at;
    } else if expires_at.is_some() {
        item.expires_at = item.expires_at.max(expires_at);
    }
    item.quantity += quantity;
    item.updated_at = now;
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn snapshot(&self) -> Result<InventorySnapshot> {
        let state = self.state.read().await;
        Ok(InventorySnapshot {
            version: state.version,
            taken_at: Utc::now(),
            items: state.items.clone(),
        })
    }

    fn subscribe(&self) -> InventorySubscription {
        InventorySubscription::new(self.changes.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::SubscriptionEvent;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_insert_rejects_empty_batch() {
        let store = InMemoryInventoryStore::new();
        let err = store.insert_items(vec![]).await.unwrap_err();
        assert!(matches!(err, SamError::Validation(_)));
        assert_eq!(store.version().await, 0);
    }

    #[tokio::test]
    async fn test_insert_bumps_version_once_per_batch() {
        let store = InMemoryInventoryStore::new();
        let n = store
            .insert_items(vec![
                NewItem::new("Eggs", dec!(12), "ea"),
                NewItem::new("Milk", dec!(4), "L"),
            ])
            .await
            .unwrap();
        assert_eq!(n, 2);
        let snap = store.snapshot().await.unwrap();
        assert_eq!(snap.version, 1);
        assert_eq!(snap.quantity_of(&"eggs".into()), dec!(12));
    }

    #[tokio::test]
    async fn test_consume_cannot_go_negative() {
        let store = InMemoryInventoryStore::new();
        store.restock("bacon", dec!(2), "pack", None).await.unwrap();
        let err = store.consume("bacon", dec!(3)).await.unwrap_err();
        assert!(matches!(err, SamError::Inventory(_)));
        let item = store.consume("bacon", dec!(2)).await.unwrap();
        assert_eq!(item.quantity, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_consume_unknown_item() {
        let store = InMemoryInventoryStore::new();
        let err = store.consume("caviar", dec!(1)).await.unwrap_err();
        assert!(matches!(err, SamError::ItemNotFound(_)));
    }

    #[tokio::test]
    async fn test_restock_only_extends_expiry() {
        let store = InMemoryInventoryStore::new();
        let now = Utc::now();
        let early = now + Duration::days(2);
        let late = now + Duration::days(6);

        store.restock("spinach", dec!(1), "bag", Some(late)).await.unwrap();
        let item = store.restock("spinach", dec!(1), "bag", Some(early)).await.unwrap();
        assert_eq!(item.expires_at, Some(late));
        assert_eq!(item.quantity, dec!(2));

        // consuming never touches expiry
        let item = store.consume("spinach", dec!(1)).await.unwrap();
        assert_eq!(item.expires_at, Some(late));
    }

    #[tokio::test]
    async fn test_restock_after_depletion_takes_new_expiry() {
        let store = InMemoryInventoryStore::new();
        let now = Utc::now();
        store
            .restock("yogurt", dec!(1), "tub", Some(now + Duration::days(10)))
            .await
            .unwrap();
        store.consume("yogurt", dec!(1)).await.unwrap();
        let fresh = now + Duration::days(3);
        let item = store.restock("yogurt", dec!(1), "tub", Some(fresh)).await.unwrap();
        assert_eq!(item.expires_at, Some(fresh));
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let store = InMemoryInventoryStore::new();
        let mut sub = store.subscribe();
        store.restock("potatoes", dec!(10), "lb", None).await.unwrap();
        store.consume("potatoes", dec!(3)).await.unwrap();

        match sub.next().await {
            SubscriptionEvent::Changed(c) => {
                assert_eq!(c.version, 1);
                assert_eq!(c.kind, ChangeKind::Inserted);
            }
            other => panic!("unexpected {:?}", other),
        }
        match sub.next().await {
            SubscriptionEvent::Changed(c) => {
                assert_eq!(c.version, 2);
                assert_eq!(c.kind, ChangeKind::Consumed);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(sub.try_next().is_none());
    }

    #[tokio::test]
    async fn test_list_items_limit() {
        let store = InMemoryInventoryStore::new();
        store
            .insert_items(vec![
                NewItem::new("a", dec!(1), "ea"),
                NewItem::new("b", dec!(1), "ea"),
                NewItem::new("c", dec!(1), "ea"),
            ])
            .await
            .unwrap();
        assert_eq!(store.list_items(2).await.len(), 2);
        assert_eq!(store.list_items(100).await.len(), 3);
    }
}
