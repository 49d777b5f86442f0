use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::domain::{InventorySnapshot, ItemId};
use crate::error::Result;

/// What happened to an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Inserted,
    Restocked,
    Consumed,
    Removed,
}

/// Change notification emitted after every committed store mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryChange {
    /// Store version after the mutation
    pub version: u64,
    pub item: ItemId,
    pub kind: ChangeKind,
}

/// Subscription handle for inventory change notifications.
///
/// Dropping the handle unsubscribes. A slow reader may miss intermediate
/// notifications (`Lagged`); it is still told that something changed.
#[derive(Debug)]
pub struct InventorySubscription {
    receiver: broadcast::Receiver<InventoryChange>,
}

/// Outcome of waiting on a subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionEvent {
    Changed(InventoryChange),
    /// Some notifications were skipped; the store has still changed
    Lagged(u64),
    Closed,
}

impl InventorySubscription {
    pub fn new(receiver: broadcast::Receiver<InventoryChange>) -> Self {
        Self { receiver }
    }

    /// Wait for the next change notification.
    pub async fn next(&mut self) -> SubscriptionEvent {
        match self.receiver.recv().await {
            Ok(change) => SubscriptionEvent::Changed(change),
            Err(broadcast::error::RecvError::Lagged(n)) => SubscriptionEvent::Lagged(n),
            Err(broadcast::error::RecvError::Closed) => SubscriptionEvent::Closed,
        }
    }

    /// Non-blocking poll; `None` when nothing is pending.
    pub fn try_next(&mut self) -> Option<SubscriptionEvent> {
        match self.receiver.try_recv() {
            Ok(change) => Some(SubscriptionEvent::Changed(change)),
            Err(broadcast::error::TryRecvError::Lagged(n)) => Some(SubscriptionEvent::Lagged(n)),
            Err(broadcast::error::TryRecvError::Closed) => Some(SubscriptionEvent::Closed),
            Err(broadcast::error::TryRecvError::Empty) => None,
        }
    }
}

/// Authoritative inventory collaborator.
///
/// Implementations own `InventoryItem` state; the engine never mutates it.
#[async_trait]
pub trait InventoryStore: Send + Sync + 'static {
    /// Immutable copy of all items, tagged with the current store version.
    async fn snapshot(&self) -> Result<InventorySnapshot>;

    /// Register for change notifications.
    fn subscribe(&self) -> InventorySubscription;
}
