//! External signals: grocery prices and user constraints
//!
//! Signals are read once per coordination cycle and frozen into the
//! `CoordinationContext`. Price updates are broadcast so the scheduler can
//! re-trigger a cycle when prices move.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use crate::domain::ItemId;
use crate::error::Result;

/// A time-limited flyer deal at one store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlyerDeal {
    pub store: String,
    pub price: Decimal,
    pub detail: String,
    /// City or region the flyer applies to
    pub location: String,
    pub valid_until: Option<NaiveDate>,
}

impl FlyerDeal {
    pub fn is_active(&self, today: NaiveDate) -> bool {
        self.valid_until.map_or(true, |until| today <= until)
    }
}

/// Known prices for one item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Typical shelf price when not on sale
    pub regular: Decimal,
    pub unit: String,
    #[serde(default)]
    pub deals: Vec<FlyerDeal>,
}

impl PriceQuote {
    /// Cheapest active deal for `location` (case-insensitive), ties broken by store name.
    pub fn best_deal(&self, location: &str, today: NaiveDate) -> Option<&FlyerDeal> {
        self.deals
            .iter()
            .filter(|d| d.is_active(today) && d.location.eq_ignore_ascii_case(location))
            .min_by(|a, b| a.price.cmp(&b.price).then_with(|| a.store.cmp(&b.store)))
    }
}

/// Household preferences that shape suggestions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConstraints {
    pub location: String,
    /// Items the household never wants suggested for purchase
    pub excluded_items: Vec<ItemId>,
    /// Items to price-check even when stock is not low
    pub watch_list: Vec<ItemId>,
}

impl Default for UserConstraints {
    fn default() -> Self {
        Self {
            location: "Ottawa".to_string(),
            excluded_items: Vec::new(),
            watch_list: Vec::new(),
        }
    }
}

impl UserConstraints {
    pub fn excludes(&self, item: &ItemId) -> bool {
        self.excluded_items.contains(item)
    }
}

/// Prices and constraints frozen for one cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalSignals {
    pub prices: BTreeMap<ItemId, PriceQuote>,
    pub constraints: UserConstraints,
}

impl ExternalSignals {
    pub fn price_of(&self, item: &ItemId) -> Option<&PriceQuote> {
        self.prices.get(item)
    }
}

/// Notification that prices changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceUpdate {
    pub items: Vec<ItemId>,
    pub at: DateTime<Utc>,
}

/// Source of external signals for context building
#[async_trait]
pub trait SignalSource: Send + Sync + 'static {
    async fn current(&self) -> Result<ExternalSignals>;
}

/// Mutable in-process signal source with price-change notifications
pub struct SharedSignals {
    signals: RwLock<ExternalSignals>,
    updates: broadcast::Sender<PriceUpdate>,
}

impl SharedSignals {
    pub fn new(initial: ExternalSignals) -> Self {
        let (updates, _) = broadcast::channel(64);
        Self {
            signals: RwLock::new(initial),
            updates,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PriceUpdate> {
        self.updates.subscribe()
    }

    /// Replace quotes for the given items and notify subscribers.
    pub async fn update_prices(&self, quotes: Vec<(ItemId, PriceQuote)>) {
        if quotes.is_empty() {
            return;
        }
        let items: Vec<ItemId> = quotes.iter().map(|(id, _)| id.clone()).collect();
        {
            let mut signals = self.signals.write().await;
            for (id, quote) in quotes {
                signals.prices.insert(id, quote);
            }
        }
        debug!(count = items.len(), "signals: prices updated");
        let _ = self.updates.send(PriceUpdate {
            items,
            at: Utc::now(),
        });
    }

    pub async fn set_constraints(&self, constraints: UserConstraints) {
        self.signals.write().await.constraints = constraints;
    }
}

impl Default for SharedSignals {
    fn default() -> Self {
        Self::new(ExternalSignals::default())
    }
}

#[async_trait]
impl SignalSource for SharedSignals {
    async fn current(&self) -> Result<ExternalSignals> {
        Ok(self.signals.read().await.clone())
    }
}
