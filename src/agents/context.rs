//! CoordinationContext: the read-only view every adapter receives

use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

use crate::domain::{InventorySnapshot, ItemId};
use crate::signals::ExternalSignals;

/// Cooperative "this cycle is superseded" signal.
///
/// Backed by the engine's latest-version watch; a cycle is superseded once a
/// newer snapshot version has started. Adapters may poll it to stop early.
#[derive(Debug, Clone)]
pub struct SupersedeSignal {
    version: u64,
    latest: watch::Receiver<u64>,
}

impl SupersedeSignal {
    pub fn new(version: u64, latest: watch::Receiver<u64>) -> Self {
        Self { version, latest }
    }

    /// A signal that never fires (single-shot runs, tests)
    pub fn detached(version: u64) -> Self {
        let (_tx, rx) = watch::channel(version);
        Self::new(version, rx)
    }

    pub fn is_superseded(&self) -> bool {
        *self.latest.borrow() > self.version
    }

    /// Resolves once a newer version has started. Never resolves if the
    /// engine is gone.
    pub async fn superseded(&self) -> u64 {
        let mut rx = self.latest.clone();
        loop {
            let latest = *rx.borrow_and_update();
            if latest > self.version {
                return latest;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Snapshot plus external signals, frozen for one cycle
#[derive(Debug, Clone)]
pub struct CoordinationContext {
    pub cycle_id: Uuid,
    pub snapshot: Arc<InventorySnapshot>,
    pub signals: Arc<ExternalSignals>,
    pub supersede: SupersedeSignal,
}

impl CoordinationContext {
    pub fn new(
        snapshot: Arc<InventorySnapshot>,
        signals: Arc<ExternalSignals>,
        supersede: SupersedeSignal,
    ) -> Self {
        Self {
            cycle_id: Uuid::new_v4(),
            snapshot,
            signals,
            supersede,
        }
    }

    /// Context that can never be superseded
    pub fn standalone(snapshot: Arc<InventorySnapshot>, signals: ExternalSignals) -> Self {
        let version = snapshot.version;
        Self::new(snapshot, Arc::new(signals), SupersedeSignal::detached(version))
    }

    pub fn version(&self) -> u64 {
        self.snapshot.version
    }

    /// Calendar date of the snapshot, used for flyer validity
    pub fn today(&self) -> NaiveDate {
        self.snapshot.taken_at.date_naive()
    }

    pub fn is_excluded(&self, item: &ItemId) -> bool {
        self.signals.constraints.excludes(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready_eq, task};

    #[test]
    fn test_detached_signal_never_fires() {
        let signal = SupersedeSignal::detached(3);
        assert!(!signal.is_superseded());
        let mut fut = task::spawn(signal.superseded());
        assert_pending!(fut.poll());
    }

    #[test]
    fn test_same_version_does_not_wake_as_superseded() {
        let (tx, rx) = watch::channel(3u64);
        let signal = SupersedeSignal::new(3, rx);
        let mut fut = task::spawn(signal.superseded());
        assert_pending!(fut.poll());

        tx.send_replace(3);
        assert!(fut.is_woken());
        assert_pending!(fut.poll());

        tx.send_replace(4);
        assert_ready_eq!(fut.poll(), 4);
    }

    #[tokio::test]
    async fn test_signal_fires_on_newer_version() {
        let (tx, rx) = watch::channel(2u64);
        let signal = SupersedeSignal::new(2, rx);
        assert!(!signal.is_superseded());
        tx.send_replace(5);
        assert!(signal.is_superseded());
        assert_eq!(signal.superseded().await, 5);
    }
}
