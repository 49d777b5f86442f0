//! Current-plan cell: single writer, many readers

use std::sync::Arc;
use tokio::sync::watch;

use crate::domain::Plan;

/// Versioned holder for the most recent plan.
///
/// Only the engine writes. Readers always see a complete `Arc<Plan>` and can
/// wait for replacements through `subscribe()`. A plan is never replaced by
/// one computed against an older snapshot version.
#[derive(Debug)]
pub struct PlanCell {
    tx: watch::Sender<Option<Arc<Plan>>>,
}

impl PlanCell {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    pub fn current(&self) -> Option<Arc<Plan>> {
        self.tx.borrow().clone()
    }

    pub fn version(&self) -> Option<u64> {
        self.tx.borrow().as_ref().map(|p| p.snapshot_version)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Plan>>> {
        self.tx.subscribe()
    }

    /// Install `plan` unless the cell holds a newer one. Returns whether it was stored.
    pub(crate) fn store(&self, plan: Arc<Plan>) -> bool {
        self.tx.send_if_modified(|slot| {
            let accept = slot
                .as_ref()
                .map_or(true, |cur| plan.snapshot_version >= cur.snapshot_version);
            if accept {
                *slot = Some(plan.clone());
            }
            accept
        })
    }
}

impl Default for PlanCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_older_versions() {
        let cell = PlanCell::new();
        assert!(cell.current().is_none());
        assert!(cell.store(Arc::new(Plan::empty(4))));
        assert!(!cell.store(Arc::new(Plan::empty(3))));
        assert!(cell.store(Arc::new(Plan::empty(4))));
        assert_eq!(cell.version(), Some(4));
    }

    #[tokio::test]
    async fn test_readers_are_notified() {
        let cell = PlanCell::new();
        let mut rx = cell.subscribe();
        cell.store(Arc::new(Plan::empty(1)));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().as_ref().map(|p| p.snapshot_version), Some(1));
    }
}
