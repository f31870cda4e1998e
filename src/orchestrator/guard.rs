//! Single-flight guard for one control surface
//!
//! A control surface (one asset's action panel) owns exactly one guard.
//! Independent surfaces own independent guards, so unrelated assets never
//! serialize each other's submissions.

use crate::observability::CorrelationId;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tracing::debug;

/// Busy flag plus the correlation id of the submission holding it
#[derive(Debug)]
pub struct SingleFlightGuard {
    surface: String,
    busy: AtomicBool,
    owner: Mutex<Option<CorrelationId>>,
    busy_tx: watch::Sender<bool>,
}

impl SingleFlightGuard {
    pub fn new(surface: impl Into<String>) -> Self {
        let (busy_tx, _) = watch::channel(false);
        Self {
            surface: surface.into(),
            busy: AtomicBool::new(false),
            owner: Mutex::new(None),
            busy_tx,
        }
    }

    /// Name of the control surface this guard belongs to
    pub fn surface(&self) -> &str {
        &self.surface
    }

    /// Mark busy if idle; `false` with no side effect if already busy
    pub fn try_acquire(&self) -> bool {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.busy_tx.send_replace(true);
        debug!(surface = %self.surface, "Single-flight token acquired");
        true
    }

    /// [`try_acquire`](Self::try_acquire) recording `owner` as the holder
    pub fn try_acquire_for(&self, owner: CorrelationId) -> bool {
        if !self.try_acquire() {
            return false;
        }
        *self.owner.lock() = Some(owner);
        true
    }

    /// Mark idle. Releasing an idle guard is a no-op.
    pub fn release(&self) {
        self.owner.lock().take();
        if self.busy.swap(false, Ordering::AcqRel) {
            self.busy_tx.send_replace(false);
            debug!(surface = %self.surface, "Single-flight token released");
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Correlation id of the submission currently holding the token
    pub fn owner(&self) -> Option<CorrelationId> {
        self.owner.lock().clone()
    }

    /// Observable busy flag for UI controls
    pub fn busy_watch(&self) -> watch::Receiver<bool> {
        self.busy_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails_until_release() {
        let guard = SingleFlightGuard::new("asset-a");
        assert!(guard.try_acquire());
        assert!(!guard.try_acquire());
        assert!(guard.is_busy());

        guard.release();
        assert!(!guard.is_busy());
        assert!(guard.try_acquire());
    }

    #[test]
    fn test_release_is_idempotent() {
        let guard = SingleFlightGuard::new("asset-a");
        guard.release();
        assert!(!guard.is_busy());

        assert!(guard.try_acquire());
        guard.release();
        guard.release();
        assert!(!guard.is_busy());
        assert!(guard.try_acquire());
    }

    #[test]
    fn test_owner_tracking() {
        let guard = SingleFlightGuard::new("asset-a");
        let owner = CorrelationId::from("submission-1");
        assert!(guard.try_acquire_for(owner.clone()));
        assert_eq!(guard.owner(), Some(owner));

        assert!(!guard.try_acquire_for(CorrelationId::from("submission-2")));
        assert_eq!(guard.owner().map(|o| o.to_string()), Some("submission-1".to_string()));

        guard.release();
        assert_eq!(guard.owner(), None);
    }

    #[tokio::test]
    async fn test_busy_watch_follows_flag() {
        let guard = SingleFlightGuard::new("asset-a");
        let mut busy = guard.busy_watch();
        assert!(!*busy.borrow());

        assert!(guard.try_acquire());
        busy.changed().await.unwrap();
        assert!(*busy.borrow_and_update());

        guard.release();
        busy.changed().await.unwrap();
        assert!(!*busy.borrow_and_update());
    }

    #[test]
    fn test_independent_surfaces_do_not_interfere() {
        let a = SingleFlightGuard::new("asset-a");
        let b = SingleFlightGuard::new("asset-b");
        assert!(a.try_acquire());
        assert!(b.try_acquire());
        assert_eq!(a.surface(), "asset-a");
    }
}
