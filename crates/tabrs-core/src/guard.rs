// Tabrs Re-entrancy Guard
// Shared flag that keeps synthetic events out of the classifier

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Process-wide flag marking an injection burst in flight.
///
/// The guard is cloneable; all clones share one flag. Acquisition is scoped:
/// `try_acquire` hands out a [`BurstToken`] that clears the flag on drop, so
/// release happens on every exit path of the injection loop, including early
/// returns after a failed synthesis.
///
/// There is no queuing. A second trigger arriving while the flag is set is
/// dropped silently.
#[derive(Debug, Clone, Default)]
pub struct ReentrancyGuard {
    flag: Arc<AtomicBool>,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to acquire the guard.
    ///
    /// Returns `None` if a burst already holds it.
    pub fn try_acquire(&self) -> Option<BurstToken> {
        if self.flag.swap(true, Ordering::Acquire) {
            None
        } else {
            Some(BurstToken {
                flag: Arc::clone(&self.flag),
            })
        }
    }

    /// Point-in-time query used by the classifier.
    pub fn is_held(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Token for one held acquisition. Releases the guard when dropped.
#[derive(Debug)]
pub struct BurstToken {
    flag: Arc<AtomicBool>,
}

impl Drop for BurstToken {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
