// Tabrs Injection Engine
// Emits one timed burst of synthetic Tab presses under the guard

use std::sync::Arc;
use std::time::Duration;

use crate::event::KeyDirection;
use crate::guard::ReentrancyGuard;
use crate::source::KeyEventSource;
use crate::Key;

/// Synthesizes Tab bursts through a [`KeyEventSource`].
///
/// Cheap to clone; clones share the source and the guard.
#[derive(Clone)]
pub struct Injector {
    source: Arc<dyn KeyEventSource>,
    guard: ReentrancyGuard,
}

impl Injector {
    pub fn new(source: Arc<dyn KeyEventSource>, guard: ReentrancyGuard) -> Self {
        Self { source, guard }
    }

    /// Emit `count` Tab presses with `delay` slept between consecutive
    /// presses. Expects `count >= 1`; configuration validation upstream
    /// guarantees it.
    ///
    /// If another burst already holds the guard this returns immediately —
    /// a concurrent trigger is expected and benign, not an error. The guard
    /// token is held for the whole burst and released on every exit path,
    /// so a synthesis failure mid-burst abandons the remaining presses
    /// without leaving the flag set.
    ///
    /// Runs on the caller's thread and blocks it for the burst duration.
    pub fn fire(&self, count: u32, delay: Duration) {
        let Some(_token) = self.guard.try_acquire() else {
            log::debug!("burst already in flight, trigger dropped");
            return;
        };

        log::debug!("injecting {} tab presses, {:?} apart", count, delay);

        for i in 0..count {
            // Between presses, never after the last one.
            if i > 0 && !delay.is_zero() {
                std::thread::sleep(delay);
            }

            if let Err(e) = self.source.synthesize(Key::TAB, KeyDirection::Down) {
                log::warn!("burst abandoned after {} of {} presses: {}", i, count, e);
                return;
            }
            if let Err(e) = self.source.synthesize(Key::TAB, KeyDirection::Up) {
                log::warn!("burst abandoned after {} of {} presses: {}", i, count, e);
                // The down already went out; try not to leave a synthetic
                // Tab held at the OS level.
                if self.source.synthesize(Key::TAB, KeyDirection::Up).is_err() {
                    log::warn!("could not release synthetic tab, key may be stuck");
                }
                return;
            }
        }
    }
}
