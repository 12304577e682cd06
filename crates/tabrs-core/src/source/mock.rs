// Tabrs Mock Key Event Source
// In-process source for exercising the hook pipeline without OS hooks

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use super::{EventHandler, KeyEventSource, SourceError, SubscriptionHandle};
use crate::event::{KeyDirection, KeyFilter, PhysicalEvent};
use crate::Key;

/// One synthetic event recorded by the mock, with its emission time.
#[derive(Debug, Clone, Copy)]
pub struct SynthesizedEvent {
    pub event: PhysicalEvent,
    pub at: Instant,
}

/// Outcome of dispatching one physical event through the mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The event reached the foreground (no suppressing subscription matched).
    Delivered,
    /// A suppressing subscription matched; the event was withheld.
    Suppressed,
}

struct MockSubscription {
    id: u64,
    filter: KeyFilter,
    suppress: bool,
    handler: EventHandler,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    subs: Vec<MockSubscription>,
    held: HashSet<Key>,
    synthesized: Vec<SynthesizedEvent>,
    feedback: bool,
    refuse_registrations_after: Option<usize>,
    fail_synthesis_after: Option<usize>,
    fail_synthesis_at: Option<usize>,
    synthesis_calls: usize,
}

/// A scriptable [`KeyEventSource`] for tests.
///
/// Physical events are fed in with [`dispatch`](MockSource::dispatch); held
/// keys are toggled with [`hold`](MockSource::hold) and
/// [`release`](MockSource::release). Everything the core synthesizes is
/// recorded with a timestamp. With feedback enabled, synthetic down events
/// are re-dispatched into the subscriptions, which is how the re-entrancy
/// protection is exercised end to end.
#[derive(Default)]
pub struct MockSource {
    inner: Mutex<Inner>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a key as physically held.
    pub fn hold(&self, key: Key) {
        self.inner.lock().held.insert(key);
    }

    /// Mark a key as released.
    pub fn release(&self, key: Key) {
        self.inner.lock().held.remove(&key);
    }

    /// Re-dispatch synthetic down events into the subscriptions, imitating
    /// an OS hook that also observes injected input.
    pub fn set_feedback(&self, enabled: bool) {
        self.inner.lock().feedback = enabled;
    }

    /// Refuse `on_key_down` once `limit` subscriptions are live.
    pub fn refuse_registrations_after(&self, limit: usize) {
        self.inner.lock().refuse_registrations_after = Some(limit);
    }

    /// Make `synthesize` fail once it has been called `limit` times.
    pub fn fail_synthesis_after(&self, limit: usize) {
        self.inner.lock().fail_synthesis_after = Some(limit);
    }

    /// Make exactly the `n`-th `synthesize` call fail (1-based); calls
    /// before and after it succeed. Models a transient injection fault.
    pub fn fail_synthesis_at(&self, n: usize) {
        self.inner.lock().fail_synthesis_at = Some(n);
    }

    /// Number of currently registered subscriptions.
    pub fn active_subscriptions(&self) -> usize {
        self.inner.lock().subs.len()
    }

    /// Snapshot of (filter, suppress) for the live subscriptions, in
    /// registration order.
    pub fn subscription_shapes(&self) -> Vec<(KeyFilter, bool)> {
        self.inner
            .lock()
            .subs
            .iter()
            .map(|s| (s.filter, s.suppress))
            .collect()
    }

    /// Everything synthesized so far.
    pub fn synthesized(&self) -> Vec<SynthesizedEvent> {
        self.inner.lock().synthesized.clone()
    }

    /// Synthetic down transitions only; one per press in a burst.
    pub fn synthesized_presses(&self) -> Vec<SynthesizedEvent> {
        self.inner
            .lock()
            .synthesized
            .iter()
            .filter(|s| s.event.direction == KeyDirection::Down)
            .copied()
            .collect()
    }

    /// Forget recorded synthetic events.
    pub fn clear_synthesized(&self) {
        self.inner.lock().synthesized.clear();
    }

    /// Feed one physical event to every matching subscription.
    ///
    /// Handlers run after the internal lock is dropped so they are free to
    /// call back into the source (`is_held`, `synthesize`). Returns whether
    /// the event would have reached the foreground.
    pub fn dispatch(&self, event: PhysicalEvent) -> Delivery {
        let (handlers, suppressed) = {
            let inner = self.inner.lock();
            let mut handlers = Vec::new();
            let mut suppressed = false;
            // Subscriptions only observe down transitions.
            if event.direction == KeyDirection::Down {
                for sub in &inner.subs {
                    if sub.filter.matches(event.key) {
                        handlers.push(Arc::clone(&sub.handler));
                        suppressed |= sub.suppress;
                    }
                }
            }
            (handlers, suppressed)
        };

        for handler in handlers {
            handler(&event);
        }

        if suppressed {
            Delivery::Suppressed
        } else {
            Delivery::Delivered
        }
    }
}

impl KeyEventSource for MockSource {
    fn on_key_down(
        &self,
        filter: KeyFilter,
        suppress: bool,
        handler: EventHandler,
    ) -> Result<SubscriptionHandle, SourceError> {
        let mut inner = self.inner.lock();

        if let Some(limit) = inner.refuse_registrations_after {
            if inner.subs.len() >= limit {
                return Err(SourceError::Registration(
                    "subscription limit reached".to_string(),
                ));
            }
        }

        inner.next_id += 1;
        let id = inner.next_id;
        inner.subs.push(MockSubscription {
            id,
            filter,
            suppress,
            handler,
        });
        Ok(SubscriptionHandle(id))
    }

    fn is_held(&self, key: Key) -> bool {
        self.inner.lock().held.contains(&key)
    }

    fn synthesize(&self, key: Key, direction: KeyDirection) -> Result<(), SourceError> {
        let feedback = {
            let mut inner = self.inner.lock();
            inner.synthesis_calls += 1;
            if let Some(limit) = inner.fail_synthesis_after {
                if inner.synthesis_calls > limit {
                    return Err(SourceError::Injection(
                        "synthesis budget exhausted".to_string(),
                    ));
                }
            }
            if inner.fail_synthesis_at == Some(inner.synthesis_calls) {
                return Err(SourceError::Injection("transient fault".to_string()));
            }
            inner.synthesized.push(SynthesizedEvent {
                event: PhysicalEvent { key, direction },
                at: Instant::now(),
            });
            inner.feedback
        };

        // Re-enter outside the lock; a feedback event must be classifiable
        // like any physical one.
        if feedback && direction == KeyDirection::Down {
            self.dispatch(PhysicalEvent { key, direction });
        }

        Ok(())
    }

    fn unregister(&self, handle: SubscriptionHandle) {
        self.inner.lock().subs.retain(|s| s.id != handle.0);
    }
}
