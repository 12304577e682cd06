// Tabrs Key Event Source
// The OS-hook capability the core consumes, as a trait

mod mock;

#[cfg(feature = "evdev-backend")]
pub mod evdev;

pub use mock::{Delivery, MockSource, SynthesizedEvent};

use std::sync::Arc;

use crate::event::{KeyDirection, KeyFilter, PhysicalEvent};
use crate::Key;

/// Callback invoked for each matching key-down transition.
///
/// Handlers run on the source's delivery thread and may block it (the
/// injection loop does, for the duration of a burst).
pub type EventHandler = Arc<dyn Fn(&PhysicalEvent) + Send + Sync>;

/// Handle for one registered subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub(crate) u64);

/// Errors surfaced by a key event source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("hook registration refused: {0}")]
    Registration(String),

    #[error("event injection failed: {0}")]
    Injection(String),

    #[error("no keyboard devices found")]
    NoDevices,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A system-wide keyboard hook and injection capability.
///
/// Implementations deliver physical key transitions on their own background
/// thread, answer point-in-time held-key queries, and inject synthetic
/// transitions into the OS input stream. The production implementation is
/// [`evdev::EvdevSource`]; [`MockSource`] serves tests.
pub trait KeyEventSource: Send + Sync {
    /// Register a callback for key-down transitions.
    ///
    /// `suppress` asks the source to withhold the matched physical key from
    /// other consumers; only matched events are withheld.
    fn on_key_down(
        &self,
        filter: KeyFilter,
        suppress: bool,
        handler: EventHandler,
    ) -> Result<SubscriptionHandle, SourceError>;

    /// Whether a key is physically held right now.
    fn is_held(&self, key: Key) -> bool;

    /// Inject a synthetic key transition into the input stream.
    fn synthesize(&self, key: Key, direction: KeyDirection) -> Result<(), SourceError>;

    /// Remove a prior subscription. Idempotent on an already-removed handle.
    fn unregister(&self, handle: SubscriptionHandle);
}
