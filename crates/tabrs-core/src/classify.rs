// Tabrs Event Classifier
// Decides how one physical key transition is handled

use crate::config::BurstConfig;
use crate::event::{KeyDirection, PhysicalEvent};
use crate::guard::ReentrancyGuard;
use crate::source::KeyEventSource;
use crate::Key;

/// Outcome of classifying one physical event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Not a trigger; nothing to do.
    Ignore,
    /// Trigger a burst; the original key must not reach the foreground.
    SuppressAndTrigger,
    /// Trigger a burst; the original key is delivered normally.
    PassThroughAndTrigger,
}

impl Classification {
    /// Whether this classification warrants an injection burst.
    pub fn triggers(self) -> bool {
        !matches!(self, Classification::Ignore)
    }
}

/// Classify one physical event against the active configuration.
///
/// The checks run in a fixed order:
///
/// 1. Only key-down transitions are observed.
/// 2. While the guard is held, every event is ignored. This is what keeps
///    the injection loop's own synthetic Tab events from re-triggering.
/// 3. A physical Tab triggers; whether it is suppressed follows the
///    configuration.
/// 4. A single alphabetic key while the trigger modifier is physically held
///    triggers without suppression. The modifier state is queried at
///    classification time, never latched from an earlier event.
///
/// The chord path passes the letter through so the utility never interferes
/// with normal typing; it only appends a synthetic burst afterward. Only the
/// Tab path may suppress.
pub fn classify(
    event: &PhysicalEvent,
    config: &BurstConfig,
    guard: &ReentrancyGuard,
    source: &dyn KeyEventSource,
) -> Classification {
    if event.direction != KeyDirection::Down {
        return Classification::Ignore;
    }

    if guard.is_held() {
        return Classification::Ignore;
    }

    if event.key == Key::TAB {
        return if config.suppress_tab {
            Classification::SuppressAndTrigger
        } else {
            Classification::PassThroughAndTrigger
        };
    }

    if event.key.is_letter() && config.chord_enabled && source.is_held(config.trigger_modifier) {
        return Classification::PassThroughAndTrigger;
    }

    Classification::Ignore
}
