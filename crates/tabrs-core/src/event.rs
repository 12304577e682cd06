// Tabrs Event Types
// Physical key transitions as delivered by a KeyEventSource

use crate::Key;

/// Direction of a key transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDirection {
    Down,
    Up,
}

/// One physical key transition. Transient, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalEvent {
    pub key: Key,
    pub direction: KeyDirection,
}

impl PhysicalEvent {
    pub fn down(key: Key) -> Self {
        Self {
            key,
            direction: KeyDirection::Down,
        }
    }

    pub fn up(key: Key) -> Self {
        Self {
            key,
            direction: KeyDirection::Up,
        }
    }
}

/// Filter for key-down subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFilter {
    /// Match every key.
    Any,
    /// Match exactly one key.
    Key(Key),
}

impl KeyFilter {
    /// Check whether an event key matches this filter
    pub fn matches(&self, key: Key) -> bool {
        match self {
            KeyFilter::Any => true,
            KeyFilter::Key(k) => *k == key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_any_matches_everything() {
        assert!(KeyFilter::Any.matches(Key::TAB));
        assert!(KeyFilter::Any.matches(Key(30)));
    }

    #[test]
    fn test_filter_key_matches_only_that_key() {
        let filter = KeyFilter::Key(Key::TAB);
        assert!(filter.matches(Key::TAB));
        assert!(!filter.matches(Key(30)));
    }

    #[test]
    fn test_event_constructors() {
        let down = PhysicalEvent::down(Key::TAB);
        assert_eq!(down.key, Key::TAB);
        assert_eq!(down.direction, KeyDirection::Down);

        let up = PhysicalEvent::up(Key::TAB);
        assert_eq!(up.direction, KeyDirection::Up);
    }
}
