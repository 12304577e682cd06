// Tabrs Hook Lifecycle
// Owns the live registrations and the configuration epoch they bind to

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::burst::Injector;
use crate::classify::classify;
use crate::config::{BurstConfig, ConfigError};
use crate::event::KeyFilter;
use crate::guard::ReentrancyGuard;
use crate::source::{EventHandler, KeyEventSource, SourceError, SubscriptionHandle};
use crate::Key;

/// Errors surfaced by `start`
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("hook registration failed: {0}")]
    Registration(#[from] SourceError),
}

/// Lifecycle state for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookState {
    Running,
    Stopped,
}

impl fmt::Display for HookState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookState::Running => write!(f, "Running"),
            HookState::Stopped => write!(f, "Stopped"),
        }
    }
}

/// One live pairing of a configuration snapshot and its registrations.
struct Epoch {
    config: Arc<BurstConfig>,
    tab_sub: SubscriptionHandle,
    any_sub: SubscriptionHandle,
}

/// Registers and retires the classifier against a [`KeyEventSource`].
///
/// Exactly zero or one epoch is live at a time. `start` and `stop` may be
/// called from any thread; they serialize on the epoch slot. An event
/// arriving while an epoch swap is underway lands cleanly in the old or the
/// new epoch, never both, because the old registrations are fully torn down
/// before the new ones are installed.
///
/// Each controller instance owns its epoch and guard outright, so multiple
/// independent controllers can coexist (as the tests do).
pub struct HookController {
    source: Arc<dyn KeyEventSource>,
    guard: ReentrancyGuard,
    epoch: Mutex<Option<Epoch>>,
}

impl HookController {
    pub fn new(source: Arc<dyn KeyEventSource>) -> Self {
        Self {
            source,
            guard: ReentrancyGuard::new(),
            epoch: Mutex::new(None),
        }
    }

    /// Install listeners bound to `config`, replacing any live epoch.
    ///
    /// The configuration is validated before anything is registered. If the
    /// second registration is refused, the first is torn down before the
    /// error is returned; no partial epoch ever survives a failed start, and
    /// the controller reads as Stopped afterwards.
    pub fn start(&self, config: BurstConfig) -> Result<(), HookError> {
        config.validate()?;

        let mut slot = self.epoch.lock();
        if let Some(old) = slot.take() {
            self.retire(old);
        }

        let config = Arc::new(config);
        let injector = Injector::new(Arc::clone(&self.source), self.guard.clone());

        // Dedicated Tab listener; the source suppresses the physical Tab for
        // this epoch iff the snapshot says so.
        let tab_handler: EventHandler = {
            let config = Arc::clone(&config);
            let guard = self.guard.clone();
            let source = Arc::clone(&self.source);
            let injector = injector.clone();
            Arc::new(move |event| {
                if classify(event, &config, &guard, source.as_ref()).triggers() {
                    injector.fire(config.tab_count, config.inter_key_delay);
                }
            })
        };
        let tab_sub =
            self.source
                .on_key_down(KeyFilter::Key(Key::TAB), config.suppress_tab, tab_handler)?;

        // Catch-all listener for the chord path. Tab is excluded here: the
        // dedicated subscription above owns it, and handling it twice would
        // fire two bursts back to back.
        let any_handler: EventHandler = {
            let config = Arc::clone(&config);
            let guard = self.guard.clone();
            let source = Arc::clone(&self.source);
            Arc::new(move |event| {
                if event.key == Key::TAB {
                    return;
                }
                if classify(event, &config, &guard, source.as_ref()).triggers() {
                    injector.fire(config.tab_count, config.inter_key_delay);
                }
            })
        };
        let any_sub = match self.source.on_key_down(KeyFilter::Any, false, any_handler) {
            Ok(sub) => sub,
            Err(e) => {
                self.source.unregister(tab_sub);
                return Err(HookError::Registration(e));
            }
        };

        log::info!(
            "hooks started: count={} delay={:?} suppress_tab={} modifier={} chord={}",
            config.tab_count,
            config.inter_key_delay,
            config.suppress_tab,
            config.trigger_modifier,
            config.chord_enabled
        );

        *slot = Some(Epoch {
            config,
            tab_sub,
            any_sub,
        });
        Ok(())
    }

    /// Tear down the live epoch, if any. Idempotent.
    ///
    /// Only future events are affected; a burst already in flight runs to
    /// completion.
    pub fn stop(&self) {
        let mut slot = self.epoch.lock();
        if let Some(epoch) = slot.take() {
            self.retire(epoch);
            log::info!("hooks stopped");
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> HookState {
        if self.epoch.lock().is_some() {
            HookState::Running
        } else {
            HookState::Stopped
        }
    }

    /// Snapshot of the active configuration, if running.
    pub fn active_config(&self) -> Option<Arc<BurstConfig>> {
        self.epoch.lock().as_ref().map(|e| Arc::clone(&e.config))
    }

    fn retire(&self, epoch: Epoch) {
        self.source.unregister(epoch.tab_sub);
        self.source.unregister(epoch.any_sub);
    }
}

impl Drop for HookController {
    fn drop(&mut self) {
        // A system-wide hook must never outlive its owner.
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockSource;

    fn controller() -> (Arc<MockSource>, HookController) {
        let source = Arc::new(MockSource::new());
        let ctrl = HookController::new(Arc::clone(&source) as Arc<dyn KeyEventSource>);
        (source, ctrl)
    }

    #[test]
    fn test_start_installs_one_listener_pair() {
        let (source, ctrl) = controller();
        ctrl.start(BurstConfig::default()).unwrap();

        let shapes = source.subscription_shapes();
        assert_eq!(shapes.len(), 2);
        assert_eq!(shapes[0], (KeyFilter::Key(Key::TAB), true));
        assert_eq!(shapes[1], (KeyFilter::Any, false));
        assert_eq!(ctrl.state(), HookState::Running);
    }

    #[test]
    fn test_restart_replaces_epoch() {
        let (source, ctrl) = controller();
        ctrl.start(BurstConfig::default()).unwrap();

        let next = BurstConfig {
            suppress_tab: false,
            tab_count: 3,
            ..BurstConfig::default()
        };
        ctrl.start(next).unwrap();

        let shapes = source.subscription_shapes();
        assert_eq!(shapes.len(), 2, "never two epochs at once");
        assert_eq!(shapes[0], (KeyFilter::Key(Key::TAB), false));
        assert_eq!(ctrl.active_config().unwrap().tab_count, 3);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let (source, ctrl) = controller();
        ctrl.start(BurstConfig::default()).unwrap();

        ctrl.stop();
        ctrl.stop();
        assert_eq!(source.active_subscriptions(), 0);
        assert_eq!(ctrl.state(), HookState::Stopped);
    }

    #[test]
    fn test_invalid_config_rejected_before_registration() {
        let (source, ctrl) = controller();
        let bad = BurstConfig {
            tab_count: 0,
            ..BurstConfig::default()
        };

        let result = ctrl.start(bad);
        assert!(matches!(result, Err(HookError::InvalidConfig(_))));
        assert_eq!(source.active_subscriptions(), 0);
        assert_eq!(ctrl.state(), HookState::Stopped);
    }

    #[test]
    fn test_failed_second_registration_rolls_back_first() {
        let (source, ctrl) = controller();
        source.refuse_registrations_after(1);

        let result = ctrl.start(BurstConfig::default());
        assert!(matches!(result, Err(HookError::Registration(_))));
        assert_eq!(source.active_subscriptions(), 0, "no partial registration");
        assert_eq!(ctrl.state(), HookState::Stopped);
    }

    #[test]
    fn test_drop_retires_epoch() {
        let (source, ctrl) = controller();
        ctrl.start(BurstConfig::default()).unwrap();
        drop(ctrl);
        assert_eq!(source.active_subscriptions(), 0);
    }
}
