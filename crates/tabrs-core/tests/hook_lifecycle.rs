// Tabrs Hook Lifecycle Tests
//
// Epoch handling across start/stop/reconfigure, observed through the mock
// source's live subscription table and the events that still trigger.

use std::sync::Arc;
use std::time::Duration;

use tabrs_core::source::Delivery;
use tabrs_core::{
    BurstConfig, HookController, HookState, Key, KeyEventSource, KeyFilter, MockSource,
    PhysicalEvent,
};

fn quick_config() -> BurstConfig {
    BurstConfig {
        inter_key_delay: Duration::ZERO,
        ..BurstConfig::default()
    }
}

fn controller() -> (Arc<MockSource>, HookController) {
    let source = Arc::new(MockSource::new());
    let ctrl = HookController::new(Arc::clone(&source) as Arc<dyn KeyEventSource>);
    (source, ctrl)
}

#[test]
fn start_installs_exactly_one_listener_pair() {
    let (source, ctrl) = controller();
    ctrl.start(quick_config()).unwrap();

    let shapes = source.subscription_shapes();
    assert_eq!(
        shapes,
        vec![(KeyFilter::Key(Key::TAB), true), (KeyFilter::Any, false)]
    );
    assert_eq!(ctrl.state(), HookState::Running);
}

#[test]
fn reconfigure_swaps_epoch_wholesale() {
    let (source, ctrl) = controller();
    ctrl.start(quick_config()).unwrap();

    let next = BurstConfig {
        tab_count: 2,
        suppress_tab: false,
        ..quick_config()
    };
    ctrl.start(next).unwrap();

    // Still one pair, and the new snapshot governs behavior.
    assert_eq!(source.active_subscriptions(), 2);
    let delivery = source.dispatch(PhysicalEvent::down(Key::TAB));
    assert_eq!(delivery, Delivery::Delivered);
    assert_eq!(source.synthesized_presses().len(), 2);
}

#[test]
fn stop_removes_listeners_and_triggers_nothing() {
    let (source, ctrl) = controller();
    ctrl.start(quick_config()).unwrap();
    ctrl.stop();

    assert_eq!(source.active_subscriptions(), 0);
    assert_eq!(ctrl.state(), HookState::Stopped);

    let delivery = source.dispatch(PhysicalEvent::down(Key::TAB));
    assert_eq!(delivery, Delivery::Delivered);
    assert!(source.synthesized().is_empty());
}

#[test]
fn stop_twice_in_a_row_never_errors() {
    let (_source, ctrl) = controller();
    ctrl.stop();
    ctrl.stop();

    ctrl.start(quick_config()).unwrap();
    ctrl.stop();
    ctrl.stop();
    assert_eq!(ctrl.state(), HookState::Stopped);
}

#[test]
fn start_after_stop_resumes_triggering() {
    let (source, ctrl) = controller();
    ctrl.start(quick_config()).unwrap();
    ctrl.stop();
    ctrl.start(quick_config()).unwrap();

    source.dispatch(PhysicalEvent::down(Key::TAB));
    assert_eq!(source.synthesized_presses().len(), 9);
}

#[test]
fn rapid_restart_cycles_leave_a_single_pair() {
    let (source, ctrl) = controller();
    for count in 1..=20 {
        let config = BurstConfig {
            tab_count: count,
            ..quick_config()
        };
        ctrl.start(config).unwrap();
    }

    assert_eq!(source.active_subscriptions(), 2);
    assert_eq!(ctrl.active_config().unwrap().tab_count, 20);
}

#[test]
fn failed_start_leaves_controller_stopped_and_usable() {
    let (source, ctrl) = controller();
    source.refuse_registrations_after(1);

    assert!(ctrl.start(quick_config()).is_err());
    assert_eq!(source.active_subscriptions(), 0);
    assert_eq!(ctrl.state(), HookState::Stopped);

    // Once the source accepts registrations again, start succeeds.
    source.refuse_registrations_after(usize::MAX);
    ctrl.start(quick_config()).unwrap();
    assert_eq!(ctrl.state(), HookState::Running);
}

#[test]
fn independent_controllers_own_independent_epochs() {
    let (source_a, ctrl_a) = controller();
    let (source_b, ctrl_b) = controller();

    ctrl_a.start(quick_config()).unwrap();
    ctrl_b
        .start(BurstConfig {
            tab_count: 1,
            ..quick_config()
        })
        .unwrap();

    ctrl_a.stop();
    assert_eq!(source_a.active_subscriptions(), 0);
    assert_eq!(source_b.active_subscriptions(), 2);

    source_b.dispatch(PhysicalEvent::down(Key::TAB));
    assert_eq!(source_b.synthesized_presses().len(), 1);
}

#[test]
fn reconfiguration_from_another_thread_is_serialized() {
    let (source, ctrl) = controller();
    let ctrl = Arc::new(ctrl);
    ctrl.start(quick_config()).unwrap();

    let handles: Vec<_> = (0..4u32)
        .map(|i| {
            let ctrl = Arc::clone(&ctrl);
            std::thread::spawn(move || {
                for _ in 0..25 {
                    let config = BurstConfig {
                        tab_count: i + 1,
                        ..quick_config()
                    };
                    ctrl.start(config).unwrap();
                    ctrl.stop();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    // However the interleaving went, no stale registrations survive.
    ctrl.stop();
    assert_eq!(source.active_subscriptions(), 0);
}
