// Tabrs Core Library
// System-wide Tab-burst interception and injection engine

pub mod burst;
pub mod classify;
pub mod config;
pub mod event;
pub mod guard;
pub mod hook;
pub mod key;
pub mod source;

pub use burst::Injector;
pub use classify::{classify, Classification};
pub use config::{default_config_content, BurstConfig, ConfigError, MAX_TAB_COUNT};
pub use event::{KeyDirection, KeyFilter, PhysicalEvent};
pub use guard::{BurstToken, ReentrancyGuard};
pub use hook::{HookController, HookError, HookState};
pub use key::{key_from_name, key_name, Key};
pub use source::{
    EventHandler, KeyEventSource, MockSource, SourceError, SubscriptionHandle,
};

#[cfg(feature = "evdev-backend")]
pub use source::evdev::{list_devices, DeviceInfo, EvdevSource};
