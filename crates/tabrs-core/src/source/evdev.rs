// Tabrs Evdev Source
// Production KeyEventSource: grabbed evdev keyboards in, uinput out

use std::collections::HashSet;
use std::os::unix::io::AsRawFd;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use evdev::{uinput::VirtualDeviceBuilder, AttributeSet, Device, EventType, InputEvent, InputEventKind};
use parking_lot::Mutex;

use super::{EventHandler, KeyEventSource, SourceError, SubscriptionHandle};
use crate::event::{KeyDirection, KeyFilter, PhysicalEvent};
use crate::Key;

const VIRT_DEVICE_NAME: &str = "Tabrs (virtual) Keyboard";
const VIRT_DEVICE_PREFIX: &str = "Tabrs (virtual)";

/// Poll interval; bounds how long shutdown waits for the delivery thread.
const POLL_TIMEOUT_MS: i32 = 100;

/// Device information for listing devices
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub index: usize,
    pub name: String,
    pub path: Option<String>,
}

/// List all available keyboard devices (for the --list-devices CLI flag).
pub fn list_devices() -> Result<Vec<DeviceInfo>, SourceError> {
    let mut infos = Vec::new();

    for (index, (path, device)) in evdev::enumerate()
        .filter(|(_, d)| is_keyboard_device(d))
        .enumerate()
    {
        infos.push(DeviceInfo {
            index,
            name: device.name().unwrap_or("Unknown").to_string(),
            path: path.to_str().map(|s| s.to_string()),
        });
    }

    if infos.is_empty() {
        return Err(SourceError::NoDevices);
    }

    Ok(infos)
}

/// Whether a device name belongs to our own virtual output device.
///
/// The virtual device must never be grabbed; that is what keeps synthetic
/// events from re-entering the delivery loop at the OS level.
fn is_own_virtual_device(name: &str) -> bool {
    name.starts_with(VIRT_DEVICE_PREFIX)
}

/// Check if a device is a physical keyboard
fn is_keyboard_device(device: &Device) -> bool {
    if !device.supported_events().contains(EventType::KEY) {
        return false;
    }

    if is_own_virtual_device(device.name().unwrap_or("")) {
        return false;
    }

    let keys = match device.supported_keys() {
        Some(k) => k,
        None => return false,
    };

    // Check for QWERTY row keys (Q=16 .. Y=21) plus A, Z and SPACE; this
    // filters out power buttons and other EV_KEY-capable non-keyboards.
    const QWERTY_CODES: &[u16] = &[16, 17, 18, 19, 20, 21];
    const A_Z_SPACE_CODES: &[u16] = &[57, 30, 44];

    QWERTY_CODES
        .iter()
        .chain(A_Z_SPACE_CODES)
        .all(|code| keys.contains(evdev::Key::new(*code)))
}

/// Virtual uinput keyboard carrying passthrough and synthetic events.
struct VirtualKeyboard {
    device: evdev::uinput::VirtualDevice,
}

impl VirtualKeyboard {
    fn new() -> Result<Self, SourceError> {
        let mut keys = AttributeSet::new();
        for code in 0..256u16 {
            keys.insert(evdev::Key::new(code));
        }

        let device = VirtualDeviceBuilder::new()
            .map_err(|e| SourceError::Registration(e.to_string()))?
            .name(VIRT_DEVICE_NAME)
            .with_keys(&keys)
            .map_err(|e| SourceError::Registration(e.to_string()))?
            .build()
            .map_err(|e| SourceError::Registration(e.to_string()))?;

        Ok(Self { device })
    }

    fn emit_key(&mut self, code: u16, value: i32) -> Result<(), SourceError> {
        let key_event = InputEvent::new(EventType::KEY, code, value);
        // SYN event is required for the kernel to process the key event
        let syn_event = InputEvent::new(EventType::SYNCHRONIZATION, 0, 0);

        self.device
            .emit(&[key_event, syn_event])
            .map_err(|e| SourceError::Injection(e.to_string()))
    }
}

/// The grabbed physical keyboards and their poll descriptors.
///
/// When this is dropped the devices MUST be ungrabbed, otherwise the
/// keyboard stays unusable past the process's lifetime. Drop guarantees the
/// cleanup runs even during panic unwinding of the delivery thread.
struct GrabbedDevices {
    devices: Vec<Device>,
    poll_fds: Vec<libc::pollfd>,
    grabbed: bool,
}

impl GrabbedDevices {
    fn open() -> Result<Self, SourceError> {
        let mut devices: Vec<Device> = evdev::enumerate()
            .map(|(_, d)| d)
            .filter(is_keyboard_device)
            .collect();

        if devices.is_empty() {
            return Err(SourceError::NoDevices);
        }

        // Ungrab first to recover cleanly if a previous instance crashed
        // while holding the grab.
        for device in &mut devices {
            let _ = device.ungrab();
        }
        for device in &mut devices {
            device.grab()?;
        }

        let poll_fds = devices
            .iter()
            .map(|d| libc::pollfd {
                fd: d.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            })
            .collect();

        Ok(Self {
            devices,
            poll_fds,
            grabbed: true,
        })
    }

    /// Wait up to `timeout_ms` for input and drain whatever arrived.
    ///
    /// EINTR is treated like a timeout: the caller re-checks its running
    /// flag and polls again.
    fn poll_events(&mut self, timeout_ms: i32) -> Result<Vec<InputEvent>, SourceError> {
        let mut events = Vec::new();

        let poll_result = unsafe {
            libc::poll(
                self.poll_fds.as_mut_ptr(),
                self.poll_fds.len() as libc::nfds_t,
                timeout_ms,
            )
        };

        if poll_result < 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EINTR) {
                return Ok(events);
            }
            return Err(SourceError::Io(err));
        }

        if poll_result == 0 {
            return Ok(events);
        }

        for (i, device) in self.devices.iter_mut().enumerate() {
            if self.poll_fds[i].revents & libc::POLLIN != 0 {
                if let Ok(device_events) = device.fetch_events() {
                    events.extend(device_events);
                }
            }
        }

        Ok(events)
    }

    fn ungrab_all(&mut self) {
        if self.grabbed {
            for device in &mut self.devices {
                let _ = device.ungrab();
            }
            self.grabbed = false;
        }
    }
}

impl Drop for GrabbedDevices {
    fn drop(&mut self) {
        self.ungrab_all();
    }
}

struct Registration {
    id: u64,
    filter: KeyFilter,
    suppress: bool,
    handler: EventHandler,
}

/// State shared between the delivery thread and the callers.
struct Shared {
    subs: Mutex<Vec<Registration>>,
    virt: Mutex<VirtualKeyboard>,
    held: Mutex<HashSet<u16>>,
}

impl Shared {
    /// Forward one event to the foreground through the virtual device.
    fn forward(&self, code: u16, value: i32) {
        if let Err(e) = self.virt.lock().emit_key(code, value) {
            log::warn!("passthrough write failed for code {}: {}", code, e);
        }
    }

    /// Handle one physical key-down: run matching subscriptions, then pass
    /// the key through unless a matching subscription suppresses it.
    ///
    /// The passthrough happens before the handlers run so that on the chord
    /// path the letter reaches the foreground ahead of the burst it
    /// triggers.
    fn deliver_down(&self, code: u16) {
        let key = Key(code);
        let (handlers, suppressed) = {
            let subs = self.subs.lock();
            let mut handlers = Vec::new();
            let mut suppressed = false;
            for sub in subs.iter() {
                if sub.filter.matches(key) {
                    handlers.push(Arc::clone(&sub.handler));
                    suppressed |= sub.suppress;
                }
            }
            (handlers, suppressed)
        };

        if !suppressed {
            self.forward(code, 1);
        }

        let event = PhysicalEvent::down(key);
        for handler in handlers {
            handler(&event);
        }
    }
}

/// Evdev-backed [`KeyEventSource`].
///
/// Grabs every physical keyboard so no key reaches the foreground directly;
/// everything is re-emitted through a uinput virtual device unless a
/// suppressing subscription matched it. Physical events are delivered to
/// subscriptions on a dedicated thread; handlers (and the bursts they start)
/// block that thread, so events arriving mid-burst are dropped by the
/// kernel's evdev buffering, never queued here.
pub struct EvdevSource {
    shared: Arc<Shared>,
    running: Arc<AtomicBool>,
    thread: Mutex<Option<JoinHandle<()>>>,
    next_id: AtomicU64,
}

impl EvdevSource {
    /// Grab the keyboards, create the virtual output device and start the
    /// delivery thread.
    ///
    /// Fails with [`SourceError::NoDevices`] when no keyboard is present and
    /// with an IO error when the process lacks the privileges for
    /// /dev/input or /dev/uinput.
    pub fn new() -> Result<Self, SourceError> {
        let virt = VirtualKeyboard::new()?;
        let mut devices = GrabbedDevices::open()?;

        let shared = Arc::new(Shared {
            subs: Mutex::new(Vec::new()),
            virt: Mutex::new(virt),
            held: Mutex::new(HashSet::new()),
        });

        let running = Arc::new(AtomicBool::new(true));

        let thread = {
            let shared = Arc::clone(&shared);
            let running = Arc::clone(&running);
            std::thread::Builder::new()
                .name("tabrs-events".to_string())
                .spawn(move || {
                    log::info!("delivery thread started");
                    run_delivery_loop(&mut devices, &shared, &running);
                    log::info!("delivery thread stopped");
                })
                .map_err(|e| SourceError::Registration(e.to_string()))?
        };

        Ok(Self {
            shared,
            running,
            thread: Mutex::new(Some(thread)),
            next_id: AtomicU64::new(0),
        })
    }
}

fn run_delivery_loop(devices: &mut GrabbedDevices, shared: &Shared, running: &AtomicBool) {
    while running.load(Ordering::SeqCst) {
        let events = match devices.poll_events(POLL_TIMEOUT_MS) {
            Ok(events) => events,
            Err(e) => {
                log::error!("device poll failed, delivery loop exiting: {}", e);
                break;
            }
        };

        for event in events {
            let code = match event.kind() {
                InputEventKind::Key(key) => key.code(),
                _ => continue,
            };

            match event.value() {
                1 => {
                    shared.held.lock().insert(code);
                    shared.deliver_down(code);
                }
                0 => {
                    shared.held.lock().remove(&code);
                    shared.forward(code, 0);
                }
                // Autorepeat is passed through untouched.
                2 => shared.forward(code, 2),
                _ => {}
            }
        }
    }
    // GrabbedDevices are dropped (and ungrabbed) when the thread returns.
}

impl KeyEventSource for EvdevSource {
    fn on_key_down(
        &self,
        filter: KeyFilter,
        suppress: bool,
        handler: EventHandler,
    ) -> Result<SubscriptionHandle, SourceError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.subs.lock().push(Registration {
            id,
            filter,
            suppress,
            handler,
        });
        Ok(SubscriptionHandle(id))
    }

    fn is_held(&self, key: Key) -> bool {
        // Reflects physical key-down duration, also for lock keys: CapsLock
        // reads as held exactly while the key is depressed, not while its
        // LED toggle is on.
        self.shared.held.lock().contains(&key.code())
    }

    fn synthesize(&self, key: Key, direction: KeyDirection) -> Result<(), SourceError> {
        let value = match direction {
            KeyDirection::Down => 1,
            KeyDirection::Up => 0,
        };
        self.shared.virt.lock().emit_key(key.code(), value)
    }

    fn unregister(&self, handle: SubscriptionHandle) {
        self.shared.subs.lock().retain(|s| s.id != handle.0);
    }
}

impl Drop for EvdevSource {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.lock().take() {
            let _ = thread.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_own_virtual_device_is_filtered() {
        assert!(is_own_virtual_device("Tabrs (virtual) Keyboard"));
        assert!(!is_own_virtual_device("AT Translated Set 2 keyboard"));
        assert!(!is_own_virtual_device(""));
    }

    #[test]
    fn test_list_devices_tolerates_missing_hardware() {
        // CI has no input devices; both outcomes are acceptable.
        match list_devices() {
            Ok(devices) => assert!(!devices.is_empty()),
            Err(SourceError::NoDevices) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
}
