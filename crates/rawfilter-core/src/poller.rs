// Rawfilter Key Poller
// Samples monitored keys on a background thread and fires bound actions

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use log::{debug, error, info};
use parking_lot::{Condvar, Mutex};
use smallvec::SmallVec;

use crate::source::KeySampler;
use crate::state::DeviceState;
use crate::{DeviceAction, Edge, Key, Trigger};

/// One action bound to a key edge, targeting a shared device state.
#[derive(Debug, Clone)]
pub struct BoundAction {
    /// Device name, for logging
    pub device: String,
    pub action: DeviceAction,
    pub state: Arc<DeviceState>,
}

impl BoundAction {
    pub fn new(device: impl Into<String>, action: DeviceAction, state: Arc<DeviceState>) -> Self {
        Self {
            device: device.into(),
            action,
            state,
        }
    }

    /// Apply the action; failures are logged and otherwise ignored
    pub fn run(&self, trigger: Trigger) {
        match self.state.apply(&self.action) {
            Ok(enabled) => info!(
                target: "poller",
                "{}: {} on {} -> {}",
                trigger,
                self.action,
                self.device,
                if enabled { "enabled" } else { "disabled" }
            ),
            Err(e) => error!(
                target: "poller",
                "{}: {} on {} failed: {}",
                trigger,
                self.action,
                self.device,
                e
            ),
        }
    }
}

/// Tracks monitored keys and fires bindings on their edges.
///
/// Every key starts Released. Keys are sampled in the order they were first
/// bound; bindings on the same (key, edge) fire in registration order.
#[derive(Debug, Default)]
pub struct KeyEdgeDetector {
    pressed: IndexMap<Key, bool>,
    bindings: HashMap<Trigger, SmallVec<[BoundAction; 2]>>,
}

impl KeyEdgeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding and start monitoring its key
    pub fn bind(&mut self, trigger: Trigger, action: BoundAction) {
        self.pressed.entry(trigger.key).or_insert(false);
        self.bindings.entry(trigger).or_default().push(action);
    }

    /// Keys sampled on each tick
    pub fn monitored_keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.pressed.keys().copied()
    }

    /// Tracked state of `key`; unmonitored keys are never pressed
    pub fn is_pressed(&self, key: Key) -> bool {
        self.pressed.get(&key).copied().unwrap_or(false)
    }

    /// Bindings registered for `trigger`
    pub fn bindings_for(&self, trigger: Trigger) -> &[BoundAction] {
        self.bindings
            .get(&trigger)
            .map(|b| b.as_slice())
            .unwrap_or(&[])
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.values().map(SmallVec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Sample every monitored key once, firing bindings for each edge.
    ///
    /// Returns the number of edges seen.
    pub fn tick(&mut self, sampler: &dyn KeySampler) -> usize {
        let mut edges = 0;
        for (key, pressed) in self.pressed.iter_mut() {
            let down = sampler.is_down(*key);
            let edge = match Edge::from_transition(*pressed, down) {
                Some(edge) => edge,
                None => continue,
            };
            *pressed = down;
            edges += 1;

            let trigger = Trigger::new(*key, edge);
            debug!(target: "poller", "edge {}", trigger);
            if let Some(actions) = self.bindings.get(&trigger) {
                for action in actions {
                    action.run(trigger);
                }
            }
        }
        edges
    }
}

struct Shared {
    running: AtomicBool,
    ticks: AtomicU64,
    lock: Mutex<()>,
    wake: Condvar,
}

/// Background thread running [`KeyEdgeDetector::tick`] at a fixed period.
///
/// Stopping wakes the thread out of its sleep and joins it, so no tick runs
/// after [`Poller::stop`] returns.
pub struct Poller {
    shared: Arc<Shared>,
    period: Duration,
    handle: Option<thread::JoinHandle<KeyEdgeDetector>>,
}

impl Poller {
    pub fn spawn(
        mut detector: KeyEdgeDetector,
        sampler: Arc<dyn KeySampler>,
        period: Duration,
    ) -> io::Result<Self> {
        let shared = Arc::new(Shared {
            running: AtomicBool::new(true),
            ticks: AtomicU64::new(0),
            lock: Mutex::new(()),
            wake: Condvar::new(),
        });

        let thread_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("rawfilter-poller".into())
            .spawn(move || {
                let shared = thread_shared;
                debug!(target: "poller", "started, period {:?}", period);
                while shared.running.load(Ordering::Acquire) {
                    detector.tick(&*sampler);
                    shared.ticks.fetch_add(1, Ordering::Relaxed);

                    let deadline = Instant::now() + period;
                    let mut guard = shared.lock.lock();
                    while shared.running.load(Ordering::Acquire) {
                        if shared.wake.wait_until(&mut guard, deadline).timed_out() {
                            break;
                        }
                    }
                }
                debug!(target: "poller", "stopped");
                detector
            })?;

        Ok(Self {
            shared,
            period,
            handle: Some(handle),
        })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Completed ticks so far
    pub fn ticks(&self) -> u64 {
        self.shared.ticks.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some() && self.shared.running.load(Ordering::Acquire)
    }

    /// Stop the thread and hand back the detector with its tracked key state
    pub fn stop(mut self) -> Option<KeyEdgeDetector> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Option<KeyEdgeDetector> {
        let handle = self.handle.take()?;
        {
            let _guard = self.shared.lock.lock();
            self.shared.running.store(false, Ordering::Release);
            self.shared.wake.notify_all();
        }
        match handle.join() {
            Ok(detector) => Some(detector),
            Err(_) => {
                error!(target: "poller", "poller thread panicked");
                None
            }
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("period", &self.period)
            .field("running", &self.is_running())
            .field("ticks", &self.ticks())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Sampler whose pressed keys the test controls
    #[derive(Default)]
    struct Keys(Mutex<HashSet<Key>>);

    impl Keys {
        fn set(&self, key: Key, down: bool) {
            let mut keys = self.0.lock();
            if down {
                keys.insert(key);
            } else {
                keys.remove(&key);
            }
        }
    }

    impl KeySampler for Keys {
        fn is_down(&self, key: Key) -> bool {
            self.0.lock().contains(&key)
        }
    }

    const F13: Key = Key(0x7C);
    const F14: Key = Key(0x7D);

    #[test]
    fn test_press_fires_release_does_not() {
        let state = Arc::new(DeviceState::new(true));
        let mut detector = KeyEdgeDetector::new();
        detector.bind(
            Trigger::press(F13),
            BoundAction::new("mouse", DeviceAction::Toggle, Arc::clone(&state)),
        );
        let keys = Keys::default();

        assert_eq!(detector.tick(&keys), 0);
        assert!(state.get_state());

        keys.set(F13, true);
        assert_eq!(detector.tick(&keys), 1);
        assert!(!state.get_state());
        assert!(detector.is_pressed(F13));

        // Held: no new edge
        assert_eq!(detector.tick(&keys), 0);
        assert!(!state.get_state());

        keys.set(F13, false);
        assert_eq!(detector.tick(&keys), 1);
        assert!(!state.get_state());
        assert!(!detector.is_pressed(F13));
    }

    #[test]
    fn test_bindings_fire_in_order() {
        let state = Arc::new(DeviceState::new(true));
        let mut detector = KeyEdgeDetector::new();
        detector.bind(
            Trigger::press(F13),
            BoundAction::new("kbd", DeviceAction::PushState(false), Arc::clone(&state)),
        );
        detector.bind(
            Trigger::press(F13),
            BoundAction::new("kbd", DeviceAction::SetState(true), Arc::clone(&state)),
        );
        detector.bind(
            Trigger::release(F13),
            BoundAction::new("kbd", DeviceAction::PopState, Arc::clone(&state)),
        );
        assert_eq!(detector.binding_count(), 3);
        assert_eq!(detector.bindings_for(Trigger::press(F13)).len(), 2);

        let keys = Keys::default();
        keys.set(F13, true);
        detector.tick(&keys);
        // push(false) then set(true)
        assert!(state.get_state());
        assert_eq!(state.depth(), 1);

        keys.set(F13, false);
        detector.tick(&keys);
        assert!(state.get_state());
        assert_eq!(state.depth(), 0);
    }

    #[test]
    fn test_failed_action_does_not_stop_tick() {
        let first = Arc::new(DeviceState::new(true));
        let second = Arc::new(DeviceState::new(true));
        let mut detector = KeyEdgeDetector::new();
        detector.bind(
            Trigger::press(F13),
            BoundAction::new("a", DeviceAction::PopState, Arc::clone(&first)),
        );
        detector.bind(
            Trigger::press(F14),
            BoundAction::new("b", DeviceAction::Disable, Arc::clone(&second)),
        );

        let keys = Keys::default();
        keys.set(F13, true);
        keys.set(F14, true);
        assert_eq!(detector.tick(&keys), 2);
        assert!(first.get_state());
        assert!(!second.get_state());
    }

    #[test]
    fn test_monitored_keys_order() {
        let state = Arc::new(DeviceState::default());
        let mut detector = KeyEdgeDetector::new();
        detector.bind(
            Trigger::release(F14),
            BoundAction::new("a", DeviceAction::Enable, Arc::clone(&state)),
        );
        detector.bind(
            Trigger::press(F13),
            BoundAction::new("a", DeviceAction::Enable, Arc::clone(&state)),
        );
        detector.bind(
            Trigger::press(F14),
            BoundAction::new("a", DeviceAction::Enable, state),
        );
        let keys: Vec<_> = detector.monitored_keys().collect();
        assert_eq!(keys, vec![F14, F13]);
    }

    #[test]
    fn test_poller_runs_and_stops() {
        let state = Arc::new(DeviceState::new(true));
        let mut detector = KeyEdgeDetector::new();
        detector.bind(
            Trigger::press(F13),
            BoundAction::new("mouse", DeviceAction::Disable, Arc::clone(&state)),
        );
        let keys = Arc::new(Keys::default());
        keys.set(F13, true);

        let poller = Poller::spawn(detector, keys.clone(), Duration::from_millis(5)).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while state.get_state() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(!state.get_state());
        assert!(poller.is_running());

        let detector = poller.stop().unwrap();
        assert!(detector.is_pressed(F13));
    }

    #[test]
    fn test_stop_interrupts_long_period() {
        let keys = Arc::new(Keys::default());
        let poller =
            Poller::spawn(KeyEdgeDetector::new(), keys, Duration::from_secs(3600)).unwrap();

        let started = Instant::now();
        assert!(poller.stop().is_some());
        assert!(started.elapsed() < Duration::from_secs(60));
    }

    #[test]
    fn test_no_ticks_after_stop() {
        let keys = Arc::new(Keys::default());
        let poller =
            Poller::spawn(KeyEdgeDetector::new(), keys, Duration::from_millis(1)).unwrap();
        thread::sleep(Duration::from_millis(20));
        let shared = Arc::clone(&poller.shared);
        drop(poller);

        let ticks = shared.ticks.load(Ordering::Relaxed);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(shared.ticks.load(Ordering::Relaxed), ticks);
    }
}
