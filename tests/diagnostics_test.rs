/*!
 * Diagnostics Tests
 * What the registry emits on the tracing stream during normal use and at
 * teardown
 */

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use resguard::registry::LOG_LEAKS_ENV;
use resguard::{CaptureMode, Handle, LeakRegistry, LocationService, RegistryConfig};
use serial_test::serial;
use std::sync::Arc;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// Records the level of every event it sees
#[derive(Clone, Default)]
struct LevelRecorder {
    levels: Arc<Mutex<Vec<Level>>>,
}

impl LevelRecorder {
    fn count(&self, level: Level) -> usize {
        self.levels.lock().iter().filter(|l| **l == level).count()
    }
}

impl<S: Subscriber> Layer<S> for LevelRecorder {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        self.levels.lock().push(*event.metadata().level());
    }
}

fn recorded<R>(f: impl FnOnce() -> R) -> (R, LevelRecorder) {
    let recorder = LevelRecorder::default();
    let subscriber = tracing_subscriber::registry().with(recorder.clone());
    let out = tracing::subscriber::with_default(subscriber, f);
    (out, recorder)
}

fn noop(_: &(), _: u32) {}

fn leak_n(registry: &LeakRegistry, n: u32) {
    for i in 0..n {
        let handle = Handle::new_in(registry, i, Arc::new(()), noop);
        drop(handle);
    }
}

#[test]
fn test_one_error_event_per_leak() {
    let (leaked, recorder) = recorded(|| {
        let registry = LeakRegistry::new(LocationService);
        leak_n(&registry, 3);
        registry.try_teardown().map_err(|report| report.len())
    });

    assert_eq!(leaked, Err(3));
    assert_eq!(recorder.count(Level::ERROR), 3);
}

#[test]
fn test_leak_logging_disabled_by_config() {
    let config = RegistryConfig {
        capture: CaptureMode::Location,
        log_leaks: false,
    };

    let (leaked, recorder) = recorded(|| {
        let registry = LeakRegistry::with_config(&config);
        leak_n(&registry, 2);
        registry.try_teardown().map_err(|report| report.len())
    });

    assert_eq!(leaked, Err(2));
    assert_eq!(recorder.count(Level::ERROR), 0);
}

#[test]
#[serial]
fn test_leak_logging_disabled_by_env() {
    std::env::set_var(LOG_LEAKS_ENV, "0");

    let (leaked, recorder) = recorded(|| {
        let registry = LeakRegistry::from_env().unwrap();
        leak_n(&registry, 1);
        registry.try_teardown().is_err()
    });

    std::env::remove_var(LOG_LEAKS_ENV);
    assert!(leaked);
    assert_eq!(recorder.count(Level::ERROR), 0);
}

#[test]
fn test_clean_run_is_silent() {
    let (clean, recorder) = recorded(|| {
        let registry = LeakRegistry::new(LocationService);
        let _active = registry.activate();

        let handles: Vec<_> = (0..4).map(|i| Handle::new(i, Arc::new(()), noop)).collect();
        for handle in handles {
            handle.release();
        }

        drop(_active);
        registry.try_teardown().is_ok()
    });

    assert!(clean);
    assert_eq!(recorder.count(Level::WARN), 0);
    assert_eq!(recorder.count(Level::ERROR), 0);
}

#[test]
fn test_tracking_after_teardown_warns() {
    let (tracked, recorder) = recorded(|| {
        let registry = LeakRegistry::new(LocationService);
        let clone = registry.clone();
        registry.teardown();

        let handle = Handle::new_in(&clone, 1, Arc::new(()), noop);
        let tracked = handle.is_tracked();
        handle.release();
        tracked
    });

    assert!(!tracked);
    assert_eq!(recorder.count(Level::WARN), 1);
}
