/*!
 * Leak Registry Tests
 * Tracking, teardown, configuration and report output
 */

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use resguard::registry::{CAPTURE_ENV, LOG_LEAKS_ENV};
use resguard::{
    BacktraceService, CaptureMode, ConfigError, Handle, LeakRegistry, LocationService,
    RegistryConfig,
};
use serial_test::serial;
use std::sync::Arc;

fn noop(_: &(), _: u32) {}

#[test]
fn test_released_handles_leave_no_entries() {
    let registry = LeakRegistry::new(LocationService);
    let _active = registry.activate();

    let handles: Vec<_> = (0..10).map(|i| Handle::new(i, Arc::new(()), noop)).collect();
    assert_eq!(registry.live_count(), 10);

    for handle in handles {
        handle.release();
    }
    assert_eq!(registry.live_count(), 0);

    drop(_active);
    registry.teardown();
}

#[test]
fn test_each_leak_reported_once() {
    let registry = LeakRegistry::new(LocationService);
    let _active = registry.activate();

    let kept = Handle::new(1, Arc::new(()), noop);
    let leaked_a = Handle::new(2, Arc::new(()), noop);
    let leaked_b = Handle::new(3, Arc::new(()), noop);
    let ids = [leaked_a.id().unwrap(), leaked_b.id().unwrap()];
    drop(leaked_a);
    drop(leaked_b);
    kept.release();
    drop(_active);

    let report = registry.try_teardown().unwrap_err();
    assert_eq!(report.len(), 2);
    let reported: Vec<_> = report.leaks().iter().map(|leak| leak.id).collect();
    assert_eq!(reported, ids.to_vec());
}

#[test]
fn test_backtrace_snapshot_rendered_in_report() {
    let registry = LeakRegistry::new(BacktraceService);
    let handle = Handle::new_in(&registry, 1, Arc::new(()), noop);
    drop(handle);

    let report = registry.try_teardown().unwrap_err();
    assert!(!report.leaks()[0].snapshot.is_empty());
    assert!(report.render().contains("registry_test.rs"));
}

#[test]
fn test_report_json_lists_leaks() {
    let registry = LeakRegistry::new(LocationService);
    let handle = Handle::new_in(&registry, 1, Arc::new(()), noop);
    let id = handle.id().unwrap();
    drop(handle);

    let report = registry.try_teardown().unwrap_err();
    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["leaks"][0]["id"], serde_json::json!(id.get()));
    assert_eq!(json["leaks"][0]["type_name"], "u32");
}

#[test]
#[should_panic(expected = "leaked handle")]
fn test_teardown_fails_hard() {
    let registry = LeakRegistry::new(LocationService);
    let handle = Handle::new_in(&registry, 1, Arc::new(()), noop);
    drop(handle);
    registry.teardown();
}

#[test]
fn test_handle_after_teardown_is_untracked() {
    let registry = LeakRegistry::new(LocationService);
    let clone = registry.clone();
    registry.teardown();

    let handle = Handle::new_in(&clone, 1, Arc::new(()), noop);
    assert!(!handle.is_tracked());
    handle.release();
}

#[test]
fn test_lightweight_config() {
    let registry = LeakRegistry::with_config(&RegistryConfig::lightweight());
    assert_eq!(registry.service_name(), "location");
    registry.teardown();

    let registry = LeakRegistry::default();
    assert_eq!(registry.service_name(), "backtrace");
    registry.teardown();
}

#[test]
#[serial]
fn test_from_env_defaults() {
    std::env::remove_var(CAPTURE_ENV);
    std::env::remove_var(LOG_LEAKS_ENV);

    let config = RegistryConfig::from_env().unwrap();
    assert_eq!(config, RegistryConfig::default());
    assert_eq!(config.capture, CaptureMode::Backtrace);
}

#[test]
#[serial]
fn test_from_env_overrides() {
    std::env::set_var(CAPTURE_ENV, "location");
    std::env::set_var(LOG_LEAKS_ENV, "0");

    let config = RegistryConfig::from_env().unwrap();
    assert_eq!(config.capture, CaptureMode::Location);
    assert!(!config.log_leaks);

    let registry = LeakRegistry::from_env().unwrap();
    registry.teardown();

    std::env::remove_var(CAPTURE_ENV);
    std::env::remove_var(LOG_LEAKS_ENV);
}

#[test]
#[serial]
fn test_from_env_rejects_garbage() {
    std::env::set_var(CAPTURE_ENV, "everything");

    let err = RegistryConfig::from_env().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { var, .. } if var == CAPTURE_ENV));

    std::env::remove_var(CAPTURE_ENV);
}

proptest! {
    #[test]
    fn prop_leaks_are_exactly_the_unreleased(released in proptest::collection::vec(any::<bool>(), 0..32)) {
        let registry = LeakRegistry::new(LocationService);
        let mut expected = Vec::new();

        for (i, release) in released.iter().enumerate() {
            let handle = Handle::new_in(&registry, i as u32, Arc::new(()), noop);
            if *release {
                handle.release();
            } else {
                expected.push(handle.id().unwrap());
                drop(handle);
            }
        }

        match registry.try_teardown() {
            Ok(()) => prop_assert!(expected.is_empty()),
            Err(report) => {
                let reported: Vec<_> = report.leaks().iter().map(|leak| leak.id).collect();
                prop_assert_eq!(reported, expected);
            }
        }
    }
}
