/*!
 * Leak Registry
 *
 * Records every live resource handle together with a diagnostic snapshot.
 * Releasing a handle removes its entry; whatever is left at teardown is a
 * leak and fails the teardown.
 *
 * ## Lifecycle
 *
 * ```text
 * LeakRegistry::new(service) -> set_active()/activate() -> handles tracked
 *     -> handles released (untracked) -> teardown()
 * ```
 *
 * The registry tracks, it never owns or destroys resources.
 */

mod active;
mod config;

pub use active::ActiveRegistryGuard;
pub use config::{CaptureMode, RegistryConfig, CAPTURE_ENV, LOG_LEAKS_ENV};

use crate::core::errors::{ConfigError, LeakReport, LeakedHandle};
use crate::core::id::{HandleId, HandleIdAllocator};
use crate::monitoring::span_teardown;
use crate::snapshot::{Snapshot, SnapshotService};
use ahash::RandomState;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;
use tracing::{debug, error, trace, warn};

struct LeakEntry {
    snapshot: Snapshot,
    type_name: &'static str,
    origin: &'static Location<'static>,
}

struct RegistryState {
    entries: HashMap<HandleId, LeakEntry, RandomState>,
    torn_down: bool,
}

struct RegistryInner {
    state: Mutex<RegistryState>,
    ids: HandleIdAllocator,
    service: Box<dyn SnapshotService>,
    log_leaks: bool,
}

impl Drop for RegistryInner {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if !state.torn_down && !state.entries.is_empty() {
            warn!(
                live = state.entries.len(),
                "leak registry dropped without teardown; live handles were never reported"
            );
        }
    }
}

/// Registry of live resource handles
///
/// Cheap to clone: clones share the same entries. A tracked handle keeps a
/// clone so that its release reaches the registry that tracked it.
///
/// Entries are added and removed only by handle construction and release.
/// A dropped handle's entry cannot be erased from outside the crate:
///
/// ```compile_fail
/// use resguard::{Handle, LeakRegistry, LocationService};
/// use std::sync::Arc;
///
/// let registry = LeakRegistry::new(LocationService);
/// let handle = Handle::new_in(&registry, 1u32, Arc::new(()), |_, _| {});
/// let id = handle.id().unwrap();
/// drop(handle);
/// registry.untrack(id);
/// ```
///
/// Nor can an entry be added that no handle owns:
///
/// ```compile_fail
/// use resguard::{LeakRegistry, LocationService};
///
/// let registry = LeakRegistry::new(LocationService);
/// let _ = registry.track("ghost", std::panic::Location::caller());
/// ```
///
/// Ids are issued by the registry only:
///
/// ```compile_fail
/// let _forged = resguard::HandleId(1);
/// ```
#[derive(Clone)]
pub struct LeakRegistry {
    inner: Arc<RegistryInner>,
}

impl LeakRegistry {
    /// Create an empty registry around a snapshot service
    pub fn new<S: SnapshotService + 'static>(service: S) -> Self {
        Self::from_parts(Box::new(service), true)
    }

    /// Create a registry from configuration
    pub fn with_config(config: &RegistryConfig) -> Self {
        Self::from_parts(config.capture.service(), config.log_leaks)
    }

    /// Create a registry configured from `RESGUARD_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::with_config(&RegistryConfig::from_env()?))
    }

    fn from_parts(service: Box<dyn SnapshotService>, log_leaks: bool) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                state: Mutex::new(RegistryState {
                    entries: HashMap::with_hasher(RandomState::new()),
                    torn_down: false,
                }),
                ids: HandleIdAllocator::default(),
                service,
                log_leaks,
            }),
        }
    }

    /// Name of the snapshot service in use
    pub fn service_name(&self) -> &'static str {
        self.inner.service.name()
    }

    /// Register a new handle
    ///
    /// Returns `None` once the registry has been torn down.
    pub(crate) fn track(
        &self,
        type_name: &'static str,
        origin: &'static Location<'static>,
    ) -> Option<HandleId> {
        if self.inner.state.lock().torn_down {
            warn!(type_name, %origin, "handle created after registry teardown; not tracked");
            return None;
        }

        let id = self.inner.ids.allocate();
        // Capture can be slow (backtraces); keep it outside the lock
        let snapshot = self.inner.service.capture(origin);

        let mut state = self.inner.state.lock();
        if state.torn_down {
            drop(state);
            self.inner.service.release(snapshot);
            return None;
        }
        state.entries.insert(
            id,
            LeakEntry {
                snapshot,
                type_name,
                origin,
            },
        );
        drop(state);

        trace!(id = id.get(), type_name, "tracking handle");
        Some(id)
    }

    /// Remove a handle's entry and release its snapshot
    ///
    /// Unknown ids are ignored (already reported at teardown).
    pub(crate) fn untrack(&self, id: HandleId) {
        let entry = self.inner.state.lock().entries.remove(&id);
        match entry {
            Some(entry) => {
                trace!(id = id.get(), type_name = entry.type_name, "untracking handle");
                self.inner.service.release(entry.snapshot);
            }
            None => debug!(id = id.get(), "untrack of unknown handle ignored"),
        }
    }

    /// Number of handles tracked and not yet released
    pub fn live_count(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    pub fn is_live(&self, id: HandleId) -> bool {
        self.inner.state.lock().entries.contains_key(&id)
    }

    pub fn is_torn_down(&self) -> bool {
        self.inner.state.lock().torn_down
    }

    /// Whether two values refer to the same registry
    pub fn same_registry(&self, other: &LeakRegistry) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Tear down, handing back the leak report instead of failing
    ///
    /// Every remaining entry is rendered, emitted to the `tracing` error
    /// stream (unless disabled by configuration) and its snapshot released.
    /// The registry stops tracking new handles and leaves the active slot.
    pub fn try_teardown(self) -> Result<(), LeakReport> {
        active::clear_if(&self);
        let span = span_teardown(self.service_name());
        let _entered = span.enter();

        let mut entries: Vec<(HandleId, LeakEntry)> = {
            let mut state = self.inner.state.lock();
            state.torn_down = true;
            state.entries.drain().collect()
        };

        if entries.is_empty() {
            debug!(service = self.service_name(), "leak registry torn down clean");
            return Ok(());
        }

        entries.sort_by_key(|(id, _)| *id);
        span.record_leaked(entries.len());

        let mut leaks = Vec::with_capacity(entries.len());
        for (id, entry) in entries {
            let rendered = self.inner.service.render(&entry.snapshot);
            if self.inner.log_leaks {
                error!(
                    id = id.get(),
                    type_name = entry.type_name,
                    origin = %entry.origin,
                    "leaked resource handle\n{}",
                    rendered
                );
            }
            self.inner.service.release(entry.snapshot);

            leaks.push(LeakedHandle {
                id,
                type_name: entry.type_name.to_string(),
                origin: entry.origin.to_string(),
                snapshot: rendered,
            });
        }

        Err(LeakReport::new(leaks))
    }

    /// Tear down and fail hard if any handle was never released
    ///
    /// # Panics
    ///
    /// Panics with the rendered leak report when entries remain.
    #[track_caller]
    pub fn teardown(self) {
        if let Err(report) = self.try_teardown() {
            report.fail();
        }
    }
}

impl Default for LeakRegistry {
    fn default() -> Self {
        Self::with_config(&RegistryConfig::default())
    }
}

impl fmt::Debug for LeakRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("LeakRegistry")
            .field("service", &self.inner.service.name())
            .field("live", &state.entries.len())
            .field("torn_down", &state.torn_down)
            .finish()
    }
}
