/*!
 * Resource Handles
 *
 * A handle couples an externally produced resource with the owner that can
 * destroy it and the function that does so. It is a flat, move-only value:
 * keep it in the scope that carries the release obligation and pass the
 * inner value (via `get`) to code that only uses the resource.
 *
 * ## Example
 *
 * ```rust
 * use resguard::{Handle, LeakRegistry, LocationService};
 * use std::sync::Arc;
 *
 * struct Pool;
 * impl Pool {
 *     fn free(&self, _buf: Vec<u8>) {}
 * }
 *
 * let registry = LeakRegistry::new(LocationService);
 * let _active = registry.activate();
 *
 * let pool = Arc::new(Pool);
 * let buf = Handle::new(vec![0u8; 16], pool, Pool::free);
 * assert_eq!(buf.get().len(), 16);
 * buf.release();
 *
 * drop(_active);
 * registry.teardown();
 * ```
 */

use crate::core::id::HandleId;
use crate::registry::LeakRegistry;
use crate::release::DeepRelease;
use std::any::type_name;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Destroys a resource through its owner
pub type ReleaseFn<O, T> = fn(&O, T);

struct Tracking {
    registry: LeakRegistry,
    id: HandleId,
}

impl Tracking {
    fn start<T>(registry: LeakRegistry, origin: &'static Location<'static>) -> Option<Self> {
        let id = registry.track(type_name::<T>(), origin)?;
        Some(Self { registry, id })
    }
}

/// Resource handle: value, owner reference, release function
///
/// Not `Clone`: `release(self)` consumes the handle, so a resource can be
/// released at most once. There is deliberately no `Drop` impl; a handle
/// dropped without `release` stays registered and is reported at teardown.
#[must_use = "dropping a handle without releasing it leaks the resource"]
pub struct Handle<T, O: ?Sized = ()> {
    value: T,
    owner: Arc<O>,
    release: ReleaseFn<O, T>,
    tracking: Option<Tracking>,
}

impl<T, O: ?Sized> Handle<T, O> {
    /// Wrap `value`, tracking it with the thread's active registry if any
    ///
    /// The caller guarantees `value` came from `owner` and that
    /// `release(&owner, value)` is sound to call exactly once.
    #[track_caller]
    pub fn new(value: T, owner: Arc<O>, release: ReleaseFn<O, T>) -> Self {
        let origin = Location::caller();
        let tracking = LeakRegistry::active().and_then(|registry| Tracking::start::<T>(registry, origin));
        Self {
            value,
            owner,
            release,
            tracking,
        }
    }

    /// Wrap `value`, tracking it with an explicitly passed registry
    #[track_caller]
    pub fn new_in(
        registry: &LeakRegistry,
        value: T,
        owner: Arc<O>,
        release: ReleaseFn<O, T>,
    ) -> Self {
        let tracking = Tracking::start::<T>(registry.clone(), Location::caller());
        Self {
            value,
            owner,
            release,
            tracking,
        }
    }

    /// Wrap `value` without tracking, even if a registry is active
    pub fn untracked(value: T, owner: Arc<O>, release: ReleaseFn<O, T>) -> Self {
        Self {
            value,
            owner,
            release,
            tracking: None,
        }
    }

    /// The wrapped resource
    #[inline]
    pub fn get(&self) -> &T {
        &self.value
    }

    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.value
    }

    #[inline]
    pub fn owner(&self) -> &Arc<O> {
        &self.owner
    }

    /// Registry identifier, if tracked
    #[inline]
    pub fn id(&self) -> Option<HandleId> {
        self.tracking.as_ref().map(|t| t.id)
    }

    #[inline]
    pub fn is_tracked(&self) -> bool {
        self.tracking.is_some()
    }

    /// Registry that tracks this handle
    pub fn registry(&self) -> Option<&LeakRegistry> {
        self.tracking.as_ref().map(|t| &t.registry)
    }

    /// Untrack, then destroy the resource through its owner
    ///
    /// A panic inside the release function propagates to the caller.
    pub fn release(self) {
        let Self {
            value,
            owner,
            release,
            tracking,
        } = self;

        if let Some(Tracking { registry, id }) = tracking {
            registry.untrack(id);
        }
        release(&owner, value);
    }

    /// Give up the release obligation
    ///
    /// The handle is untracked and the caller becomes responsible for
    /// destroying the value through the returned owner.
    pub fn into_inner(self) -> (T, Arc<O>) {
        let Self {
            value,
            owner,
            tracking,
            ..
        } = self;

        if let Some(Tracking { registry, id }) = tracking {
            registry.untrack(id);
        }
        (value, owner)
    }
}

impl<T, O: ?Sized> DeepRelease for Handle<T, O> {
    #[inline]
    fn deep_release(self) {
        self.release();
    }
}

impl<T: fmt::Debug, O: ?Sized> fmt::Debug for Handle<T, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("value", &self.value)
            .field("id", &self.id())
            .finish_non_exhaustive()
    }
}
