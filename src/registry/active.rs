/*!
 * Active Registry Slot
 *
 * One registry per thread may be active. Handle constructors consult the
 * slot; when it is empty, tracking is skipped entirely.
 */

use super::LeakRegistry;
use std::cell::RefCell;
use std::marker::PhantomData;
use tracing::debug;

thread_local! {
    static ACTIVE: RefCell<Option<LeakRegistry>> = const { RefCell::new(None) };
}

impl LeakRegistry {
    /// Make this registry the active one for the current thread
    ///
    /// Last call wins; the previous occupant is simply replaced.
    pub fn set_active(&self) {
        let previous = ACTIVE.with(|slot| slot.borrow_mut().replace(self.clone()));
        debug!(replaced = previous.is_some(), "leak registry activated");
    }

    /// The registry active on the current thread, if any
    pub fn active() -> Option<LeakRegistry> {
        ACTIVE.with(|slot| slot.borrow().clone())
    }

    /// Empty the active slot, returning its occupant
    pub fn clear_active() -> Option<LeakRegistry> {
        ACTIVE.with(|slot| slot.borrow_mut().take())
    }

    /// Whether this registry occupies the current thread's slot
    pub fn is_active(&self) -> bool {
        ACTIVE.with(|slot| {
            slot.borrow()
                .as_ref()
                .is_some_and(|active| active.same_registry(self))
        })
    }

    /// Activate for a scope; the previous occupant is restored on drop
    pub fn activate(&self) -> ActiveRegistryGuard {
        let previous = ACTIVE.with(|slot| slot.borrow_mut().replace(self.clone()));
        debug!(replaced = previous.is_some(), "leak registry activated for scope");
        ActiveRegistryGuard {
            previous,
            _thread_bound: PhantomData,
        }
    }
}

/// Scope guard returned by [`LeakRegistry::activate`]
///
/// Restores the slot of the thread that created it, so it cannot leave
/// that thread:
///
/// ```compile_fail
/// use resguard::{LeakRegistry, LocationService};
///
/// let registry = LeakRegistry::new(LocationService);
/// let guard = registry.activate();
/// std::thread::spawn(move || drop(guard));
/// ```
#[must_use = "the registry is deactivated as soon as the guard is dropped"]
pub struct ActiveRegistryGuard {
    previous: Option<LeakRegistry>,
    // Thread-local slot state: !Send and !Sync
    _thread_bound: PhantomData<*const ()>,
}

impl Drop for ActiveRegistryGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        let displaced = ACTIVE.with(|slot| std::mem::replace(&mut *slot.borrow_mut(), previous));
        // Dropped outside the borrow
        drop(displaced);
    }
}

/// Leave the slot if `registry` occupies it
pub(super) fn clear_if(registry: &LeakRegistry) {
    let cleared = ACTIVE.with(|slot| {
        let mut slot = slot.borrow_mut();
        if slot
            .as_ref()
            .is_some_and(|active| active.same_registry(registry))
        {
            slot.take()
        } else {
            None
        }
    });
    drop(cleared);
}
