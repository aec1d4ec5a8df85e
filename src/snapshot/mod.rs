/*!
 * Diagnostic Snapshots
 *
 * Opaque records of the execution context at handle creation, captured and
 * rendered by a pluggable service. The registry never looks inside a
 * snapshot; it only stores it and asks the service to render it when the
 * handle leaks.
 */

mod backtrace;
mod location;

pub use backtrace::BacktraceService;
pub use location::LocationService;

use std::any::Any;
use std::fmt;
use std::panic::Location;

/// Opaque diagnostic payload produced by a [`SnapshotService`]
pub struct Snapshot {
    payload: Box<dyn Any + Send + Sync>,
}

impl Snapshot {
    #[inline]
    pub fn new<P: Any + Send + Sync>(payload: P) -> Self {
        Self {
            payload: Box::new(payload),
        }
    }

    /// Recover the payload a service stored
    #[inline]
    pub fn downcast_ref<P: Any>(&self) -> Option<&P> {
        self.payload.downcast_ref::<P>()
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot").finish_non_exhaustive()
    }
}

/// Diagnostic snapshot collaborator
///
/// `capture` runs once per tracked handle, inside the handle constructor.
/// `render` runs only for leaked handles at teardown.
pub trait SnapshotService: Send + Sync {
    /// Short name for logging
    fn name(&self) -> &'static str;

    /// Capture the current execution context
    fn capture(&self, origin: &'static Location<'static>) -> Snapshot;

    /// Human-readable form of a snapshot this service captured
    fn render(&self, snapshot: &Snapshot) -> String;

    /// Dispose of a snapshot that is no longer needed
    fn release(&self, snapshot: Snapshot) {
        drop(snapshot);
    }
}

/// Fallback text when a snapshot was produced by a different service
pub(crate) const FOREIGN_SNAPSHOT: &str = "<snapshot captured by another service>";
