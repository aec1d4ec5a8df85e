/*!
 * Resguard
 * Leak-checked resource handles with structural deep release
 *
 * Handles couple a resource with the owner that destroys it. A
 * [`LeakRegistry`] records every live handle with a diagnostic snapshot and
 * fails at teardown if any handle was never released. [`deep_release`]
 * walks a value's structure and releases every handle it reaches.
 */

// Lets `#[derive(DeepRelease)]` expand to `::resguard::...` inside this crate
extern crate self as resguard;

pub mod core;
pub mod handle;
pub mod monitoring;
pub mod registry;
pub mod release;
pub mod snapshot;

// Re-exports
pub use crate::core::errors::{ConfigError, LeakReport, LeakedHandle};
pub use crate::core::id::HandleId;
pub use handle::{Handle, ReleaseFn};
pub use monitoring::init_tracing;
pub use registry::{ActiveRegistryGuard, CaptureMode, LeakRegistry, RegistryConfig};
pub use release::{deep_release, DeepRelease, ExplicitRelease};
pub use snapshot::{BacktraceService, LocationService, Snapshot, SnapshotService};
