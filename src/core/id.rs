/*!
 * Handle Identifiers
 * Registry-local ids and the monotonic allocator that issues them
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of a tracked resource handle
///
/// Only meaningful as a lookup key inside the registry that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandleId(pub(crate) u64);

impl HandleId {
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lock-free handle id allocator
///
/// Ids are never recycled. A leaked handle keeps its entry until teardown,
/// so a reused id would alias two unrelated handles in the report.
#[derive(Debug)]
pub struct HandleIdAllocator {
    next: AtomicU64,
}

impl HandleIdAllocator {
    #[inline]
    pub const fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Allocate the next id
    #[inline]
    pub fn allocate(&self) -> HandleId {
        HandleId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for HandleIdAllocator {
    fn default() -> Self {
        Self::starting_at(1)
    }
}
