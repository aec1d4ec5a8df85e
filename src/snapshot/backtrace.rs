/*!
 * Backtrace Snapshots
 * Creation site plus a forced call-stack capture
 */

use super::{Snapshot, SnapshotService, FOREIGN_SNAPSHOT};
use std::backtrace::Backtrace;
use std::panic::Location;

/// Captures a full backtrace for every tracked handle
///
/// Capture is forced regardless of `RUST_BACKTRACE`; leak reports are useless
/// without the stack.
#[derive(Debug, Clone, Copy, Default)]
pub struct BacktraceService;

struct BacktraceSnapshot {
    origin: &'static Location<'static>,
    backtrace: Backtrace,
}

impl SnapshotService for BacktraceService {
    fn name(&self) -> &'static str {
        "backtrace"
    }

    fn capture(&self, origin: &'static Location<'static>) -> Snapshot {
        Snapshot::new(BacktraceSnapshot {
            origin,
            backtrace: Backtrace::force_capture(),
        })
    }

    fn render(&self, snapshot: &Snapshot) -> String {
        match snapshot.downcast_ref::<BacktraceSnapshot>() {
            Some(captured) => format!(
                "created at {}\nstack backtrace:\n{}",
                captured.origin, captured.backtrace
            ),
            None => FOREIGN_SNAPSHOT.to_string(),
        }
    }
}
