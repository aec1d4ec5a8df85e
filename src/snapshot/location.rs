/*!
 * Location Snapshots
 * Records only the creation site; cheap and deterministic
 */

use super::{Snapshot, SnapshotService, FOREIGN_SNAPSHOT};
use std::panic::Location;

#[derive(Debug, Clone, Copy, Default)]
pub struct LocationService;

impl SnapshotService for LocationService {
    fn name(&self) -> &'static str {
        "location"
    }

    fn capture(&self, origin: &'static Location<'static>) -> Snapshot {
        Snapshot::new(origin)
    }

    fn render(&self, snapshot: &Snapshot) -> String {
        match snapshot.downcast_ref::<&'static Location<'static>>() {
            Some(origin) => format!("created at {}", origin),
            None => FOREIGN_SNAPSHOT.to_string(),
        }
    }
}
