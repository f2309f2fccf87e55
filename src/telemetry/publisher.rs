//! Lock-protected telemetry snapshot shared between the worker and readers.

use parking_lot::Mutex;

use super::types::TrackedDeviceSnapshot;

/// Holds the most recent device snapshot.
///
/// The worker publishes with `try_lock` so a slow reader costs at most one
/// skipped sample; readers block briefly and get their own copy.
pub struct SnapshotPublisher {
    snapshot: Mutex<TrackedDeviceSnapshot>,
}

impl SnapshotPublisher {
    pub fn new(capacity: usize) -> Self {
        Self {
            snapshot: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    /// Rebuild the snapshot in place if the lock is free right now.
    ///
    /// Returns `false` (and does not call `update`) when a reader holds it.
    pub fn try_publish_with<F>(&self, update: F) -> bool
    where
        F: FnOnce(&mut TrackedDeviceSnapshot),
    {
        match self.snapshot.try_lock() {
            Some(mut snapshot) => {
                update(&mut snapshot);
                true
            }
            None => {
                log::trace!("[TELEMETRY] Snapshot busy, skipping sample");
                false
            }
        }
    }

    /// Copy of the latest snapshot.
    pub fn read_copy(&self) -> TrackedDeviceSnapshot {
        self.snapshot.lock().clone()
    }

    /// Drop all records, e.g. after losing the runtime.
    pub fn clear(&self) {
        log::debug!("[TELEMETRY] Clearing device snapshot");
        self.snapshot.lock().clear();
    }
}

impl Default for SnapshotPublisher {
    fn default() -> Self {
        Self::new(0)
    }
}
