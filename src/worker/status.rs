//! Observable worker state.

use std::sync::atomic::{AtomicU8, Ordering};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Lifecycle of the overlay worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub enum WorkerState {
    /// No worker thread.
    Stopped,
    /// Creating the GPU device, or (re)connecting to the runtime.
    Initializing,
    /// Connected and ticking.
    Running,
    /// Waiting out a failed connect or a runtime quit.
    ErrorBackoff,
    /// Releasing overlays, the runtime session and the GPU.
    ShuttingDown,
}

impl WorkerState {
    fn as_u8(self) -> u8 {
        match self {
            WorkerState::Stopped => 0,
            WorkerState::Initializing => 1,
            WorkerState::Running => 2,
            WorkerState::ErrorBackoff => 3,
            WorkerState::ShuttingDown => 4,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => WorkerState::Initializing,
            2 => WorkerState::Running,
            3 => WorkerState::ErrorBackoff,
            4 => WorkerState::ShuttingDown,
            _ => WorkerState::Stopped,
        }
    }
}

/// Current worker state plus change notifications.
pub struct WorkerStatus {
    state: AtomicU8,
    subscribers: Mutex<Vec<Sender<WorkerState>>>,
}

impl WorkerStatus {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(WorkerState::Stopped.as_u8()),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn get(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Record a transition. Subscribers only hear about actual changes.
    pub fn set(&self, next: WorkerState) {
        let previous = WorkerState::from_u8(self.state.swap(next.as_u8(), Ordering::SeqCst));
        if previous == next {
            return;
        }

        log::info!("[OVERLAY_WORKER] State {:?} -> {:?}", previous, next);

        self.subscribers
            .lock()
            .retain(|tx| tx.send(next).is_ok());
    }

    /// Receive every future transition.
    pub fn subscribe(&self) -> Receiver<WorkerState> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }
}

impl Default for WorkerStatus {
    fn default() -> Self {
        Self::new()
    }
}
