//! Cooperative stop signal for the worker thread.
//!
//! Waiting on the signal doubles as the worker's sleep, so every tick and
//! every backoff wakes up as soon as a stop is requested.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};

/// Service side: requests the stop.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Sender<()>,
    requested: Arc<AtomicBool>,
}

/// Worker side: observes the stop.
#[derive(Debug)]
pub struct StopSignal {
    rx: Receiver<()>,
    stopped: bool,
}

pub fn stop_channel() -> (StopHandle, StopSignal) {
    let (tx, rx) = bounded(1);
    let handle = StopHandle {
        tx,
        requested: Arc::new(AtomicBool::new(false)),
    };
    let signal = StopSignal { rx, stopped: false };
    (handle, signal)
}

impl StopHandle {
    /// Ask the worker to stop. Never blocks; repeated calls are harmless.
    pub fn request_stop(&self) {
        self.requested.store(true, Ordering::SeqCst);
        // Full means a stop is already queued.
        let _ = self.tx.try_send(());
    }

    pub fn is_stop_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

impl StopSignal {
    /// Non-blocking check. Once true, stays true.
    pub fn should_stop(&mut self) -> bool {
        if !self.stopped {
            match self.rx.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => self.stopped = true,
                Err(TryRecvError::Empty) => {}
            }
        }
        self.stopped
    }

    /// Sleep for `duration` unless a stop arrives first.
    ///
    /// Returns true when the worker should stop. A dropped handle counts as
    /// a stop request.
    pub fn wait(&mut self, duration: Duration) -> bool {
        if self.stopped {
            return true;
        }
        match self.rx.recv_timeout(duration) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => self.stopped = true,
            Err(RecvTimeoutError::Timeout) => {}
        }
        self.stopped
    }
}
