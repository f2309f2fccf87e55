//! Overlay service: the object a host keeps for the lifetime of the process.
//!
//! Owns the frame store, the telemetry snapshot and the worker thread handle.
//! All methods take `&self` and are safe to call from any thread.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver};
use parking_lot::Mutex;

use crate::config::OverlayConfig;
use crate::error::OverlayError;
use crate::frame::{FrameReaders, FrameStore};
use crate::platform::{NativePlatform, Platform};
use crate::telemetry::{DeviceRecord, SnapshotPublisher};
use crate::types::{Region, SurfaceId};
use crate::worker::{self, stop_channel, StopHandle, WorkerContext, WorkerState, WorkerStatus};

/// How long `start` waits for a stopping predecessor before giving up.
const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

struct ActiveWorker {
    stop: StopHandle,
    thread: JoinHandle<FrameReaders>,
}

impl ActiveWorker {
    fn is_live(&self) -> bool {
        !self.stop.is_stop_requested() && !self.thread.is_finished()
    }
}

#[derive(Default)]
struct WorkerSlot {
    /// Frame readers waiting for the next worker.
    parked: Option<FrameReaders>,
    active: Option<ActiveWorker>,
}

/// Owns one overlay worker and the state it shares with callers.
pub struct OverlayService<P: Platform = NativePlatform> {
    platform: Arc<P>,
    config: OverlayConfig,
    frames: FrameStore,
    telemetry: Arc<SnapshotPublisher>,
    status: Arc<WorkerStatus>,
    worker: Mutex<WorkerSlot>,
    /// Stop handle of the newest worker. Kept outside `worker`, which
    /// `start` holds while it waits, so `stop` never blocks on it.
    stop_handle: Mutex<Option<StopHandle>>,
}

impl OverlayService<NativePlatform> {
    /// Service backed by this target's native platform.
    pub fn new(config: OverlayConfig) -> Self {
        Self::with_platform(NativePlatform::default(), config)
    }
}

impl<P: Platform> OverlayService<P> {
    pub fn with_platform(platform: P, mut config: OverlayConfig) -> Self {
        config.validate();

        let (frames, readers) = FrameStore::new();
        let telemetry = Arc::new(SnapshotPublisher::new(config.max_tracked_devices as usize));

        Self {
            platform: Arc::new(platform),
            config,
            frames,
            telemetry,
            status: Arc::new(WorkerStatus::new()),
            worker: Mutex::new(WorkerSlot {
                parked: Some(readers),
                active: None,
            }),
            stop_handle: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    /// Start the worker if none is running.
    ///
    /// Blocks until the worker has created its GPU device. Returns false only
    /// when that fails (or the thread cannot be spawned); a missing VR
    /// runtime is not a failure, the worker keeps retrying.
    pub fn start(&self) -> bool {
        let mut slot = self.worker.lock();

        if slot.active.as_ref().is_some_and(ActiveWorker::is_live) {
            log::debug!("[OVERLAY_SERVICE] Worker already running");
            return true;
        }

        if let Some(previous) = slot.active.take() {
            match join_worker(previous, JOIN_TIMEOUT) {
                Ok(readers) => slot.parked = readers,
                Err(previous) => {
                    log::error!(
                        "[OVERLAY_SERVICE] Previous worker did not stop within {:?}",
                        JOIN_TIMEOUT
                    );
                    slot.active = Some(previous);
                    return false;
                }
            }
        }

        let readers = match slot.parked.take() {
            Some(readers) => {
                self.frames.republish();
                readers
            }
            None => {
                log::warn!("[OVERLAY_SERVICE] Frame readers lost, reconnecting frame store");
                self.frames.reset()
            }
        };

        let (stop, signal) = stop_channel();
        *self.stop_handle.lock() = Some(stop.clone());
        let (ready_tx, ready_rx) = bounded(1);
        let ctx = WorkerContext {
            platform: Arc::clone(&self.platform),
            config: self.config.clone(),
            readers,
            telemetry: Arc::clone(&self.telemetry),
            status: Arc::clone(&self.status),
            stop: signal,
            ready: ready_tx,
        };

        let thread = match thread::Builder::new()
            .name("overlay-worker".to_string())
            .spawn(move || worker::run(ctx))
        {
            Ok(thread) => thread,
            Err(e) => {
                *self.stop_handle.lock() = None;
                let err = OverlayError::Worker(format!("Failed to spawn overlay worker: {}", e));
                log::error!("[OVERLAY_SERVICE] {}", err);
                return false;
            }
        };

        match ready_rx.recv() {
            Ok(Ok(())) => {
                log::info!("[OVERLAY_SERVICE] Worker started");
                slot.active = Some(ActiveWorker { stop, thread });
                true
            }
            Ok(Err(e)) => {
                log::error!("[OVERLAY_SERVICE] Worker failed to start: {}", e);
                slot.parked = thread.join().ok();
                *self.stop_handle.lock() = None;
                false
            }
            Err(_) => {
                log::error!("[OVERLAY_SERVICE] Worker exited before reporting readiness");
                slot.parked = thread.join().ok();
                *self.stop_handle.lock() = None;
                false
            }
        }
    }

    /// Ask the worker to stop. Returns immediately; the worker unwinds on
    /// its own and the next `start` (or `shutdown`) joins it.
    pub fn stop(&self) {
        if let Some(stop) = self.stop_handle.lock().as_ref() {
            if !stop.is_stop_requested() {
                log::info!("[OVERLAY_SERVICE] Stop requested");
            }
            stop.request_stop();
        }
    }

    /// Stop the worker and wait for it to finish.
    pub fn shutdown(&self) {
        let mut slot = self.worker.lock();
        let Some(active) = slot.active.take() else {
            return;
        };

        active.stop.request_stop();
        match active.thread.join() {
            Ok(readers) => slot.parked = Some(readers),
            Err(_) => {
                log::error!("[OVERLAY_SERVICE] Worker panicked");
                self.status.set(WorkerState::Stopped);
            }
        }
    }

    /// Copy `region` of a full-surface BGRA buffer into the surface.
    ///
    /// Invalid rectangles or buffer sizes are ignored and return false.
    pub fn write_frame(&self, surface: SurfaceId, region: Region, pixels: &[u8]) -> bool {
        self.frames.write_region(surface, region, pixels)
    }

    /// Latest tracked-device records. Empty while not connected.
    pub fn list_devices(&self) -> Vec<DeviceRecord> {
        self.telemetry.read_copy()
    }

    pub fn state(&self) -> WorkerState {
        self.status.get()
    }

    /// Channel receiving every future worker state change.
    pub fn subscribe_state(&self) -> Receiver<WorkerState> {
        self.status.subscribe()
    }

    /// True while a worker is alive and not unwinding.
    pub fn is_running(&self) -> bool {
        matches!(
            self.state(),
            WorkerState::Initializing | WorkerState::Running | WorkerState::ErrorBackoff
        )
    }
}

impl<P: Platform> Drop for OverlayService<P> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Stop and join a worker, waiting at most `timeout`.
///
/// `Ok(None)` means the worker panicked and its readers are gone. A worker
/// still running after the timeout is handed back.
fn join_worker(
    worker: ActiveWorker,
    timeout: Duration,
) -> Result<Option<FrameReaders>, ActiveWorker> {
    worker.stop.request_stop();

    let deadline = Instant::now() + timeout;
    while !worker.thread.is_finished() {
        if Instant::now() >= deadline {
            return Err(worker);
        }
        thread::sleep(Duration::from_millis(5));
    }

    match worker.thread.join() {
        Ok(readers) => Ok(Some(readers)),
        Err(_) => {
            log::error!("[OVERLAY_SERVICE] Previous worker panicked");
            Ok(None)
        }
    }
}
