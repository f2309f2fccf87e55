//! The overlay worker thread.
//!
//! One worker owns the GPU device, the runtime session and both overlay
//! surfaces for its whole life. Each tick it makes sure the runtime is
//! connected, drains runtime events, samples tracked devices and, every few
//! ticks, renders the surfaces. Everything except GPU creation is retried.

mod status;
mod stop;

pub use status::{WorkerState, WorkerStatus};
pub use stop::{stop_channel, StopHandle, StopSignal};

use std::sync::Arc;

use crossbeam_channel::Sender;

use crate::config::OverlayConfig;
use crate::error::OverlayResult;
use crate::frame::FrameReaders;
use crate::overlay::OverlaySurface;
use crate::platform::{Platform, VrEvent, VrSession};
use crate::telemetry::{self, SnapshotPublisher};
use crate::types::SurfaceId;

/// Decides which ticks render: the first one, then every `interval`th.
#[derive(Debug, Clone)]
pub struct RenderPacer {
    interval: u32,
    countdown: u32,
}

impl RenderPacer {
    pub fn new(interval: u32) -> Self {
        Self {
            interval: interval.max(1),
            countdown: 0,
        }
    }

    /// Advance one tick; true when this tick should render.
    pub fn tick(&mut self) -> bool {
        if self.countdown == 0 {
            self.countdown = self.interval - 1;
            true
        } else {
            self.countdown -= 1;
            false
        }
    }
}

/// Everything a worker thread needs, moved onto it at spawn.
pub struct WorkerContext<P: Platform> {
    pub platform: Arc<P>,
    pub config: OverlayConfig,
    pub readers: FrameReaders,
    pub telemetry: Arc<SnapshotPublisher>,
    pub status: Arc<WorkerStatus>,
    pub stop: StopSignal,
    /// Receives the GPU initialization result exactly once.
    pub ready: Sender<OverlayResult<()>>,
}

/// Worker thread body. Returns the frame readers so the next worker can
/// take them over.
pub fn run<P: Platform>(ctx: WorkerContext<P>) -> FrameReaders {
    let WorkerContext {
        platform,
        config,
        readers,
        telemetry,
        status,
        stop,
        ready,
    } = ctx;

    status.set(WorkerState::Initializing);

    let gpu = match platform.create_gpu() {
        Ok(gpu) => gpu,
        Err(e) => {
            log::error!("[OVERLAY_WORKER] GPU initialization failed: {}", e);
            let _ = ready.send(Err(e));
            status.set(WorkerState::Stopped);
            return readers;
        }
    };
    let _ = ready.send(Ok(()));

    log::info!("[OVERLAY_WORKER] Started");

    let surfaces = SurfaceId::ALL.map(|id| OverlaySurface::new(id, config.surface(id).clone()));

    let worker = Worker {
        pacer: RenderPacer::new(config.render_interval_ticks),
        platform,
        config,
        gpu,
        session: None,
        surfaces,
        last_errors: [None, None],
        readers,
        telemetry,
        status,
        stop,
    };

    worker.run()
}

struct Worker<P: Platform> {
    platform: Arc<P>,
    config: OverlayConfig,
    gpu: P::Gpu,
    session: Option<P::Session>,
    surfaces: [OverlaySurface; 2],
    /// Last render error per surface, to log repeats only once.
    last_errors: [Option<String>; 2],
    readers: FrameReaders,
    telemetry: Arc<SnapshotPublisher>,
    status: Arc<WorkerStatus>,
    stop: StopSignal,
    pacer: RenderPacer,
}

impl<P: Platform> Worker<P> {
    fn run(mut self) -> FrameReaders {
        while !self.stop.should_stop() {
            if self.session.is_none() && !self.connect() {
                self.stop.wait(self.config.connect_retry());
                continue;
            }

            if self.poll_events() {
                log::info!(
                    "[OVERLAY_WORKER] Runtime quit, reconnecting in {:?}",
                    self.config.quit_backoff()
                );
                self.status.set(WorkerState::ErrorBackoff);
                self.disconnect();
                self.stop.wait(self.config.quit_backoff());
                continue;
            }

            self.sample();

            if self.pacer.tick() {
                self.render();
            }

            self.stop.wait(self.config.tick_interval());
        }

        self.shutdown()
    }

    fn connect(&mut self) -> bool {
        self.status.set(WorkerState::Initializing);

        match self.platform.connect() {
            Ok(session) => {
                self.session = Some(session);
                self.status.set(WorkerState::Running);
                true
            }
            Err(e) => {
                log::warn!(
                    "[OVERLAY_WORKER] Runtime connection failed, retrying in {:?}: {}",
                    self.config.connect_retry(),
                    e
                );
                self.status.set(WorkerState::ErrorBackoff);
                false
            }
        }
    }

    /// Drain pending runtime events. True when the runtime asked us to quit.
    fn poll_events(&mut self) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };

        while let Some(event) = session.poll_event() {
            log::debug!("[OVERLAY_WORKER] Runtime event {}", event.code());
            if event == VrEvent::Quit {
                return true;
            }
        }
        false
    }

    fn sample(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };

        let max_devices = self.config.max_tracked_devices;
        let published = self
            .telemetry
            .try_publish_with(|snapshot| telemetry::sample(session, max_devices, snapshot));

        if !published {
            log::trace!("[OVERLAY_WORKER] Telemetry busy, sample skipped");
        }
    }

    fn render(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        for surface in &mut self.surfaces {
            let id = surface.id();
            let frame = self.readers.get_mut(id);
            let last_error = &mut self.last_errors[id.index()];

            match surface.render(session, &mut self.gpu, frame) {
                Ok(()) => {
                    if last_error.take().is_some() {
                        log::info!("[OVERLAY_WORKER] {} overlay recovered", id);
                    }
                }
                Err(e) => {
                    let message = e.to_string();
                    if last_error.as_deref() != Some(message.as_str()) {
                        log::warn!("[OVERLAY_WORKER] {} overlay: {}", id, message);
                        *last_error = Some(message);
                    }
                }
            }
        }
    }

    /// Destroy overlays, close the runtime session and forget telemetry.
    fn disconnect(&mut self) {
        match self.session.take() {
            Some(mut session) => {
                for surface in &mut self.surfaces {
                    surface.teardown(&mut session);
                }
                drop(session);
            }
            None => {
                for surface in &mut self.surfaces {
                    surface.forget();
                }
            }
        }

        self.last_errors = [None, None];
        self.telemetry.clear();
    }

    fn shutdown(mut self) -> FrameReaders {
        log::info!("[OVERLAY_WORKER] Stopping");
        self.status.set(WorkerState::ShuttingDown);
        self.disconnect();

        let Worker {
            gpu,
            readers,
            status,
            ..
        } = self;
        drop(gpu);

        status.set(WorkerState::Stopped);
        log::info!("[OVERLAY_WORKER] Stopped");
        readers
    }
}
