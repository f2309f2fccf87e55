//! Per-surface overlay lifecycle against the compositor.
//!
//! A surface owns at most one compositor handle. The handle is only kept
//! once every configuration step succeeded; any failure destroys it and the
//! next render tick starts over from `ensure`.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::config::SurfaceConfig;
use crate::error::{OverlayError, OverlayResult};
use crate::frame::FrameReader;
use crate::platform::{
    GpuDevice, InputMethod, OverlayHandle, TrackedDevices, Transform34, VrSession,
};
use crate::telemetry::ControllerRole;
use crate::types::SurfaceId;

/// Tracked-device slot the runtime reserves for the headset.
pub const HMD_DEVICE_INDEX: u32 = 0;

/// Tracked device an overlay is positioned relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub enum OverlayAnchor {
    Hmd,
    LeftController,
    RightController,
}

impl OverlayAnchor {
    /// Current device slot of the anchor.
    pub fn resolve<T: TrackedDevices + ?Sized>(self, devices: &T) -> OverlayResult<u32> {
        let role = match self {
            OverlayAnchor::Hmd => return Ok(HMD_DEVICE_INDEX),
            OverlayAnchor::LeftController => ControllerRole::LeftHand,
            OverlayAnchor::RightController => ControllerRole::RightHand,
        };
        devices
            .device_index_for_role(role)
            .ok_or(OverlayError::AnchorUnavailable(self))
    }
}

/// One overlay surface and its compositor handle.
pub struct OverlaySurface {
    id: SurfaceId,
    config: SurfaceConfig,
    handle: Option<OverlayHandle>,
}

impl OverlaySurface {
    pub fn new(id: SurfaceId, config: SurfaceConfig) -> Self {
        Self {
            id,
            config,
            handle: None,
        }
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    pub fn handle(&self) -> Option<OverlayHandle> {
        self.handle
    }

    /// One render tick for this surface.
    ///
    /// Without a handle this runs `ensure`. With one, the texture is only
    /// pushed when a new frame is waiting; a failed push drops the handle.
    pub fn render<S, G>(
        &mut self,
        session: &mut S,
        gpu: &mut G,
        frame: &mut FrameReader,
    ) -> OverlayResult<()>
    where
        S: VrSession + ?Sized,
        G: GpuDevice + ?Sized,
    {
        if !self.config.enabled {
            return Ok(());
        }

        let Some(handle) = self.handle else {
            return self.ensure(session, gpu, frame);
        };

        if !frame.is_dirty() {
            return Ok(());
        }

        if let Err(e) = self.push_texture(session, gpu, frame, handle) {
            log::warn!("[OVERLAY] {} texture update failed: {}", self.id, e);
            self.teardown(session);
            return Err(e);
        }

        Ok(())
    }

    /// Find or create the overlay and configure it completely.
    ///
    /// No-op when a handle is already held. On failure the partially set up
    /// overlay is destroyed.
    pub fn ensure<S, G>(
        &mut self,
        session: &mut S,
        gpu: &mut G,
        frame: &mut FrameReader,
    ) -> OverlayResult<()>
    where
        S: VrSession + ?Sized,
        G: GpuDevice + ?Sized,
    {
        if self.handle.is_some() {
            return Ok(());
        }

        // Resolve first so a missing controller does not churn overlays.
        let device_index = self.config.anchor.resolve(&*session)?;

        let handle = match session.find_overlay(&self.config.key)? {
            Some(handle) => handle,
            None => session.create_overlay(&self.config.key, &self.config.name)?,
        };

        match self.configure(session, gpu, frame, handle, device_index) {
            Ok(()) => {
                log::info!(
                    "[OVERLAY] {} overlay {:?} ready (handle {})",
                    self.id,
                    self.config.key,
                    handle.0
                );
                self.handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                log::debug!("[OVERLAY] {} setup failed: {}", self.id, e);
                destroy(session, self.id, handle);
                Err(e)
            }
        }
    }

    /// Destroy the overlay handle, if any.
    pub fn teardown<S: VrSession + ?Sized>(&mut self, session: &mut S) {
        if let Some(handle) = self.handle.take() {
            destroy(session, self.id, handle);
        }
    }

    /// Forget the handle without calling the compositor, for when the
    /// session it belonged to is already gone.
    pub fn forget(&mut self) {
        self.handle = None;
    }

    fn configure<S, G>(
        &self,
        session: &mut S,
        gpu: &mut G,
        frame: &mut FrameReader,
        handle: OverlayHandle,
        device_index: u32,
    ) -> OverlayResult<()>
    where
        S: VrSession + ?Sized,
        G: GpuDevice + ?Sized,
    {
        if let Err(e) = session.set_alpha(handle, self.config.alpha) {
            log::warn!("[OVERLAY] {} alpha not applied: {}", self.id, e);
        }

        session.set_width_meters(handle, self.config.width_meters)?;
        session.set_input_method(handle, InputMethod::None)?;

        let transform = Transform34::translation(self.config.offset);
        session.set_transform_device_relative(handle, device_index, &transform)?;

        self.push_texture(session, gpu, frame, handle)?;
        session.show_overlay(handle)
    }

    /// Upload the waiting frame (if any) and hand the texture to the
    /// compositor. Taking the frame clears its dirty state even when the
    /// upload fails.
    fn push_texture<S, G>(
        &self,
        session: &mut S,
        gpu: &mut G,
        frame: &mut FrameReader,
        handle: OverlayHandle,
    ) -> OverlayResult<()>
    where
        S: VrSession + ?Sized,
        G: GpuDevice + ?Sized,
    {
        let uploaded = match frame.take() {
            Some(pixels) => {
                gpu.upload(self.id, pixels)?;
                true
            }
            None => false,
        };

        let result = session.set_texture(handle, gpu.texture(self.id));

        if uploaded {
            gpu.flush();
        }

        result
    }
}

fn destroy<S: VrSession + ?Sized>(session: &mut S, id: SurfaceId, handle: OverlayHandle) {
    match session.destroy_overlay(handle) {
        Ok(()) => log::debug!("[OVERLAY] {} overlay destroyed", id),
        Err(e) => log::debug!("[OVERLAY] {} destroy failed: {}", id, e),
    }
}

#[cfg(test)]
mod tests;
