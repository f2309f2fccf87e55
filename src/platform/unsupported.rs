//! Platform stand-in for targets without Direct3D 11 / OpenVR.
//!
//! GPU creation always fails, so the service reports a failed start and the
//! worker never reaches the compositor.

use super::{
    ControllerState, GpuDevice, InputMethod, OverlayCompositor, OverlayHandle, Platform,
    TextureHandle, TrackedDevices, Transform34, VrEvent, VrSession,
};
use crate::error::{OverlayError, OverlayResult};
use crate::telemetry::{ControllerRole, DeviceClass};
use crate::types::SurfaceId;

#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedPlatform;

/// Uninhabited: no GPU or session can ever be created here.
pub enum Never {}

impl Platform for UnsupportedPlatform {
    type Gpu = Never;
    type Session = Never;

    fn create_gpu(&self) -> OverlayResult<Never> {
        Err(OverlayError::Unsupported("Direct3D 11"))
    }

    fn connect(&self) -> OverlayResult<Never> {
        Err(OverlayError::Unsupported("OpenVR"))
    }
}

impl GpuDevice for Never {
    fn upload(&mut self, _surface: SurfaceId, _pixels: &[u8]) -> OverlayResult<()> {
        match *self {}
    }

    fn flush(&mut self) {
        match *self {}
    }

    fn texture(&self, _surface: SurfaceId) -> TextureHandle {
        match *self {}
    }
}

impl TrackedDevices for Never {
    fn device_class(&self, _index: u32) -> DeviceClass {
        match *self {}
    }

    fn is_device_connected(&self, _index: u32) -> bool {
        match *self {}
    }

    fn is_charging(&self, _index: u32) -> OverlayResult<bool> {
        match *self {}
    }

    fn battery_percentage(&self, _index: u32) -> OverlayResult<f32> {
        match *self {}
    }

    fn controller_role(&self, _index: u32) -> ControllerRole {
        match *self {}
    }

    fn controller_state(&self, _index: u32) -> Option<ControllerState> {
        match *self {}
    }

    fn device_index_for_role(&self, _role: ControllerRole) -> Option<u32> {
        match *self {}
    }
}

impl OverlayCompositor for Never {
    fn find_overlay(&mut self, _key: &str) -> OverlayResult<Option<OverlayHandle>> {
        match *self {}
    }

    fn create_overlay(&mut self, _key: &str, _name: &str) -> OverlayResult<OverlayHandle> {
        match *self {}
    }

    fn destroy_overlay(&mut self, _handle: OverlayHandle) -> OverlayResult<()> {
        match *self {}
    }

    fn set_alpha(&mut self, _handle: OverlayHandle, _alpha: f32) -> OverlayResult<()> {
        match *self {}
    }

    fn set_width_meters(&mut self, _handle: OverlayHandle, _meters: f32) -> OverlayResult<()> {
        match *self {}
    }

    fn set_input_method(
        &mut self,
        _handle: OverlayHandle,
        _method: InputMethod,
    ) -> OverlayResult<()> {
        match *self {}
    }

    fn set_transform_device_relative(
        &mut self,
        _handle: OverlayHandle,
        _device_index: u32,
        _transform: &Transform34,
    ) -> OverlayResult<()> {
        match *self {}
    }

    fn set_texture(&mut self, _handle: OverlayHandle, _texture: TextureHandle) -> OverlayResult<()> {
        match *self {}
    }

    fn show_overlay(&mut self, _handle: OverlayHandle) -> OverlayResult<()> {
        match *self {}
    }
}

impl VrSession for Never {
    fn poll_event(&mut self) -> Option<VrEvent> {
        match *self {}
    }
}
