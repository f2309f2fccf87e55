//! Seams between the worker and the native graphics/VR APIs.
//!
//! The worker is generic over [`Platform`], so the same loop drives the
//! Direct3D 11 + OpenVR backend on Windows and a scripted mock in tests.
//! Everything a platform hands out lives and dies on the worker thread.

use std::ffi::c_void;

use crate::error::OverlayResult;
use crate::telemetry::{ControllerRole, DeviceClass};
use crate::types::SurfaceId;

#[cfg(target_os = "windows")]
mod win32;
#[cfg(target_os = "windows")]
pub use win32::{D3d11Device, OpenVrSession, WindowsPlatform};

#[cfg(not(target_os = "windows"))]
mod unsupported;
#[cfg(not(target_os = "windows"))]
pub use unsupported::{Never, UnsupportedPlatform};

/// Backend used by default on this target.
#[cfg(target_os = "windows")]
pub type NativePlatform = WindowsPlatform;
/// Backend used by default on this target.
#[cfg(not(target_os = "windows"))]
pub type NativePlatform = UnsupportedPlatform;

/// Raw native texture pointer handed to the compositor (`ID3D11Texture2D*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureHandle(pub *mut c_void);

/// Compositor overlay handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverlayHandle(pub u64);

/// How an overlay reacts to laser-pointer input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMethod {
    None,
    Mouse,
}

/// Row-major 3x4 rigid transform, same layout as the runtime's `HmdMatrix34_t`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform34 {
    pub m: [[f32; 4]; 3],
}

impl Transform34 {
    pub fn identity() -> Self {
        Self::translation([0.0, 0.0, 0.0])
    }

    /// Pure translation by `offset` meters.
    pub fn translation(offset: [f32; 3]) -> Self {
        Self {
            m: [
                [1.0, 0.0, 0.0, offset[0]],
                [0.0, 1.0, 0.0, offset[1]],
                [0.0, 0.0, 1.0, offset[2]],
            ],
        }
    }

    pub fn offset(&self) -> [f32; 3] {
        [self.m[0][3], self.m[1][3], self.m[2][3]]
    }
}

/// Pressed/touched bit masks of a controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerState {
    pub pressed: u64,
    pub touched: u64,
}

/// GPU device owning one texture per surface.
pub trait GpuDevice {
    /// Upload a full surface-sized BGRA frame to the surface's texture.
    fn upload(&mut self, surface: SurfaceId, pixels: &[u8]) -> OverlayResult<()>;

    /// Submit queued GPU work.
    fn flush(&mut self);

    /// Native texture for the surface.
    fn texture(&self, surface: SurfaceId) -> TextureHandle;
}

/// Read-only queries against the runtime's tracked-device slots.
pub trait TrackedDevices {
    fn device_class(&self, index: u32) -> DeviceClass;
    fn is_device_connected(&self, index: u32) -> bool;
    fn is_charging(&self, index: u32) -> OverlayResult<bool>;
    /// Battery level in the 0.0 - 1.0 range.
    fn battery_percentage(&self, index: u32) -> OverlayResult<f32>;
    fn controller_role(&self, index: u32) -> ControllerRole;
    /// `None` when the runtime could not report the controller state.
    fn controller_state(&self, index: u32) -> Option<ControllerState>;
    /// Slot currently holding the controller with `role`, if any.
    fn device_index_for_role(&self, role: ControllerRole) -> Option<u32>;
}

/// Overlay calls of the VR compositor.
pub trait OverlayCompositor {
    /// `Ok(None)` when no overlay with this key exists yet.
    fn find_overlay(&mut self, key: &str) -> OverlayResult<Option<OverlayHandle>>;
    fn create_overlay(&mut self, key: &str, name: &str) -> OverlayResult<OverlayHandle>;
    fn destroy_overlay(&mut self, handle: OverlayHandle) -> OverlayResult<()>;
    fn set_alpha(&mut self, handle: OverlayHandle, alpha: f32) -> OverlayResult<()>;
    fn set_width_meters(&mut self, handle: OverlayHandle, meters: f32) -> OverlayResult<()>;
    fn set_input_method(&mut self, handle: OverlayHandle, method: InputMethod)
        -> OverlayResult<()>;
    fn set_transform_device_relative(
        &mut self,
        handle: OverlayHandle,
        device_index: u32,
        transform: &Transform34,
    ) -> OverlayResult<()>;
    fn set_texture(&mut self, handle: OverlayHandle, texture: TextureHandle) -> OverlayResult<()>;
    fn show_overlay(&mut self, handle: OverlayHandle) -> OverlayResult<()>;
}

/// Runtime event as far as the worker cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VrEvent {
    /// The runtime is shutting down and wants overlay apps to exit.
    Quit,
    Other(u32),
}

impl VrEvent {
    pub const QUIT_CODE: u32 = 700;

    pub fn from_raw(code: u32) -> Self {
        if code == Self::QUIT_CODE {
            VrEvent::Quit
        } else {
            VrEvent::Other(code)
        }
    }

    pub fn code(self) -> u32 {
        match self {
            VrEvent::Quit => Self::QUIT_CODE,
            VrEvent::Other(code) => code,
        }
    }
}

/// A live connection to the VR runtime. Dropping it disconnects.
pub trait VrSession: TrackedDevices + OverlayCompositor {
    fn poll_event(&mut self) -> Option<VrEvent>;
}

/// Factory for the worker's native resources.
///
/// Shared with the worker thread; the objects it creates are not.
pub trait Platform: Send + Sync + 'static {
    type Gpu: GpuDevice;
    type Session: VrSession;

    /// Create the GPU device and both surface textures.
    fn create_gpu(&self) -> OverlayResult<Self::Gpu>;

    /// Connect to the VR runtime as an overlay application.
    fn connect(&self) -> OverlayResult<Self::Session>;
}
