//! Windows backend: Direct3D 11 textures presented through OpenVR overlays.

mod d3d11;
mod openvr;

pub use d3d11::D3d11Device;
pub use openvr::OpenVrSession;

use super::Platform;
use crate::error::OverlayResult;

#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsPlatform;

impl Platform for WindowsPlatform {
    type Gpu = D3d11Device;
    type Session = OpenVrSession;

    fn create_gpu(&self) -> OverlayResult<D3d11Device> {
        D3d11Device::create()
    }

    fn connect(&self) -> OverlayResult<OpenVrSession> {
        OpenVrSession::connect()
    }
}
