//! Direct3D 11 device and overlay surface textures.

use windows::core::Interface;
use windows::Win32::Graphics::Direct3D::D3D_DRIVER_TYPE_HARDWARE;
use windows::Win32::Graphics::Direct3D11::{
    D3D11CreateDevice, ID3D11Device, ID3D11DeviceContext, ID3D11Resource, ID3D11Texture2D,
    D3D11_BIND_SHADER_RESOURCE, D3D11_CREATE_DEVICE_SINGLETHREADED, D3D11_SDK_VERSION,
    D3D11_TEXTURE2D_DESC, D3D11_USAGE_DEFAULT,
};
use windows::Win32::Graphics::Dxgi::Common::{DXGI_FORMAT_B8G8R8A8_UNORM, DXGI_SAMPLE_DESC};

use crate::error::{OverlayError, OverlayResult};
use crate::platform::{GpuDevice, TextureHandle};
use crate::types::{SurfaceId, SURFACE_BYTES, SURFACE_HEIGHT, SURFACE_ROW_PITCH, SURFACE_WIDTH};

/// GPU device with one BGRA texture per overlay surface.
///
/// Field order is drop order: textures, then context, then device.
pub struct D3d11Device {
    textures: [ID3D11Texture2D; 2],
    context: ID3D11DeviceContext,
    _device: ID3D11Device,
}

impl D3d11Device {
    /// Create a hardware device and both surface textures.
    ///
    /// The device is single-threaded; it must stay on the thread that made it.
    pub fn create() -> OverlayResult<Self> {
        let mut device: Option<ID3D11Device> = None;
        let mut context: Option<ID3D11DeviceContext> = None;

        unsafe {
            D3D11CreateDevice(
                None,
                D3D_DRIVER_TYPE_HARDWARE,
                None,
                D3D11_CREATE_DEVICE_SINGLETHREADED,
                None,
                D3D11_SDK_VERSION,
                Some(&mut device),
                None,
                Some(&mut context),
            )
        }
        .map_err(|e| gpu_error("D3D11CreateDevice", e))?;

        let device = device
            .ok_or_else(|| OverlayError::Gpu("D3D11CreateDevice returned no device".into()))?;
        let context = context
            .ok_or_else(|| OverlayError::Gpu("D3D11CreateDevice returned no context".into()))?;

        let hmd = create_surface_texture(&device)?;
        let wrist = create_surface_texture(&device)?;

        log::info!(
            "[D3D11] Device created with two {}x{} surface textures",
            SURFACE_WIDTH,
            SURFACE_HEIGHT
        );

        Ok(Self {
            textures: [hmd, wrist],
            context,
            _device: device,
        })
    }
}

impl GpuDevice for D3d11Device {
    fn upload(&mut self, surface: SurfaceId, pixels: &[u8]) -> OverlayResult<()> {
        if pixels.len() != SURFACE_BYTES {
            return Err(OverlayError::Gpu(format!(
                "UpdateSubresource: expected {} bytes, got {}",
                SURFACE_BYTES,
                pixels.len()
            )));
        }

        let resource: ID3D11Resource = self.textures[surface.index()]
            .cast()
            .map_err(|e| gpu_error("ID3D11Texture2D::cast", e))?;

        unsafe {
            self.context.UpdateSubresource(
                &resource,
                0,
                None,
                pixels.as_ptr().cast(),
                SURFACE_ROW_PITCH,
                0,
            );
        }

        Ok(())
    }

    fn flush(&mut self) {
        unsafe { self.context.Flush() };
    }

    fn texture(&self, surface: SurfaceId) -> TextureHandle {
        TextureHandle(self.textures[surface.index()].as_raw())
    }
}

impl Drop for D3d11Device {
    fn drop(&mut self) {
        log::debug!("[D3D11] Releasing surface textures and device");
    }
}

/// Create a 512x512 BGRA texture the compositor can sample from.
fn create_surface_texture(device: &ID3D11Device) -> OverlayResult<ID3D11Texture2D> {
    let desc = D3D11_TEXTURE2D_DESC {
        Width: SURFACE_WIDTH,
        Height: SURFACE_HEIGHT,
        MipLevels: 1,
        ArraySize: 1,
        Format: DXGI_FORMAT_B8G8R8A8_UNORM,
        SampleDesc: DXGI_SAMPLE_DESC {
            Count: 1,
            Quality: 0,
        },
        Usage: D3D11_USAGE_DEFAULT,
        BindFlags: D3D11_BIND_SHADER_RESOURCE.0 as u32,
        CPUAccessFlags: 0,
        MiscFlags: 0,
    };

    let mut texture: Option<ID3D11Texture2D> = None;
    unsafe { device.CreateTexture2D(&desc, None, Some(&mut texture)) }
        .map_err(|e| gpu_error("CreateTexture2D", e))?;

    texture.ok_or_else(|| OverlayError::Gpu("CreateTexture2D returned no texture".into()))
}

fn gpu_error(op: &str, e: windows::core::Error) -> OverlayError {
    OverlayError::Gpu(format!("{}: {:#010x}", op, e.code().0))
}
