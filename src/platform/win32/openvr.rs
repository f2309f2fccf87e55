//! OpenVR runtime session over the C function tables of `openvr_sys`.

use std::ffi::{c_char, CString};
use std::mem;

use openvr_sys as sys;

use crate::error::{OverlayError, OverlayResult};
use crate::platform::{
    ControllerState, InputMethod, OverlayCompositor, OverlayHandle, TextureHandle,
    TrackedDevices, Transform34, VrEvent, VrSession,
};
use crate::telemetry::{ControllerRole, DeviceClass};

/// Resolve a function table entry or bail out with `$missing`.
macro_rules! entry {
    ($table:expr, $name:ident, $missing:expr) => {
        match $table.$name {
            Some(f) => f,
            None => return $missing,
        }
    };
}

fn missing(name: &'static str) -> OverlayError {
    OverlayError::Other(format!("OpenVR function table has no {}", name))
}

/// Shuts the runtime connection down when dropped.
struct RuntimeGuard;

impl Drop for RuntimeGuard {
    fn drop(&mut self) {
        unsafe { sys::VR_ShutdownInternal() };
        log::info!("[OPENVR] Runtime connection closed");
    }
}

/// A live overlay-application connection to the OpenVR runtime.
///
/// The function tables stay valid until the runtime is shut down, which
/// happens when `_runtime` drops after them.
pub struct OpenVrSession {
    system: *const sys::VR_IVRSystem_FnTable,
    overlay: *const sys::VR_IVROverlay_FnTable,
    _runtime: RuntimeGuard,
}

impl OpenVrSession {
    /// Initialize the runtime as an overlay application.
    pub fn connect() -> OverlayResult<Self> {
        let mut error = sys::EVRInitError_VRInitError_None;
        unsafe { sys::VR_InitInternal(&mut error, sys::EVRApplicationType_VRApplication_Overlay) };
        if error != sys::EVRInitError_VRInitError_None {
            return Err(OverlayError::RuntimeInit { code: error as i32 });
        }

        let runtime = RuntimeGuard;

        let system =
            generic_interface(sys::IVRSystem_Version)? as *const sys::VR_IVRSystem_FnTable;
        let overlay =
            generic_interface(sys::IVROverlay_Version)? as *const sys::VR_IVROverlay_FnTable;

        log::info!("[OPENVR] Connected as overlay application");

        Ok(Self {
            system,
            overlay,
            _runtime: runtime,
        })
    }

    fn system(&self) -> &sys::VR_IVRSystem_FnTable {
        // SAFETY: non-null and valid while the runtime guard is alive.
        unsafe { &*self.system }
    }

    fn overlay(&self) -> &sys::VR_IVROverlay_FnTable {
        // SAFETY: non-null and valid while the runtime guard is alive.
        unsafe { &*self.overlay }
    }

    fn check(op: &'static str, error: sys::EVROverlayError) -> OverlayResult<()> {
        if error == sys::EVROverlayError_VROverlayError_None {
            Ok(())
        } else {
            Err(OverlayError::compositor(op, error as i64))
        }
    }
}

/// Fetch a `FnTable:` interface for a versioned interface name.
fn generic_interface(version: &[u8]) -> OverlayResult<*const std::ffi::c_void> {
    let name = version.strip_suffix(b"\0").unwrap_or(version);
    let mut table_name = b"FnTable:".to_vec();
    table_name.extend_from_slice(name);
    let table_name = CString::new(table_name)
        .map_err(|_| OverlayError::Other("Invalid OpenVR interface name".into()))?;

    let mut error = sys::EVRInitError_VRInitError_None;
    let table = unsafe { sys::VR_GetGenericInterface(table_name.as_ptr(), &mut error) };

    if error != sys::EVRInitError_VRInitError_None || table == 0 {
        return Err(OverlayError::RuntimeInit { code: error as i32 });
    }

    Ok(table as *const std::ffi::c_void)
}

fn overlay_key(value: &str) -> OverlayResult<CString> {
    CString::new(value).map_err(|_| OverlayError::Other(format!("Invalid overlay key {:?}", value)))
}

impl TrackedDevices for OpenVrSession {
    fn device_class(&self, index: u32) -> DeviceClass {
        let f = entry!(self.system(), GetTrackedDeviceClass, DeviceClass::Invalid);
        DeviceClass::from_raw(unsafe { f(index) } as u32)
    }

    fn is_device_connected(&self, index: u32) -> bool {
        let f = entry!(self.system(), IsTrackedDeviceConnected, false);
        unsafe { f(index) }
    }

    fn is_charging(&self, index: u32) -> OverlayResult<bool> {
        let f = entry!(
            self.system(),
            GetBoolTrackedDeviceProperty,
            Err(missing("GetBoolTrackedDeviceProperty"))
        );
        let mut error = sys::ETrackedPropertyError_TrackedProp_Success;
        let value = unsafe {
            f(
                index,
                sys::ETrackedDeviceProperty_Prop_DeviceIsCharging_Bool,
                &mut error,
            )
        };
        if error != sys::ETrackedPropertyError_TrackedProp_Success {
            return Err(OverlayError::compositor("Prop_DeviceIsCharging_Bool", error as i64));
        }
        Ok(value)
    }

    fn battery_percentage(&self, index: u32) -> OverlayResult<f32> {
        let f = entry!(
            self.system(),
            GetFloatTrackedDeviceProperty,
            Err(missing("GetFloatTrackedDeviceProperty"))
        );
        let mut error = sys::ETrackedPropertyError_TrackedProp_Success;
        let value = unsafe {
            f(
                index,
                sys::ETrackedDeviceProperty_Prop_DeviceBatteryPercentage_Float,
                &mut error,
            )
        };
        if error != sys::ETrackedPropertyError_TrackedProp_Success {
            return Err(OverlayError::compositor(
                "Prop_DeviceBatteryPercentage_Float",
                error as i64,
            ));
        }
        Ok(value)
    }

    fn controller_role(&self, index: u32) -> ControllerRole {
        let f = entry!(
            self.system(),
            GetControllerRoleForTrackedDeviceIndex,
            ControllerRole::Invalid
        );
        ControllerRole::from_raw(unsafe { f(index) } as u32)
    }

    fn controller_state(&self, index: u32) -> Option<ControllerState> {
        let f = entry!(self.system(), GetControllerState, None);
        // SAFETY: plain C struct, all-zero is a valid value.
        let mut state: sys::VRControllerState_t = unsafe { mem::zeroed() };
        let ok = unsafe {
            f(
                index,
                &mut state,
                mem::size_of::<sys::VRControllerState_t>() as u32,
            )
        };
        ok.then_some(ControllerState {
            pressed: state.ulButtonPressed,
            touched: state.ulButtonTouched,
        })
    }

    fn device_index_for_role(&self, role: ControllerRole) -> Option<u32> {
        let f = entry!(self.system(), GetTrackedDeviceIndexForControllerRole, None);
        let index = unsafe { f(role.as_raw() as _) };
        (index != sys::k_unTrackedDeviceIndexInvalid).then_some(index)
    }
}

impl OverlayCompositor for OpenVrSession {
    fn find_overlay(&mut self, key: &str) -> OverlayResult<Option<OverlayHandle>> {
        let f = entry!(self.overlay(), FindOverlay, Err(missing("FindOverlay")));
        let key = overlay_key(key)?;
        let mut handle: sys::VROverlayHandle_t = sys::k_ulOverlayHandleInvalid;

        let error = unsafe { f(key.as_ptr() as *mut c_char, &mut handle) };
        if error == sys::EVROverlayError_VROverlayError_UnknownOverlay {
            return Ok(None);
        }
        Self::check("FindOverlay", error)?;
        Ok(Some(OverlayHandle(handle)))
    }

    fn create_overlay(&mut self, key: &str, name: &str) -> OverlayResult<OverlayHandle> {
        let f = entry!(self.overlay(), CreateOverlay, Err(missing("CreateOverlay")));
        let key = overlay_key(key)?;
        let name = overlay_key(name)?;
        let mut handle: sys::VROverlayHandle_t = sys::k_ulOverlayHandleInvalid;

        let error = unsafe {
            f(
                key.as_ptr() as *mut c_char,
                name.as_ptr() as *mut c_char,
                &mut handle,
            )
        };
        Self::check("CreateOverlay", error)?;
        Ok(OverlayHandle(handle))
    }

    fn destroy_overlay(&mut self, handle: OverlayHandle) -> OverlayResult<()> {
        let f = entry!(self.overlay(), DestroyOverlay, Err(missing("DestroyOverlay")));
        Self::check("DestroyOverlay", unsafe { f(handle.0) })
    }

    fn set_alpha(&mut self, handle: OverlayHandle, alpha: f32) -> OverlayResult<()> {
        let f = entry!(self.overlay(), SetOverlayAlpha, Err(missing("SetOverlayAlpha")));
        Self::check("SetOverlayAlpha", unsafe { f(handle.0, alpha) })
    }

    fn set_width_meters(&mut self, handle: OverlayHandle, meters: f32) -> OverlayResult<()> {
        let f = entry!(
            self.overlay(),
            SetOverlayWidthInMeters,
            Err(missing("SetOverlayWidthInMeters"))
        );
        Self::check("SetOverlayWidthInMeters", unsafe { f(handle.0, meters) })
    }

    fn set_input_method(
        &mut self,
        handle: OverlayHandle,
        method: InputMethod,
    ) -> OverlayResult<()> {
        let f = entry!(
            self.overlay(),
            SetOverlayInputMethod,
            Err(missing("SetOverlayInputMethod"))
        );
        let method = match method {
            InputMethod::None => sys::VROverlayInputMethod_None,
            InputMethod::Mouse => sys::VROverlayInputMethod_Mouse,
        };
        Self::check("SetOverlayInputMethod", unsafe { f(handle.0, method) })
    }

    fn set_transform_device_relative(
        &mut self,
        handle: OverlayHandle,
        device_index: u32,
        transform: &Transform34,
    ) -> OverlayResult<()> {
        let f = entry!(
            self.overlay(),
            SetOverlayTransformTrackedDeviceRelative,
            Err(missing("SetOverlayTransformTrackedDeviceRelative"))
        );
        let mut matrix = sys::HmdMatrix34_t { m: transform.m };
        Self::check("SetOverlayTransformTrackedDeviceRelative", unsafe {
            f(handle.0, device_index, &mut matrix)
        })
    }

    fn set_texture(&mut self, handle: OverlayHandle, texture: TextureHandle) -> OverlayResult<()> {
        let f = entry!(self.overlay(), SetOverlayTexture, Err(missing("SetOverlayTexture")));
        let mut texture = sys::Texture_t {
            handle: texture.0,
            eType: sys::ETextureType_TextureType_DirectX,
            eColorSpace: sys::EColorSpace_ColorSpace_Auto,
        };
        Self::check("SetOverlayTexture", unsafe { f(handle.0, &mut texture) })
    }

    fn show_overlay(&mut self, handle: OverlayHandle) -> OverlayResult<()> {
        let f = entry!(self.overlay(), ShowOverlay, Err(missing("ShowOverlay")));
        Self::check("ShowOverlay", unsafe { f(handle.0) })
    }
}

impl VrSession for OpenVrSession {
    fn poll_event(&mut self) -> Option<VrEvent> {
        let f = entry!(self.system(), PollNextEvent, None);
        // SAFETY: plain C struct, all-zero is a valid value.
        let mut event: sys::VREvent_t = unsafe { mem::zeroed() };
        let has_event = unsafe { f(&mut event, mem::size_of::<sys::VREvent_t>() as u32) };
        has_event.then(|| VrEvent::from_raw(event.eventType as u32))
    }
}
