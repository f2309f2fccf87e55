//! Scripted platform for driving the worker without a GPU or VR runtime.
//!
//! All mock objects share one `MockState`, so a test can inject failures and
//! inspect every call while the worker thread is running.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::ffi::c_void;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, MutexGuard};

use crate::error::{OverlayError, OverlayResult};
use crate::platform::{
    ControllerState, GpuDevice, InputMethod, OverlayCompositor, OverlayHandle, Platform,
    TextureHandle, TrackedDevices, Transform34, VrEvent, VrSession,
};
use crate::telemetry::{ControllerRole, DeviceClass};
use crate::types::SurfaceId;

/// A fake tracked device. `None` in a property means the query fails.
#[derive(Debug, Clone)]
pub struct MockDevice {
    pub class: DeviceClass,
    pub connected: bool,
    pub charging: Option<bool>,
    pub battery: Option<f32>,
    pub role: ControllerRole,
    pub state: Option<ControllerState>,
}

impl MockDevice {
    pub fn hmd() -> Self {
        Self {
            class: DeviceClass::Hmd,
            connected: true,
            charging: Some(false),
            battery: Some(0.0),
            role: ControllerRole::Invalid,
            state: None,
        }
    }

    pub fn base_station() -> Self {
        Self {
            class: DeviceClass::TrackingReference,
            ..Self::hmd()
        }
    }

    pub fn tracker() -> Self {
        Self {
            class: DeviceClass::GenericTracker,
            battery: Some(0.8),
            ..Self::hmd()
        }
    }

    pub fn controller(role: ControllerRole) -> Self {
        Self {
            class: DeviceClass::Controller,
            connected: true,
            charging: Some(true),
            battery: Some(0.75),
            role,
            state: Some(ControllerState::default()),
        }
    }
}

/// Everything the mocks record or can be told to do.
#[derive(Debug)]
pub struct MockState {
    pub devices: BTreeMap<u32, MockDevice>,
    pub events: VecDeque<u32>,

    pub gpu_fails: bool,
    /// How long GPU creation takes.
    pub gpu_delay: Duration,
    pub runtime_available: bool,
    pub upload_fails: bool,
    /// Compositor operations (by runtime name) that return an error.
    pub failing_ops: HashSet<&'static str>,

    pub gpu_created: usize,
    pub gpu_dropped: usize,
    pub connect_attempts: usize,
    pub sessions_opened: usize,
    pub sessions_closed: usize,

    pub uploads: [usize; 2],
    pub last_upload: [Option<Vec<u8>>; 2],
    pub flushes: usize,

    pub next_handle: u64,
    /// Live overlays: handle -> key.
    pub overlays: HashMap<u64, String>,
    pub shown: HashSet<u64>,
    pub created: Vec<String>,
    pub destroyed: Vec<u64>,
    /// (overlay handle, texture id) per `SetOverlayTexture` call.
    pub textures_set: Vec<(u64, usize)>,
    pub transforms: Vec<(u64, u32, Transform34)>,
    pub alphas: Vec<(u64, f32)>,
    pub widths: Vec<(u64, f32)>,
    pub input_methods: Vec<(u64, InputMethod)>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            devices: BTreeMap::new(),
            events: VecDeque::new(),
            gpu_fails: false,
            gpu_delay: Duration::ZERO,
            runtime_available: true,
            upload_fails: false,
            failing_ops: HashSet::new(),
            gpu_created: 0,
            gpu_dropped: 0,
            connect_attempts: 0,
            sessions_opened: 0,
            sessions_closed: 0,
            uploads: [0; 2],
            last_upload: [None, None],
            flushes: 0,
            next_handle: 1,
            overlays: HashMap::new(),
            shown: HashSet::new(),
            created: Vec::new(),
            destroyed: Vec::new(),
            textures_set: Vec::new(),
            transforms: Vec::new(),
            alphas: Vec::new(),
            widths: Vec::new(),
            input_methods: Vec::new(),
        }
    }
}

impl MockState {
    /// Handle of the live overlay registered under `key`.
    pub fn overlay_by_key(&self, key: &str) -> Option<u64> {
        self.overlays
            .iter()
            .find(|(_, k)| k.as_str() == key)
            .map(|(handle, _)| *handle)
    }

    fn check(&self, op: &'static str) -> OverlayResult<()> {
        if self.failing_ops.contains(op) {
            Err(OverlayError::compositor(op, 1))
        } else {
            Ok(())
        }
    }
}

/// Texture id the mock GPU hands out for a surface.
pub fn texture_id(surface: SurfaceId) -> usize {
    surface.index() + 1
}

#[derive(Clone, Default)]
pub struct MockPlatform {
    state: Arc<Mutex<MockState>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock()
    }

    pub fn set_device(&self, index: u32, device: MockDevice) {
        self.state().devices.insert(index, device);
    }

    pub fn push_event(&self, code: u32) {
        self.state().events.push_back(code);
    }

    pub fn fail_op(&self, op: &'static str) {
        self.state().failing_ops.insert(op);
    }

    pub fn heal_op(&self, op: &'static str) {
        self.state().failing_ops.remove(op);
    }

    /// A session over the shared state that is not counted as a connection.
    pub fn session_view(&self) -> MockSession {
        MockSession {
            state: Arc::clone(&self.state),
            counted: false,
        }
    }

    /// A GPU over the shared state, created outside the worker.
    pub fn gpu_view(&self) -> MockGpu {
        MockGpu {
            state: Arc::clone(&self.state),
        }
    }
}

impl Platform for MockPlatform {
    type Gpu = MockGpu;
    type Session = MockSession;

    fn create_gpu(&self) -> OverlayResult<MockGpu> {
        let delay = self.state().gpu_delay;
        thread::sleep(delay);

        let mut state = self.state();
        if state.gpu_fails {
            return Err(OverlayError::Gpu("D3D11CreateDevice: 0x887a0004".into()));
        }
        state.gpu_created += 1;
        Ok(MockGpu {
            state: Arc::clone(&self.state),
        })
    }

    fn connect(&self) -> OverlayResult<MockSession> {
        let mut state = self.state();
        state.connect_attempts += 1;
        if !state.runtime_available {
            return Err(OverlayError::RuntimeInit { code: 108 });
        }
        state.sessions_opened += 1;
        Ok(MockSession {
            state: Arc::clone(&self.state),
            counted: true,
        })
    }
}

pub struct MockGpu {
    state: Arc<Mutex<MockState>>,
}

impl GpuDevice for MockGpu {
    fn upload(&mut self, surface: SurfaceId, pixels: &[u8]) -> OverlayResult<()> {
        let mut state = self.state.lock();
        if state.upload_fails {
            return Err(OverlayError::Gpu("UpdateSubresource: device removed".into()));
        }
        state.uploads[surface.index()] += 1;
        state.last_upload[surface.index()] = Some(pixels.to_vec());
        Ok(())
    }

    fn flush(&mut self) {
        self.state.lock().flushes += 1;
    }

    fn texture(&self, surface: SurfaceId) -> TextureHandle {
        TextureHandle(texture_id(surface) as *mut c_void)
    }
}

impl Drop for MockGpu {
    fn drop(&mut self) {
        self.state.lock().gpu_dropped += 1;
    }
}

pub struct MockSession {
    state: Arc<Mutex<MockState>>,
    counted: bool,
}

impl Drop for MockSession {
    fn drop(&mut self) {
        if self.counted {
            self.state.lock().sessions_closed += 1;
        }
    }
}

impl TrackedDevices for MockSession {
    fn device_class(&self, index: u32) -> DeviceClass {
        self.state
            .lock()
            .devices
            .get(&index)
            .map(|d| d.class)
            .unwrap_or(DeviceClass::Invalid)
    }

    fn is_device_connected(&self, index: u32) -> bool {
        self.state
            .lock()
            .devices
            .get(&index)
            .map(|d| d.connected)
            .unwrap_or(false)
    }

    fn is_charging(&self, index: u32) -> OverlayResult<bool> {
        self.state
            .lock()
            .devices
            .get(&index)
            .and_then(|d| d.charging)
            .ok_or_else(|| OverlayError::compositor("Prop_DeviceIsCharging_Bool", 1))
    }

    fn battery_percentage(&self, index: u32) -> OverlayResult<f32> {
        self.state
            .lock()
            .devices
            .get(&index)
            .and_then(|d| d.battery)
            .ok_or_else(|| OverlayError::compositor("Prop_DeviceBatteryPercentage_Float", 1))
    }

    fn controller_role(&self, index: u32) -> ControllerRole {
        self.state
            .lock()
            .devices
            .get(&index)
            .map(|d| d.role)
            .unwrap_or(ControllerRole::Invalid)
    }

    fn controller_state(&self, index: u32) -> Option<ControllerState> {
        self.state.lock().devices.get(&index).and_then(|d| d.state)
    }

    fn device_index_for_role(&self, role: ControllerRole) -> Option<u32> {
        self.state
            .lock()
            .devices
            .iter()
            .find(|(_, d)| d.class == DeviceClass::Controller && d.role == role)
            .map(|(index, _)| *index)
    }
}

impl OverlayCompositor for MockSession {
    fn find_overlay(&mut self, key: &str) -> OverlayResult<Option<OverlayHandle>> {
        let state = self.state.lock();
        state.check("FindOverlay")?;
        Ok(state.overlay_by_key(key).map(OverlayHandle))
    }

    fn create_overlay(&mut self, key: &str, _name: &str) -> OverlayResult<OverlayHandle> {
        let mut state = self.state.lock();
        state.check("CreateOverlay")?;
        let handle = state.next_handle;
        state.next_handle += 1;
        state.overlays.insert(handle, key.to_string());
        state.created.push(key.to_string());
        Ok(OverlayHandle(handle))
    }

    fn destroy_overlay(&mut self, handle: OverlayHandle) -> OverlayResult<()> {
        let mut state = self.state.lock();
        state.check("DestroyOverlay")?;
        state.overlays.remove(&handle.0);
        state.shown.remove(&handle.0);
        state.destroyed.push(handle.0);
        Ok(())
    }

    fn set_alpha(&mut self, handle: OverlayHandle, alpha: f32) -> OverlayResult<()> {
        let mut state = self.state.lock();
        state.check("SetOverlayAlpha")?;
        state.alphas.push((handle.0, alpha));
        Ok(())
    }

    fn set_width_meters(&mut self, handle: OverlayHandle, meters: f32) -> OverlayResult<()> {
        let mut state = self.state.lock();
        state.check("SetOverlayWidthInMeters")?;
        state.widths.push((handle.0, meters));
        Ok(())
    }

    fn set_input_method(
        &mut self,
        handle: OverlayHandle,
        method: InputMethod,
    ) -> OverlayResult<()> {
        let mut state = self.state.lock();
        state.check("SetOverlayInputMethod")?;
        state.input_methods.push((handle.0, method));
        Ok(())
    }

    fn set_transform_device_relative(
        &mut self,
        handle: OverlayHandle,
        device_index: u32,
        transform: &Transform34,
    ) -> OverlayResult<()> {
        let mut state = self.state.lock();
        state.check("SetOverlayTransformTrackedDeviceRelative")?;
        state.transforms.push((handle.0, device_index, *transform));
        Ok(())
    }

    fn set_texture(&mut self, handle: OverlayHandle, texture: TextureHandle) -> OverlayResult<()> {
        let mut state = self.state.lock();
        state.check("SetOverlayTexture")?;
        state.textures_set.push((handle.0, texture.0 as usize));
        Ok(())
    }

    fn show_overlay(&mut self, handle: OverlayHandle) -> OverlayResult<()> {
        let mut state = self.state.lock();
        state.check("ShowOverlay")?;
        state.shown.insert(handle.0);
        Ok(())
    }
}

impl VrSession for MockSession {
    fn poll_event(&mut self) -> Option<VrEvent> {
        self.state.lock().events.pop_front().map(VrEvent::from_raw)
    }
}

/// Poll `condition` until it holds or `timeout` passes.
pub fn wait_until<F: FnMut() -> bool>(timeout: Duration, mut condition: F) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    condition()
}
