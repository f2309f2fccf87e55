use super::*;
use crate::frame::{FrameReaders, FrameStore};
use crate::platform::OverlayCompositor;
use crate::testing::{texture_id, MockDevice, MockGpu, MockPlatform, MockSession};
use crate::types::{Region, SURFACE_BYTES};

struct Rig {
    platform: MockPlatform,
    session: MockSession,
    gpu: MockGpu,
    store: FrameStore,
    readers: FrameReaders,
}

fn rig() -> Rig {
    let platform = MockPlatform::new();
    platform.set_device(0, MockDevice::hmd());
    let session = platform.session_view();
    let gpu = platform.gpu_view();
    let (store, readers) = FrameStore::new();
    Rig {
        platform,
        session,
        gpu,
        store,
        readers,
    }
}

fn hmd_surface() -> OverlaySurface {
    OverlaySurface::new(SurfaceId::Hmd, SurfaceConfig::hmd_default())
}

fn wrist_surface() -> OverlaySurface {
    OverlaySurface::new(SurfaceId::Wrist, SurfaceConfig::wrist_default())
}

fn solid(value: u8) -> Vec<u8> {
    vec![value; SURFACE_BYTES]
}

impl Rig {
    fn render(&mut self, surface: &mut OverlaySurface) -> OverlayResult<()> {
        let frame = self.readers.get_mut(surface.id());
        surface.render(&mut self.session, &mut self.gpu, frame)
    }
}

#[test]
fn test_anchor_resolution() {
    let rig = rig();
    assert_eq!(OverlayAnchor::Hmd.resolve(&rig.session).unwrap(), 0);
    assert!(matches!(
        OverlayAnchor::LeftController.resolve(&rig.session),
        Err(OverlayError::AnchorUnavailable(OverlayAnchor::LeftController))
    ));

    rig.platform
        .set_device(4, MockDevice::controller(ControllerRole::LeftHand));
    assert_eq!(OverlayAnchor::LeftController.resolve(&rig.session).unwrap(), 4);
    assert!(OverlayAnchor::RightController.resolve(&rig.session).is_err());
}

#[test]
fn test_first_render_creates_and_configures_overlay() {
    let mut rig = rig();
    let mut surface = hmd_surface();

    rig.render(&mut surface).unwrap();

    let handle = surface.handle().unwrap().0;
    let state = rig.platform.state();
    assert_eq!(state.created, vec!["VRCX_HMD".to_string()]);
    assert_eq!(state.alphas, vec![(handle, 0.9)]);
    assert_eq!(state.widths, vec![(handle, 1.0)]);
    assert_eq!(state.input_methods, vec![(handle, InputMethod::None)]);
    assert_eq!(state.transforms.len(), 1);
    assert_eq!(state.transforms[0].1, HMD_DEVICE_INDEX);
    assert_eq!(state.transforms[0].2.offset(), [0.0, -0.1, -1.0]);
    assert_eq!(state.textures_set, vec![(handle, texture_id(SurfaceId::Hmd))]);
    assert!(state.shown.contains(&handle));
}

#[test]
fn test_existing_overlay_is_reused() {
    let mut rig = rig();
    rig.session.create_overlay("VRCX_HMD", "VRCX_HMD").unwrap();
    let existing = rig.platform.state().overlay_by_key("VRCX_HMD").unwrap();

    let mut surface = hmd_surface();
    rig.render(&mut surface).unwrap();

    assert_eq!(surface.handle(), Some(OverlayHandle(existing)));
    assert_eq!(rig.platform.state().created.len(), 1);
}

#[test]
fn test_find_error_other_than_unknown_fails_without_creating() {
    let mut rig = rig();
    rig.platform.fail_op("FindOverlay");

    let mut surface = hmd_surface();
    assert!(rig.render(&mut surface).is_err());
    assert!(surface.handle().is_none());
    assert!(rig.platform.state().created.is_empty());
}

#[test]
fn test_alpha_failure_is_not_fatal() {
    let mut rig = rig();
    rig.platform.fail_op("SetOverlayAlpha");

    let mut surface = hmd_surface();
    rig.render(&mut surface).unwrap();
    assert!(surface.handle().is_some());
}

#[test]
fn test_setup_failure_destroys_partial_overlay() {
    for op in [
        "SetOverlayWidthInMeters",
        "SetOverlayInputMethod",
        "SetOverlayTransformTrackedDeviceRelative",
        "SetOverlayTexture",
        "ShowOverlay",
    ] {
        let mut rig = rig();
        rig.platform.fail_op(op);

        let mut surface = hmd_surface();
        let err = rig.render(&mut surface).unwrap_err();
        assert!(err.to_string().contains(op), "{}: {}", op, err);
        assert!(surface.handle().is_none());

        let state = rig.platform.state();
        assert_eq!(state.destroyed.len(), 1, "{}", op);
        assert!(state.overlays.is_empty(), "{}", op);
    }
}

#[test]
fn test_setup_retries_on_next_render() {
    let mut rig = rig();
    rig.platform.fail_op("ShowOverlay");
    let mut surface = hmd_surface();
    assert!(rig.render(&mut surface).is_err());

    rig.platform.heal_op("ShowOverlay");
    rig.render(&mut surface).unwrap();
    assert!(surface.handle().is_some());
    assert_eq!(rig.platform.state().created.len(), 2);
}

#[test]
fn test_wrist_waits_for_left_controller() {
    let mut rig = rig();
    let mut surface = wrist_surface();

    let err = rig.render(&mut surface).unwrap_err();
    assert!(matches!(err, OverlayError::AnchorUnavailable(_)));
    assert!(surface.handle().is_none());
    assert!(rig.platform.state().created.is_empty());

    rig.platform
        .set_device(5, MockDevice::controller(ControllerRole::LeftHand));
    rig.render(&mut surface).unwrap();

    let state = rig.platform.state();
    let handle = surface.handle().unwrap().0;
    assert_eq!(state.transforms.last().unwrap().0, handle);
    assert_eq!(state.transforms.last().unwrap().1, 5);
    assert_eq!(state.widths.last(), Some(&(handle, 0.25)));
}

#[test]
fn test_initial_push_uploads_pending_frame() {
    let mut rig = rig();
    rig.store
        .write_region(SurfaceId::Hmd, Region::full(), &solid(7));

    let mut surface = hmd_surface();
    rig.render(&mut surface).unwrap();

    let state = rig.platform.state();
    assert_eq!(state.uploads[SurfaceId::Hmd.index()], 1);
    assert_eq!(state.flushes, 1);
    assert!(!rig.readers.is_dirty(SurfaceId::Hmd));
}

#[test]
fn test_clean_frame_is_not_uploaded() {
    let mut rig = rig();
    let mut surface = hmd_surface();
    rig.render(&mut surface).unwrap();
    rig.render(&mut surface).unwrap();
    rig.render(&mut surface).unwrap();

    let state = rig.platform.state();
    assert_eq!(state.uploads, [0, 0]);
    assert_eq!(state.flushes, 0);
    // Only the initial push during setup.
    assert_eq!(state.textures_set.len(), 1);
}

#[test]
fn test_dirty_frame_is_uploaded_once() {
    let mut rig = rig();
    let mut surface = hmd_surface();
    rig.render(&mut surface).unwrap();

    rig.store
        .write_region(SurfaceId::Hmd, Region::new(0, 0, 16, 16), &solid(200));
    rig.render(&mut surface).unwrap();
    rig.render(&mut surface).unwrap();

    let state = rig.platform.state();
    assert_eq!(state.uploads[SurfaceId::Hmd.index()], 1);
    assert_eq!(state.flushes, 1);
    assert_eq!(state.textures_set.len(), 2);
}

#[test]
fn test_each_surface_uploads_its_own_frame() {
    let mut rig = rig();
    rig.platform
        .set_device(3, MockDevice::controller(ControllerRole::LeftHand));
    let mut hmd = hmd_surface();
    let mut wrist = wrist_surface();
    rig.render(&mut hmd).unwrap();
    rig.render(&mut wrist).unwrap();

    rig.store
        .write_region(SurfaceId::Wrist, Region::full(), &solid(42));
    rig.render(&mut hmd).unwrap();
    rig.render(&mut wrist).unwrap();

    let state = rig.platform.state();
    assert_eq!(state.uploads, [0, 1]);
    assert_eq!(
        state.last_upload[SurfaceId::Wrist.index()].as_deref(),
        Some(&solid(42)[..])
    );
    let wrist_handle = wrist.handle().unwrap().0;
    assert_eq!(
        state.textures_set.last(),
        Some(&(wrist_handle, texture_id(SurfaceId::Wrist)))
    );
}

#[test]
fn test_upload_failure_clears_dirty_and_drops_handle() {
    let mut rig = rig();
    let mut surface = hmd_surface();
    rig.render(&mut surface).unwrap();
    let handle = surface.handle().unwrap().0;

    rig.platform.state().upload_fails = true;
    rig.store
        .write_region(SurfaceId::Hmd, Region::full(), &solid(1));

    assert!(rig.render(&mut surface).is_err());
    assert!(!rig.readers.is_dirty(SurfaceId::Hmd));
    assert!(surface.handle().is_none());
    assert_eq!(rig.platform.state().destroyed, vec![handle]);
}

#[test]
fn test_set_texture_failure_still_flushes_upload() {
    let mut rig = rig();
    let mut surface = hmd_surface();
    rig.render(&mut surface).unwrap();

    rig.platform.fail_op("SetOverlayTexture");
    rig.store
        .write_region(SurfaceId::Hmd, Region::full(), &solid(1));

    assert!(rig.render(&mut surface).is_err());
    let state = rig.platform.state();
    assert_eq!(state.uploads[0], 1);
    assert_eq!(state.flushes, 1);
    assert!(surface.handle().is_none());
}

#[test]
fn test_disabled_surface_never_touches_compositor() {
    let mut rig = rig();
    let mut config = SurfaceConfig::hmd_default();
    config.enabled = false;
    let mut surface = OverlaySurface::new(SurfaceId::Hmd, config);

    rig.render(&mut surface).unwrap();
    assert!(surface.handle().is_none());
    assert!(rig.platform.state().created.is_empty());
}

#[test]
fn test_teardown_destroys_handle() {
    let mut rig = rig();
    let mut surface = hmd_surface();
    rig.render(&mut surface).unwrap();

    surface.teardown(&mut rig.session);
    assert!(surface.handle().is_none());
    assert!(rig.platform.state().overlays.is_empty());

    // Second teardown is a no-op.
    surface.teardown(&mut rig.session);
    assert_eq!(rig.platform.state().destroyed.len(), 1);
}
