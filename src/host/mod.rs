//! Boundary operations exposed to the host application.
//!
//! Thin, infallible wrappers: every failure is logged and reported as
//! `false` or an empty result, which is what the calling application expects.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{OverlayError, OverlayResult};
use crate::platform::Platform;
use crate::service::OverlayService;
use crate::telemetry::DeviceRecord;
use crate::types::{Region, SurfaceId};

/// Steam app id of the companion game.
pub const COMPANION_APP_ID: u32 = 438100;

/// Which related applications currently have a window open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct RunningApplications {
    /// The companion game (VRChat).
    pub target_app: bool,
    /// The VR compositor's status window (SteamVR).
    pub compositor: bool,
}

/// Detect running applications by their top-level window.
pub fn get_running_applications() -> RunningApplications {
    #[cfg(target_os = "windows")]
    {
        windows_impl::running_applications()
    }

    #[cfg(not(target_os = "windows"))]
    {
        RunningApplications::default()
    }
}

/// Launch the companion game through the Steam client, passing `launch_args`
/// through verbatim. Returns true once the launcher process was spawned.
pub fn launch_companion_application(launch_args: &str) -> bool {
    match launch(launch_args) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("[HOST] Launch failed: {}", e);
            false
        }
    }
}

fn launch(launch_args: &str) -> OverlayResult<()> {
    #[cfg(target_os = "windows")]
    {
        let command = windows_impl::steam_open_command()?;
        let exe = parse_launcher_command(&command)
            .ok_or_else(|| OverlayError::Launch(format!("Unexpected Steam command {:?}", command)))?;
        windows_impl::spawn_launcher(&exe, launch_args)
    }

    #[cfg(not(target_os = "windows"))]
    {
        let _ = launch_args;
        Err(OverlayError::Unsupported("companion launch"))
    }
}

/// Extract the executable from a registry shell command such as
/// `"C:\Steam\steam.exe" -- "%1"`. Everything after the quoted `.exe` is
/// dropped, as are the quotes.
pub fn parse_launcher_command(command: &str) -> Option<String> {
    const MARKER: &str = ".exe\"";

    let end = command.find(MARKER)? + MARKER.len();
    let exe = command[..end].trim().trim_matches('"');
    if exe.is_empty() {
        return None;
    }
    Some(exe.to_string())
}

pub fn start_overlay_worker<P: Platform>(service: &OverlayService<P>) -> bool {
    service.start()
}

pub fn stop_overlay_worker<P: Platform>(service: &OverlayService<P>) {
    service.stop();
}

/// Write a rectangle of a full-surface BGRA buffer to surface 0 (HMD) or
/// 1 (wrist). Unknown surfaces and invalid rectangles are ignored.
pub fn write_overlay_frame<P: Platform>(
    service: &OverlayService<P>,
    surface: u32,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    pixels: &[u8],
) -> bool {
    match SurfaceId::from_raw(surface) {
        Some(surface) => service.write_frame(surface, Region::new(x, y, width, height), pixels),
        None => false,
    }
}

pub fn list_tracked_devices<P: Platform>(service: &OverlayService<P>) -> Vec<DeviceRecord> {
    service.list_devices()
}

#[cfg(target_os = "windows")]
mod windows_impl {
    use std::os::windows::process::CommandExt;
    use std::process::Command;

    use windows::core::{w, PCWSTR};
    use windows::Win32::System::Registry::{
        RegCloseKey, RegOpenKeyExW, RegQueryValueExW, HKEY, HKEY_CLASSES_ROOT, KEY_READ,
    };
    use windows::Win32::UI::WindowsAndMessaging::FindWindowW;

    use super::{RunningApplications, COMPANION_APP_ID};
    use crate::error::{OverlayError, OverlayResult};

    pub fn running_applications() -> RunningApplications {
        unsafe {
            RunningApplications {
                target_app: FindWindowW(w!("UnityWndClass"), w!("VRChat")).is_ok(),
                compositor: FindWindowW(w!("Qt5QWindowIcon"), w!("SteamVR Status")).is_ok(),
            }
        }
    }

    /// Default value of `HKCR\steam\shell\open\command`.
    pub fn steam_open_command() -> OverlayResult<String> {
        let mut buffer = [0u16; 1024];
        let mut size = std::mem::size_of_val(&buffer) as u32;

        unsafe {
            let mut key = HKEY::default();
            RegOpenKeyExW(
                HKEY_CLASSES_ROOT,
                w!("steam\\shell\\open\\command"),
                0,
                KEY_READ,
                &mut key,
            )
            .ok()
            .map_err(|e| OverlayError::Launch(format!("Steam is not registered: {}", e)))?;

            let status = RegQueryValueExW(
                key,
                PCWSTR::null(),
                None,
                None,
                Some(buffer.as_mut_ptr().cast::<u8>()),
                Some(&mut size as *mut u32),
            );
            let _ = RegCloseKey(key);

            status
                .ok()
                .map_err(|e| OverlayError::Launch(format!("Failed to read Steam command: {}", e)))?;
        }

        let len = (size as usize / 2).min(buffer.len());
        let value = &buffer[..len];
        let end = value.iter().position(|&c| c == 0).unwrap_or(value.len());
        Ok(String::from_utf16_lossy(&value[..end]))
    }

    pub fn spawn_launcher(exe: &str, launch_args: &str) -> OverlayResult<()> {
        Command::new(exe)
            .arg("-applaunch")
            .arg(COMPANION_APP_ID.to_string())
            .arg("--")
            .raw_arg(launch_args)
            .spawn()
            .map_err(|e| OverlayError::Launch(format!("Failed to spawn {}: {}", exe, e)))?;

        log::info!("[HOST] Launched app {} via {}", COMPANION_APP_ID, exe);
        Ok(())
    }
}
