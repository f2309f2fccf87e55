//! Per-surface overlay settings.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::overlay::OverlayAnchor;

/// Longest key/name the compositor accepts, excluding the terminating NUL.
pub const MAX_OVERLAY_KEY_LEN: usize = 127;

/// Smallest overlay width accepted, in meters.
const MIN_WIDTH_METERS: f32 = 0.01;

/// Appearance and placement of one overlay surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct SurfaceConfig {
    /// Whether the worker creates this overlay at all.
    pub enabled: bool,
    /// Unique overlay key registered with the compositor.
    pub key: String,
    /// Human-readable overlay name.
    pub name: String,
    /// Overlay opacity (0.0 - 1.0).
    pub alpha: f32,
    /// Physical width of the overlay quad in meters.
    pub width_meters: f32,
    /// Tracked device the overlay follows.
    pub anchor: OverlayAnchor,
    /// Translation from the anchor device in meters (x, y, z).
    pub offset: [f32; 3],
}

impl SurfaceConfig {
    /// Head-locked panel 1m in front of the headset, slightly below eye level.
    pub fn hmd_default() -> Self {
        Self {
            enabled: true,
            key: "VRCX_HMD".to_string(),
            name: "VRCX_HMD".to_string(),
            alpha: 0.9,
            width_meters: 1.0,
            anchor: OverlayAnchor::Hmd,
            offset: [0.0, -0.1, -1.0],
        }
    }

    /// Small panel riding on the left controller.
    pub fn wrist_default() -> Self {
        Self {
            enabled: true,
            key: "VRCX_WRIST".to_string(),
            name: "VRCX_WRIST".to_string(),
            alpha: 0.9,
            width_meters: 0.25,
            anchor: OverlayAnchor::LeftController,
            offset: [0.0, 0.02, 0.12],
        }
    }

    /// Clamp values to ranges the compositor accepts. Empty or oversized
    /// keys fall back to `fallback`'s key/name.
    pub fn validate(&mut self, fallback: &SurfaceConfig) {
        self.alpha = if self.alpha.is_finite() {
            self.alpha.clamp(0.0, 1.0)
        } else {
            fallback.alpha
        };

        self.width_meters = if self.width_meters.is_finite() {
            self.width_meters.max(MIN_WIDTH_METERS)
        } else {
            fallback.width_meters
        };

        if self.offset.iter().any(|v| !v.is_finite()) {
            self.offset = fallback.offset;
        }

        if !is_valid_key(&self.key) {
            log::warn!(
                "[CONFIG] Invalid overlay key {:?}, using {:?}",
                self.key,
                fallback.key
            );
            self.key = fallback.key.clone();
        }

        if !is_valid_key(&self.name) {
            self.name = fallback.name.clone();
        }
    }
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && key.len() <= MAX_OVERLAY_KEY_LEN && !key.contains('\0')
}
