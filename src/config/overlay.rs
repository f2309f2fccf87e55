//! Worker cadence, backoff and surface configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::surface::SurfaceConfig;
use crate::error::{OverlayResult, ResultExt};
use crate::types::SurfaceId;

/// Number of tracked-device slots the VR runtime exposes.
pub const MAX_TRACKED_DEVICE_SLOTS: u32 = 64;

/// Complete overlay worker configuration.
///
/// Loaded once when the service is built; the worker copies it at spawn time,
/// so changes only apply to the next start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export, export_to = "bindings/")]
pub struct OverlayConfig {
    /// Worker tick length in milliseconds (1-1000).
    #[ts(type = "number")]
    pub tick_interval_ms: u64,

    /// Render every N ticks (1-100). 5 ticks at 10ms gives 20 renders/s.
    pub render_interval_ticks: u32,

    /// Wait after a failed runtime connection attempt.
    #[ts(type = "number")]
    pub connect_retry_ms: u64,

    /// Wait after the runtime asked us to quit before reconnecting.
    #[ts(type = "number")]
    pub quit_backoff_ms: u64,

    /// Tracked-device slots to scan per sample (1-64).
    pub max_tracked_devices: u32,

    /// Head-locked surface.
    pub hmd: SurfaceConfig,

    /// Wrist surface.
    pub wrist: SurfaceConfig,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 10,
            render_interval_ticks: 5,
            connect_retry_ms: 5_000,
            quit_backoff_ms: 10_000,
            max_tracked_devices: MAX_TRACKED_DEVICE_SLOTS,
            hmd: SurfaceConfig::hmd_default(),
            wrist: SurfaceConfig::wrist_default(),
        }
    }
}

impl OverlayConfig {
    /// Validate and clamp settings to acceptable ranges.
    pub fn validate(&mut self) {
        self.tick_interval_ms = self.tick_interval_ms.clamp(1, 1_000);
        self.render_interval_ticks = self.render_interval_ticks.clamp(1, 100);
        self.connect_retry_ms = self.connect_retry_ms.clamp(10, 600_000);
        self.quit_backoff_ms = self.quit_backoff_ms.clamp(10, 600_000);
        self.max_tracked_devices = self
            .max_tracked_devices
            .clamp(1, MAX_TRACKED_DEVICE_SLOTS);

        self.hmd.validate(&SurfaceConfig::hmd_default());
        self.wrist.validate(&SurfaceConfig::wrist_default());

        if self.hmd.key == self.wrist.key {
            log::warn!(
                "[CONFIG] Both surfaces use key {:?}, restoring defaults",
                self.hmd.key
            );
            self.hmd.key = SurfaceConfig::hmd_default().key;
            self.wrist.key = SurfaceConfig::wrist_default().key;
        }
    }

    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> OverlayResult<Self> {
        let mut config: Self = serde_json::from_str(json)?;
        config.validate();
        Ok(config)
    }

    /// Load from a JSON file.
    pub fn load(path: &Path) -> OverlayResult<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_json_str(&json)
    }

    pub fn surface(&self, id: SurfaceId) -> &SurfaceConfig {
        match id {
            SurfaceId::Hmd => &self.hmd,
            SurfaceId::Wrist => &self.wrist,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn connect_retry(&self) -> Duration {
        Duration::from_millis(self.connect_retry_ms)
    }

    pub fn quit_backoff(&self) -> Duration {
        Duration::from_millis(self.quit_backoff_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::OverlayAnchor;

    #[test]
    fn test_defaults_match_runtime_constants() {
        let config = OverlayConfig::default();
        assert_eq!(config.tick_interval(), Duration::from_millis(10));
        assert_eq!(config.render_interval_ticks, 5);
        assert_eq!(config.connect_retry(), Duration::from_secs(5));
        assert_eq!(config.quit_backoff(), Duration::from_secs(10));
        assert_eq!(config.max_tracked_devices, 64);
        assert_eq!(config.surface(SurfaceId::Hmd).key, "VRCX_HMD");
        assert_eq!(config.surface(SurfaceId::Wrist).key, "VRCX_WRIST");
    }

    #[test]
    fn test_validate_clamps() {
        let mut config = OverlayConfig {
            tick_interval_ms: 0,
            render_interval_ticks: 0,
            connect_retry_ms: 0,
            quit_backoff_ms: u64::MAX,
            max_tracked_devices: 1_000,
            ..Default::default()
        };
        config.validate();

        assert_eq!(config.tick_interval_ms, 1);
        assert_eq!(config.render_interval_ticks, 1);
        assert_eq!(config.connect_retry_ms, 10);
        assert_eq!(config.quit_backoff_ms, 600_000);
        assert_eq!(config.max_tracked_devices, MAX_TRACKED_DEVICE_SLOTS);
    }

    #[test]
    fn test_validate_separates_duplicate_keys() {
        let mut config = OverlayConfig::default();
        config.wrist.key = "VRCX_HMD".to_string();
        config.validate();

        assert_eq!(config.hmd.key, "VRCX_HMD");
        assert_eq!(config.wrist.key, "VRCX_WRIST");
    }

    #[test]
    fn test_from_json_partial_uses_defaults() {
        let config = OverlayConfig::from_json_str(r#"{ "tickIntervalMs": 20 }"#).unwrap();
        assert_eq!(config.tick_interval_ms, 20);
        assert_eq!(config.render_interval_ticks, 5);
        assert_eq!(config.hmd, SurfaceConfig::hmd_default());
    }

    #[test]
    fn test_from_json_surface_override() {
        let json = r#"{
            "wrist": {
                "enabled": false,
                "key": "MY_WRIST",
                "name": "My Wrist",
                "alpha": 0.5,
                "widthMeters": 0.3,
                "anchor": "rightController",
                "offset": [0.0, 0.0, 0.1]
            }
        }"#;
        let config = OverlayConfig::from_json_str(json).unwrap();

        assert!(!config.wrist.enabled);
        assert_eq!(config.wrist.key, "MY_WRIST");
        assert_eq!(config.wrist.anchor, OverlayAnchor::RightController);
        assert!(config.hmd.enabled);
    }

    #[test]
    fn test_from_json_invalid() {
        assert!(OverlayConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!(
            "vrcx_overlay_config_test_{}.json",
            std::process::id()
        ));
        std::fs::write(&path, r#"{ "renderIntervalTicks": 2 }"#).unwrap();

        let config = OverlayConfig::load(&path).unwrap();
        assert_eq!(config.render_interval_ticks, 2);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_missing_file() {
        let path = std::env::temp_dir().join("vrcx_overlay_config_missing.json");
        let err = OverlayConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_string(&OverlayConfig::default()).unwrap();
        assert!(json.contains("\"tickIntervalMs\":10"));
        assert!(json.contains("\"widthMeters\""));
    }
}
