//! Overlay host configuration.
//!
//! ## Architecture
//!
//! - `OverlayConfig`: worker cadence, backoff intervals, telemetry bounds
//! - `SurfaceConfig`: per-surface overlay key, appearance and placement
//!
//! The service takes a validated copy at construction time and hands its own
//! copy to every worker it spawns, so there is no shared mutable config.

pub mod overlay;
pub mod surface;

pub use overlay::{OverlayConfig, MAX_TRACKED_DEVICE_SLOTS};
pub use surface::SurfaceConfig;
