//! VRCX overlay host.
//!
//! Keeps two overlay surfaces (head-locked and wrist) alive inside the VR
//! compositor and reports tracked-device state back to the host
//! application. The host writes raw BGRA pixels with
//! [`OverlayService::write_frame`]; a background worker uploads changed
//! frames to GPU textures and hands them to the compositor, reconnecting
//! whenever the runtime goes away.

pub mod config;
pub mod error;
pub mod frame;
pub mod host;
pub mod logging;
pub mod overlay;
pub mod platform;
pub mod service;
pub mod telemetry;
pub mod types;
pub mod worker;

#[cfg(test)]
mod testing;

pub use config::{OverlayConfig, SurfaceConfig};
pub use error::{OverlayError, OverlayResult};
pub use host::RunningApplications;
pub use overlay::OverlayAnchor;
pub use service::OverlayService;
pub use telemetry::{ControllerButton, ControllerRole, DeviceClass, DeviceRecord};
pub use types::{Region, SurfaceId};
pub use worker::WorkerState;
