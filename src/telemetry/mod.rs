//! Tracked-device telemetry: record types, the sampler and the shared
//! snapshot it publishes to.

mod publisher;
mod sampler;
mod types;

pub use publisher::SnapshotPublisher;
pub use sampler::sample;
pub use types::{
    ControllerButton, ControllerRole, DeviceClass, DeviceRecord, TrackedDeviceSnapshot,
};
