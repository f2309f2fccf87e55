//! Tracked-device telemetry records.
//!
//! Enum values match the VR runtime's numeric codes and serialize as numbers,
//! which is what the calling application compares against.

use serde::{Serialize, Serializer};
use ts_rs::TS;

/// Kind of hardware occupying a tracked-device slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    Invalid,
    Hmd,
    Controller,
    GenericTracker,
    /// Base station / lighthouse.
    TrackingReference,
    DisplayRedirect,
    /// A class this crate does not know about, carried as the raw code.
    Other(u32),
}

impl DeviceClass {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => DeviceClass::Invalid,
            1 => DeviceClass::Hmd,
            2 => DeviceClass::Controller,
            3 => DeviceClass::GenericTracker,
            4 => DeviceClass::TrackingReference,
            5 => DeviceClass::DisplayRedirect,
            other => DeviceClass::Other(other),
        }
    }

    pub fn as_raw(self) -> u32 {
        match self {
            DeviceClass::Invalid => 0,
            DeviceClass::Hmd => 1,
            DeviceClass::Controller => 2,
            DeviceClass::GenericTracker => 3,
            DeviceClass::TrackingReference => 4,
            DeviceClass::DisplayRedirect => 5,
            DeviceClass::Other(raw) => raw,
        }
    }
}

impl Serialize for DeviceClass {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.as_raw())
    }
}

/// Which hand (or other use) a controller is assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerRole {
    Invalid,
    LeftHand,
    RightHand,
    OptOut,
    Treadmill,
    Stylus,
}

impl ControllerRole {
    /// Unknown codes map to `Invalid`.
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => ControllerRole::LeftHand,
            2 => ControllerRole::RightHand,
            3 => ControllerRole::OptOut,
            4 => ControllerRole::Treadmill,
            5 => ControllerRole::Stylus,
            _ => ControllerRole::Invalid,
        }
    }

    pub fn as_raw(self) -> u32 {
        match self {
            ControllerRole::Invalid => 0,
            ControllerRole::LeftHand => 1,
            ControllerRole::RightHand => 2,
            ControllerRole::OptOut => 3,
            ControllerRole::Treadmill => 4,
            ControllerRole::Stylus => 5,
        }
    }
}

impl Serialize for ControllerRole {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.as_raw())
    }
}

/// Button ids as used in the pressed/touched bit masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerButton {
    System,
    ApplicationMenu,
    Grip,
    DPadLeft,
    DPadUp,
    DPadRight,
    DPadDown,
    A,
    Touchpad,
    Trigger,
}

impl ControllerButton {
    pub fn id(self) -> u32 {
        match self {
            ControllerButton::System => 0,
            ControllerButton::ApplicationMenu => 1,
            ControllerButton::Grip => 2,
            ControllerButton::DPadLeft => 3,
            ControllerButton::DPadUp => 4,
            ControllerButton::DPadRight => 5,
            ControllerButton::DPadDown => 6,
            ControllerButton::A => 7,
            ControllerButton::Touchpad => 32,
            ControllerButton::Trigger => 33,
        }
    }

    pub fn mask(self) -> u64 {
        1u64 << self.id()
    }
}

/// One occupied tracked-device slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct DeviceRecord {
    #[ts(type = "number")]
    pub device_class: DeviceClass,
    pub is_connected: bool,
    pub is_charging: bool,
    /// 0.0 - 1.0, 0.0 when the device does not report it.
    pub battery_percentage: f32,
    /// `Invalid` for anything that is not a controller.
    #[ts(type = "number")]
    pub controller_role: ControllerRole,
    #[ts(type = "number")]
    pub button_pressed_mask: u64,
    #[ts(type = "number")]
    pub button_touched_mask: u64,
}

impl DeviceRecord {
    pub fn is_controller(&self) -> bool {
        self.device_class == DeviceClass::Controller
    }

    pub fn is_pressed(&self, button: ControllerButton) -> bool {
        self.button_pressed_mask & button.mask() != 0
    }

    pub fn is_touched(&self, button: ControllerButton) -> bool {
        self.button_touched_mask & button.mask() != 0
    }
}

/// Ordered records for every occupied slot, rebuilt on each sample.
pub type TrackedDeviceSnapshot = Vec<DeviceRecord>;
