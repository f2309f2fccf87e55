//! Tracked-device sampling.

use super::types::{ControllerRole, DeviceClass, DeviceRecord, TrackedDeviceSnapshot};
use crate::platform::{ControllerState, TrackedDevices};

/// Rebuild `out` from the first `max_devices` slots.
///
/// Empty (`Invalid`) slots are skipped, so records are dense and ordered by
/// slot. Each property query falls back to a neutral value on its own.
pub fn sample<T: TrackedDevices + ?Sized>(
    devices: &T,
    max_devices: u32,
    out: &mut TrackedDeviceSnapshot,
) {
    out.clear();

    for index in 0..max_devices {
        let device_class = devices.device_class(index);
        if device_class == DeviceClass::Invalid {
            continue;
        }

        let (controller_role, buttons) = if device_class == DeviceClass::Controller {
            (
                devices.controller_role(index),
                devices.controller_state(index).unwrap_or_default(),
            )
        } else {
            (ControllerRole::Invalid, ControllerState::default())
        };

        out.push(DeviceRecord {
            device_class,
            is_connected: devices.is_device_connected(index),
            is_charging: devices.is_charging(index).unwrap_or(false),
            battery_percentage: devices.battery_percentage(index).unwrap_or(0.0),
            controller_role,
            button_pressed_mask: buttons.pressed,
            button_touched_mask: buttons.touched,
        });
    }
}
