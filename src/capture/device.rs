//! Input device catalog.
//!
//! Presents a queryable view of host audio input capability. Nothing is
//! cached: every call re-queries the host, so the device list reflects
//! whatever is plugged in right now.

use cpal::traits::{DeviceTrait, HostTrait};
use tracing::debug;

use super::CaptureError;

/// Snapshot of one host audio input device at query time.
#[derive(Debug, Clone, PartialEq)]
pub struct InputDevice {
    /// Position in the host-reported device list
    pub id: usize,

    /// Host-reported device name
    pub name: String,

    /// Maximum input channels the device supports
    pub max_channels: u16,

    /// Device default sample rate in Hz
    pub default_sample_rate: u32,
}

/// List available audio input devices in host-reported order.
///
/// Devices that report no usable input config are skipped. An empty list
/// is a valid result, not an error.
pub fn list_devices() -> Result<Vec<InputDevice>, CaptureError> {
    let host = cpal::default_host();

    let mut devices = Vec::new();
    for (id, device) in host.input_devices()?.enumerate() {
        let name = device
            .name()
            .unwrap_or_else(|_| format!("Input device {}", id));

        let config = match device.default_input_config() {
            Ok(c) => c,
            Err(e) => {
                debug!("Skipping device '{}': {}", name, e);
                continue;
            }
        };

        if config.channels() == 0 {
            continue;
        }

        devices.push(InputDevice {
            id,
            name,
            max_channels: config.channels(),
            default_sample_rate: config.sample_rate().0,
        });
    }

    Ok(devices)
}

/// Resolve a device id (or the host default) to a device snapshot plus
/// the live cpal handle needed to open a stream.
///
/// With `Some(id)`, looks the id up in the current device list and fails
/// with `DeviceNotFound` if absent. With `None`, resolves the host default
/// input device, falling back to the first listed device if the host
/// reports no default. Fails with `NoInputDevices` if the list is empty.
pub fn resolve_device(
    requested: Option<usize>,
) -> Result<(InputDevice, cpal::Device), CaptureError> {
    let host = cpal::default_host();
    let devices = list_devices()?;

    let default_name = host
        .default_input_device()
        .and_then(|d| d.name().ok());

    let info = pick_device(&devices, requested, default_name.as_deref())?.clone();

    // Re-walk the host list to fetch the handle at the matching position.
    let handle = host
        .input_devices()?
        .nth(info.id)
        .ok_or(CaptureError::DeviceNotFound(info.id))?;

    debug!(
        "Resolved input device {} '{}' ({} ch, {} Hz)",
        info.id, info.name, info.max_channels, info.default_sample_rate
    );

    Ok((info, handle))
}

/// Pure selection logic, separated from host queries.
fn pick_device<'a>(
    devices: &'a [InputDevice],
    requested: Option<usize>,
    default_name: Option<&str>,
) -> Result<&'a InputDevice, CaptureError> {
    if let Some(id) = requested {
        return devices
            .iter()
            .find(|d| d.id == id)
            .ok_or(CaptureError::DeviceNotFound(id));
    }

    if devices.is_empty() {
        return Err(CaptureError::NoInputDevices);
    }

    // Prefer the host default when it shows up in the list; otherwise
    // fall back to the first entry.
    if let Some(name) = default_name {
        if let Some(dev) = devices.iter().find(|d| d.name == name) {
            return Ok(dev);
        }
    }

    Ok(&devices[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mic(id: usize, name: &str) -> InputDevice {
        InputDevice {
            id,
            name: name.to_string(),
            max_channels: 1,
            default_sample_rate: 44100,
        }
    }

    #[test]
    fn test_pick_empty_list_fails() {
        let result = pick_device(&[], None, None);
        assert!(matches!(result, Err(CaptureError::NoInputDevices)));
    }

    #[test]
    fn test_pick_requested_id() {
        let devices = vec![mic(0, "Built-in"), mic(1, "USB Mic")];
        let dev = pick_device(&devices, Some(1), None).unwrap();
        assert_eq!(dev.name, "USB Mic");
    }

    #[test]
    fn test_pick_unknown_id_fails() {
        let devices = vec![mic(0, "Built-in")];
        let result = pick_device(&devices, Some(7), None);
        assert!(matches!(result, Err(CaptureError::DeviceNotFound(7))));
    }

    #[test]
    fn test_pick_default_by_name() {
        let devices = vec![mic(0, "Built-in"), mic(1, "USB Mic")];
        let dev = pick_device(&devices, None, Some("USB Mic")).unwrap();
        assert_eq!(dev.id, 1);
    }

    #[test]
    fn test_pick_falls_back_to_first_when_default_lookup_fails() {
        // Single device, host default resolution failed entirely
        let devices = vec![mic(0, "Mic")];
        let dev = pick_device(&devices, None, None).unwrap();
        assert_eq!(dev.id, 0);

        // Default name doesn't match anything in the list
        let dev = pick_device(&devices, None, Some("Ghost Device")).unwrap();
        assert_eq!(dev.id, 0);
    }
}
