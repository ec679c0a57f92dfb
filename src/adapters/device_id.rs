//! Device identity derived from the ESP32 factory MAC address.
//!
//! The id is `aqi-xxyyzz` (last 3 MAC bytes, lowercase hex), stable across
//! reboots. A `device_id` in the stored config takes precedence.

use crate::config::MonitorConfig;

pub type DeviceIdString = heapless::String<32>;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// `aqi-xxyyzz` from the last 3 MAC bytes.
pub fn device_id(mac: &MacAddress) -> DeviceIdString {
    let mut id = DeviceIdString::new();
    use core::fmt::Write;
    let _ = write!(id, "aqi-{:02x}{:02x}{:02x}", mac[3], mac[4], mac[5]);
    id
}

/// The id reported in `GET /aqi`: config override, else MAC-derived.
pub fn resolve(config: &MonitorConfig, mac: &MacAddress) -> DeviceIdString {
    match &config.device_id {
        Some(id) => id.clone(),
        None => device_id(mac),
    }
}
