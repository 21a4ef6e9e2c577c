//! Controller identity derived from the ESP32 factory MAC address.
//!
//! Used when no controller id was provisioned.  The id is
//! `water_meter_controller_xxyyzz` (last 3 MAC bytes, lowercase hex):
//! stable across reboots and a valid topic segment.

use core::fmt::Write;

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

/// Fallback controller id for `mac`.
pub fn default_controller_id(mac: &MacAddress) -> heapless::String<32> {
    let mut id = heapless::String::new();
    let _ = write!(
        id,
        "water_meter_controller_{:02x}{:02x}{:02x}",
        mac[3], mac[4], mac[5]
    );
    id
}
