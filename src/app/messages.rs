//! Wire payloads exchanged with the collector.
//!
//! Field names are the collector's contract; do not rename.

use serde::{Deserialize, Serialize};

/// Published on `{root}/pulse/{controller_id}` when pulses were drained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulseEvent {
    pub controller_id: String,
    pub meter_name: String,
    pub pulse_count: u32,
    pub liters: f64,
    /// Milliseconds since boot.
    pub timestamp: u64,
}

/// Published on `{root}/status` periodically and on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub controller_id: String,
    /// Always `"online"`; an offline device cannot publish.
    pub status: String,
    pub ip_address: String,
    pub rssi: i32,
    pub free_heap: u32,
    /// Seconds since boot.
    pub uptime: u64,
    pub total_pulses: u32,
    pub total_liters: f64,
    pub firmware_version: String,
    /// Milliseconds since boot.
    pub timestamp: u64,
}

/// Received on `{root}/command/{controller_id}`.
///
/// `command` is optional at the serde level so a missing field is
/// distinguishable from malformed JSON in the logs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommandPayload {
    #[serde(default)]
    pub command: Option<String>,
}

/// Volume for `pulses` at `liters_per_pulse`.  Plain multiply, no rounding.
pub fn liters(pulses: u32, liters_per_pulse: f64) -> f64 {
    f64::from(pulses) * liters_per_pulse
}
