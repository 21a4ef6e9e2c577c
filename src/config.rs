//! Device configuration parameters
//!
//! All tunable parameters for the FlowMeter controller.  Defaults are
//! compiled in; credentials and identity strings may be overridden at
//! build time through `FLOWMETER_*` environment variables, or replaced
//! wholesale by a JSON blob provisioned at flash time.

use serde::{Deserialize, Serialize};

use crate::app::connectivity::RetryPolicy;
use crate::app::topics::{ControllerId, Topics};
use crate::context::DeviceIdentity;
use crate::error::{Error, Result};

/// What to do with drained pulses whose publish the transport refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishFailurePolicy {
    /// Drop them; the collector never hears about that interval.
    #[default]
    Discard,
    /// Add them back into `pending` for the next pulse event.
    Requeue,
}

/// Core device configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    // --- Network ---
    pub wifi_ssid: String,
    pub wifi_password: String,
    /// Join attempts before the device restarts.
    pub wifi_join_attempts: u32,
    /// Pause between join attempts (milliseconds).
    pub wifi_join_interval_ms: u32,

    // --- Broker ---
    pub mqtt_host: String,
    pub mqtt_port: u16,
    /// Pause between failed session attempts (milliseconds).
    pub mqtt_retry_delay_ms: u32,
    /// First segment of every topic.
    pub topic_root: String,

    // --- Identity ---
    /// Empty means "derive from the factory MAC".
    pub controller_id: String,
    pub meter_name: String,
    pub firmware_version: String,

    // --- Meter ---
    /// GPIO wired to the meter's pulse contact.
    pub pulse_gpio: i32,
    /// Litres per accepted pulse.
    pub liters_per_pulse: f64,
    /// Minimum spacing between accepted edges (milliseconds).
    pub debounce_ms: u32,

    // --- Timing ---
    /// Status heartbeat interval (milliseconds).
    pub heartbeat_interval_ms: u32,
    /// Scheduler yield at the end of every loop pass (milliseconds).
    pub loop_yield_ms: u32,

    pub publish_failure: PublishFailurePolicy,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            // Network
            wifi_ssid: option_env!("FLOWMETER_WIFI_SSID").unwrap_or("").into(),
            wifi_password: option_env!("FLOWMETER_WIFI_PASSWORD").unwrap_or("").into(),
            wifi_join_attempts: 20,
            wifi_join_interval_ms: 500,

            // Broker
            mqtt_host: option_env!("FLOWMETER_BROKER_HOST")
                .unwrap_or("192.168.12.12")
                .into(),
            mqtt_port: 1883,
            mqtt_retry_delay_ms: 5000,
            topic_root: "water_meter".into(),

            // Identity
            controller_id: option_env!("FLOWMETER_CONTROLLER_ID")
                .unwrap_or("water_meter_controller_001")
                .into(),
            meter_name: option_env!("FLOWMETER_METER_NAME")
                .unwrap_or("Cold water")
                .into(),
            firmware_version: "1.0.0".into(),

            // Meter
            pulse_gpio: 4,
            liters_per_pulse: 10.0,
            debounce_ms: 50,

            // Timing
            heartbeat_interval_ms: 30_000,
            loop_yield_ms: 10,

            publish_failure: PublishFailurePolicy::Discard,
        }
    }
}

impl DeviceConfig {
    /// Parse a flash-provisioned JSON blob.  Missing fields take their
    /// compiled-in defaults.
    pub fn from_json(raw: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(raw).map_err(|e| {
            log::warn!("Config: provisioning blob rejected: {}", e);
            Error::Config("provisioning blob is not valid JSON")
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Range-check every field.  Invalid values are rejected, not clamped.
    pub fn validate(&self) -> Result<()> {
        if self.wifi_ssid.is_empty() && !self.wifi_password.is_empty() {
            return Err(Error::Config("wifi_password set without wifi_ssid"));
        }
        if self.wifi_join_attempts == 0 {
            return Err(Error::Config("wifi_join_attempts must be at least 1"));
        }
        if self.mqtt_host.is_empty() {
            return Err(Error::Config("mqtt_host is empty"));
        }
        if self.mqtt_port == 0 {
            return Err(Error::Config("mqtt_port is 0"));
        }
        if !(self.liters_per_pulse.is_finite() && self.liters_per_pulse > 0.0) {
            return Err(Error::Config("liters_per_pulse must be a positive number"));
        }
        if !(0..64).contains(&self.pulse_gpio) {
            return Err(Error::Config("pulse_gpio out of range"));
        }
        if self.heartbeat_interval_ms == 0 {
            return Err(Error::Config("heartbeat_interval_ms is 0"));
        }
        if ControllerId::new(&self.topic_root).is_err() {
            return Err(Error::Config("topic_root is not a valid topic segment"));
        }
        if !self.controller_id.is_empty() && ControllerId::new(&self.controller_id).is_err() {
            return Err(Error::Config("controller_id contains invalid characters"));
        }
        Ok(())
    }

    /// Broker URL in the form the MQTT client expects.
    pub fn broker_url(&self) -> String {
        format!("mqtt://{}:{}", self.mqtt_host, self.mqtt_port)
    }

    /// Build the immutable identity.  `fallback_id` is used when no
    /// controller id was provisioned.
    pub fn identity(&self, fallback_id: &str) -> Result<DeviceIdentity> {
        let raw = if self.controller_id.is_empty() {
            fallback_id
        } else {
            self.controller_id.as_str()
        };
        let controller_id =
            ControllerId::new(raw).map_err(|_| Error::Config("controller_id is not a valid topic segment"))?;
        Ok(DeviceIdentity {
            controller_id,
            meter_name: self.meter_name.clone(),
            firmware_version: self.firmware_version.clone(),
            liters_per_pulse: self.liters_per_pulse,
        })
    }

    pub fn topics(&self, id: &ControllerId) -> Result<Topics> {
        Topics::new(&self.topic_root, id).map_err(|_| Error::Config("topic_root is not a valid topic segment"))
    }

    /// Bounded join policy: exhaustion restarts the device.
    pub fn join_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.wifi_join_attempts, self.wifi_join_interval_ms)
    }
}
