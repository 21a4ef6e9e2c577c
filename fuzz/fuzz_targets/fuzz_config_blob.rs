//! Fuzz target: `DeviceConfig::from_json`
//!
//! Any blob that is accepted must also produce a usable identity and
//! topic set; nothing that passes validation may fail later at boot.
//!
//! cargo fuzz run fuzz_config_blob

#![no_main]

use flowmeter::config::DeviceConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = core::str::from_utf8(data) else {
        return;
    };
    let Ok(cfg) = DeviceConfig::from_json(raw) else {
        return;
    };

    let identity = cfg
        .identity("water_meter_controller_fuzz")
        .expect("validated config must yield an identity");
    assert!(cfg.topics(&identity.controller_id).is_ok());
    assert!(cfg.liters_per_pulse > 0.0);
    assert!(cfg.heartbeat_interval_ms > 0);
});
