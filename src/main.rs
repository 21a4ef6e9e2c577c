//! FlowMeter Firmware — Main Entry Point
//!
//! Hexagonal architecture with interrupt-driven pulse capture and a
//! single cooperative scheduler loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  WifiAdapter     MqttAdapter     SystemAdapter   Esp32Time     │
//! │  (NetworkPort)   (SessionPort)   (SystemPort)    (ClockPort)   │
//! │                        └──── BoardAdapter ────┘                │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │   Scheduler (pure logic)                               │    │
//! │  │   ConnectivityManager · MessagePublisher · Commands    │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  DeviceContext ◀── pulse GPIO ISR · heartbeat esp_timer        │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Imports ───────────────────────────────────────────────────
use anyhow::{Result, anyhow};
use log::{info, warn};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::prelude::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};

use flowmeter::adapters::board::BoardAdapter;
use flowmeter::adapters::device_id;
use flowmeter::adapters::mqtt::MqttAdapter;
use flowmeter::adapters::wifi::WifiAdapter;
use flowmeter::app::ports::ClockPort;
use flowmeter::config::DeviceConfig;
use flowmeter::context::DeviceContext;
use flowmeter::drivers::hw_init;
use flowmeter::drivers::hw_timer::HeartbeatTimer;
use flowmeter::scheduler::Scheduler;

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  FlowMeter v{}                    ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration (compiled-in or flash-provisioned) ───
    let config = match option_env!("FLOWMETER_CONFIG_JSON") {
        Some(raw) => DeviceConfig::from_json(raw)?,
        None => {
            let cfg = DeviceConfig::default();
            cfg.validate()?;
            cfg
        }
    };

    // ── 3. Identity + shared context ──────────────────────────
    let mac = device_id::read_mac();
    let fallback_id = device_id::default_controller_id(&mac);
    let identity = config.identity(&fallback_id)?;
    info!(
        "Device: {} ({}, {} L/pulse, fw {})",
        identity.controller_id, identity.meter_name, identity.liters_per_pulse, identity.firmware_version
    );

    // Lives for the rest of the program; the ISR and timer hold its address.
    let ctx: &'static DeviceContext =
        Box::leak(Box::new(DeviceContext::new(identity, config.debounce_ms)));

    // ── 4. Interrupt + timer sources ──────────────────────────
    hw_init::attach_pulse_input(config.pulse_gpio, ctx)?;
    let _heartbeat = HeartbeatTimer::start(config.heartbeat_interval_ms, ctx)?;

    // ── 5. Network adapters ───────────────────────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = match EspDefaultNvsPartition::take() {
        Ok(nvs) => Some(nvs),
        Err(e) => {
            warn!("NVS init failed ({}), WiFi runs without calibration cache", e);
            None
        }
    };
    let driver = BlockingWifi::wrap(EspWifi::new(peripherals.modem, sysloop.clone(), nvs)?, sysloop)?;

    let mut wifi = WifiAdapter::new(driver);
    wifi.set_credentials(&config.wifi_ssid, &config.wifi_password)
        .map_err(|e| anyhow!("WiFi credentials rejected: {e}"))?;
    let mqtt = MqttAdapter::new(config.broker_url());
    let mut board = BoardAdapter::new(wifi, mqtt);

    // ── 6. Scheduler ──────────────────────────────────────────
    let mut scheduler = Scheduler::from_config(&config, ctx, board.uptime_ms())?;
    info!("System ready. Entering main loop.");

    let err = scheduler.run(&mut board);
    Err(err.into())
}
