//! The complete board: one value implementing every port the scheduler
//! needs ([`Platform`](crate::app::ports::Platform)).
//!
//! Each port forwards to the adapter that owns that concern; delays go
//! to FreeRTOS on the device and to `std::thread::sleep` elsewhere.

use core::net::Ipv4Addr;

use embedded_hal::delay::DelayNs;

use super::mqtt::MqttAdapter;
use super::system::SystemAdapter;
use super::time::Esp32TimeAdapter;
use super::wifi::WifiAdapter;
use crate::app::ports::{
    ClockPort, InboundMessage, NetworkError, NetworkPort, SessionError, SessionPort, SystemPort,
};

pub struct BoardAdapter {
    pub wifi: WifiAdapter,
    pub mqtt: MqttAdapter,
    pub system: SystemAdapter,
    pub clock: Esp32TimeAdapter,
}

impl BoardAdapter {
    pub fn new(wifi: WifiAdapter, mqtt: MqttAdapter) -> Self {
        Self {
            wifi,
            mqtt,
            system: SystemAdapter::new(),
            clock: Esp32TimeAdapter::new(),
        }
    }
}

impl NetworkPort for BoardAdapter {
    fn join(&mut self) -> Result<(), NetworkError> {
        self.wifi.join()
    }

    fn is_joined(&self) -> bool {
        self.wifi.is_joined()
    }

    fn local_ip(&self) -> Option<Ipv4Addr> {
        self.wifi.local_ip()
    }

    fn rssi(&self) -> Option<i8> {
        self.wifi.rssi()
    }
}

impl SessionPort for BoardAdapter {
    fn connect(&mut self, client_id: &str) -> Result<(), SessionError> {
        self.mqtt.connect(client_id)
    }

    fn is_connected(&self) -> bool {
        self.mqtt.is_connected()
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), SessionError> {
        self.mqtt.subscribe(topic)
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), SessionError> {
        self.mqtt.publish(topic, payload)
    }

    fn poll(&mut self) -> Option<InboundMessage> {
        self.mqtt.poll()
    }
}

impl SystemPort for BoardAdapter {
    fn free_heap(&self) -> u32 {
        self.system.free_heap()
    }

    fn restart(&mut self) {
        self.system.restart();
    }
}

impl ClockPort for BoardAdapter {
    fn uptime_ms(&self) -> u64 {
        self.clock.uptime_ms()
    }
}

impl DelayNs for BoardAdapter {
    #[cfg(target_os = "espidf")]
    fn delay_ns(&mut self, ns: u32) {
        esp_idf_hal::delay::FreeRtos.delay_ns(ns);
    }

    #[cfg(target_os = "espidf")]
    fn delay_ms(&mut self, ms: u32) {
        esp_idf_hal::delay::FreeRtos::delay_ms(ms);
    }

    #[cfg(not(target_os = "espidf"))]
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(core::time::Duration::from_nanos(u64::from(ns)));
    }
}
