//! MQTT session adapter.
//!
//! Implements [`SessionPort`] on top of the ESP-IDF MQTT client.
//!
//! ```text
//!  ┌──────────────────┐  event cb   ┌──────────────────────┐  poll()  ┌───────────┐
//!  │ esp-mqtt task    │ ──────────▶ │ Inbox (embassy-sync  │ ───────▶ │ Scheduler │
//!  │ (Connected,      │             │ Channel, bounded)    │          │ loop      │
//!  │  Received, ...)  │ ──┐         └──────────────────────┘          └───────────┘
//!  └──────────────────┘   │ link flag (AtomicBool)
//!                         └──────────────────────────────▶ is_connected()
//! ```
//!
//! The client task never calls into domain code.  It only flips the link
//! flag and queues received messages; a full inbox drops the newest
//! message with a warning.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::mqtt::client::EspMqttClient`.
//! - **all other targets**: an in-memory broker that records traffic.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{info, warn};

use crate::app::ports::{InboundMessage, SessionError, SessionPort};

#[cfg(target_os = "espidf")]
use esp_idf_svc::mqtt::client::{
    Details, EspMqttClient, EventPayload, MqttClientConfiguration, QoS,
};

/// Inbound messages buffered between two scheduler passes.
pub const INBOX_DEPTH: usize = 4;

/// Bounded hand-off from the client task to the scheduler loop.
pub type Inbox = Channel<CriticalSectionRawMutex, InboundMessage, INBOX_DEPTH>;

/// How long one connect attempt waits for the broker's CONNACK.
#[cfg(target_os = "espidf")]
const CONNECT_TIMEOUT_MS: u32 = 5_000;
#[cfg(target_os = "espidf")]
const CONNECT_POLL_MS: u32 = 100;

fn enqueue(inbox: &Inbox, topic: &str, payload: &[u8]) {
    let Some(msg) = InboundMessage::new(topic, payload) else {
        warn!("MQTT: inbound message on {} too large ({} bytes), dropped", topic, payload.len());
        return;
    };
    if inbox.try_send(msg).is_err() {
        warn!("MQTT: inbox full, dropped message on {}", topic);
    }
}

// ───────────────────────────────────────────────────────────────
// Simulated broker
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
struct SimBroker {
    refuse_connects: u32,
    refuse_publish: bool,
    connects: u32,
    published: Vec<(String, Vec<u8>)>,
    subscriptions: Vec<String>,
}

// ───────────────────────────────────────────────────────────────
// MQTT adapter
// ───────────────────────────────────────────────────────────────

pub struct MqttAdapter {
    broker_url: String,
    link: Arc<AtomicBool>,
    inbox: Arc<Inbox>,
    #[cfg(target_os = "espidf")]
    client: Option<EspMqttClient<'static>>,
    #[cfg(not(target_os = "espidf"))]
    sim: SimBroker,
}

impl MqttAdapter {
    pub fn new(broker_url: impl Into<String>) -> Self {
        Self {
            broker_url: broker_url.into(),
            link: Arc::new(AtomicBool::new(false)),
            inbox: Arc::new(Channel::new()),
            #[cfg(target_os = "espidf")]
            client: None,
            #[cfg(not(target_os = "espidf"))]
            sim: SimBroker::default(),
        }
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self, client_id: &str) -> Result<(), SessionError> {
        use esp_idf_hal::delay::FreeRtos;

        // Tear down any stale client before building a new one.
        self.client = None;
        self.link.store(false, Ordering::Release);

        let conf = MqttClientConfiguration {
            client_id: Some(client_id),
            ..Default::default()
        };
        let link = Arc::clone(&self.link);
        let inbox = Arc::clone(&self.inbox);
        let client = EspMqttClient::new_cb(&self.broker_url, &conf, move |event| {
            match event.payload() {
                EventPayload::Connected(_) => link.store(true, Ordering::Release),
                EventPayload::Disconnected => link.store(false, Ordering::Release),
                EventPayload::Received {
                    topic: Some(topic),
                    data,
                    details: Details::Complete,
                    ..
                } => enqueue(&inbox, topic, data),
                EventPayload::Received { .. } => {
                    warn!("MQTT: fragmented inbound message dropped");
                }
                EventPayload::Error(e) => warn!("MQTT: client error: {:?}", e),
                _ => {}
            }
        })
        .map_err(|e| SessionError::ConnectFailed(e.code()))?;
        self.client = Some(client);

        let mut waited = 0;
        while !self.link.load(Ordering::Acquire) {
            if waited >= CONNECT_TIMEOUT_MS {
                self.client = None;
                return Err(SessionError::ConnectFailed(-1));
            }
            FreeRtos::delay_ms(CONNECT_POLL_MS);
            waited += CONNECT_POLL_MS;
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self, client_id: &str) -> Result<(), SessionError> {
        self.sim.connects += 1;
        if self.sim.refuse_connects > 0 {
            self.sim.refuse_connects -= 1;
            // CONNACK 2: identifier rejected.
            return Err(SessionError::ConnectFailed(-2));
        }
        info!("MQTT(sim): session up as {}", client_id);
        self.link.store(true, Ordering::Release);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_subscribe(&mut self, topic: &str) -> Result<(), SessionError> {
        let client = self.client.as_mut().ok_or(SessionError::NotConnected)?;
        client
            .subscribe(topic, QoS::AtMostOnce)
            .map(|_| ())
            .map_err(|_| SessionError::SubscribeFailed)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_subscribe(&mut self, topic: &str) -> Result<(), SessionError> {
        self.sim.subscriptions.push(topic.into());
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), SessionError> {
        let client = self.client.as_mut().ok_or(SessionError::NotConnected)?;
        client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .map(|_| ())
            .map_err(|_| SessionError::PublishRejected)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), SessionError> {
        if self.sim.refuse_publish {
            return Err(SessionError::PublishRejected);
        }
        self.sim.published.push((topic.into(), payload.to_vec()));
        Ok(())
    }
}

// ── Simulation controls ───────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
impl MqttAdapter {
    /// Refuse the next `n` connect attempts.
    pub fn sim_refuse_connects(&mut self, n: u32) {
        self.sim.refuse_connects = n;
    }

    /// Make the broker reject every publish until cleared.
    pub fn sim_refuse_publish(&mut self, refuse: bool) {
        self.sim.refuse_publish = refuse;
    }

    /// Drop the session, as if the broker closed the socket.
    pub fn sim_drop(&mut self) {
        info!("MQTT(sim): session dropped");
        self.link.store(false, Ordering::Release);
    }

    /// Deliver a message as the client task would.
    pub fn sim_inject(&self, topic: &str, payload: &[u8]) {
        enqueue(&self.inbox, topic, payload);
    }

    pub fn sim_published(&self) -> &[(String, Vec<u8>)] {
        &self.sim.published
    }

    pub fn sim_subscriptions(&self) -> &[String] {
        &self.sim.subscriptions
    }

    pub fn sim_connects(&self) -> u32 {
        self.sim.connects
    }
}

// ───────────────────────────────────────────────────────────────
// SessionPort
// ───────────────────────────────────────────────────────────────

impl SessionPort for MqttAdapter {
    fn connect(&mut self, client_id: &str) -> Result<(), SessionError> {
        info!("MQTT: connecting to {}", self.broker_url);
        self.platform_connect(client_id)
    }

    fn is_connected(&self) -> bool {
        self.link.load(Ordering::Acquire)
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), SessionError> {
        if !self.is_connected() {
            return Err(SessionError::NotConnected);
        }
        self.platform_subscribe(topic)
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), SessionError> {
        if !self.is_connected() {
            return Err(SessionError::NotConnected);
        }
        self.platform_publish(topic, payload)
    }

    fn poll(&mut self) -> Option<InboundMessage> {
        self.inbox.try_receive().ok()
    }
}
