//! Mock board for integration tests.
//!
//! Implements every port the scheduler needs and records each call so
//! tests can assert on the full I/O history without a radio or a broker.
//! Joins and session connects can be scripted to fail; time only moves
//! when the code under test delays.

use std::collections::VecDeque;
use std::net::Ipv4Addr;

use embedded_hal::delay::DelayNs;
use flowmeter::app::ports::{
    ClockPort, InboundMessage, NetworkError, NetworkPort, SessionError, SessionPort, SystemPort,
};
use flowmeter::config::DeviceConfig;
use flowmeter::context::DeviceContext;
use serde_json::Value;

pub const STATUS_TOPIC: &str = "water_meter/status";
pub const PULSE_TOPIC: &str = "water_meter/pulse/water_meter_controller_001";
pub const COMMAND_TOPIC: &str = "water_meter/command/water_meter_controller_001";

// ── Call record ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum BoardCall {
    Join,
    Connect(String),
    Subscribe(String),
    Publish { topic: String, payload: String },
    Delay(u32),
    Restart,
}

// ── MockBoard ─────────────────────────────────────────────────

pub struct MockBoard {
    pub calls: Vec<BoardCall>,
    pub now_ms: u64,
    pub joined: bool,
    pub session_up: bool,
    /// Remaining join attempts that fail; `u32::MAX` fails forever.
    pub join_failures: u32,
    /// Remaining session connects that fail.
    pub connect_failures: u32,
    /// The next connect takes the network down with it.
    pub lose_network_on_connect: bool,
    pub refuse_publish: bool,
    pub inbox: VecDeque<InboundMessage>,
}

#[allow(dead_code)]
impl MockBoard {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            now_ms: 0,
            joined: false,
            session_up: false,
            join_failures: 0,
            connect_failures: 0,
            lose_network_on_connect: false,
            refuse_publish: false,
            inbox: VecDeque::new(),
        }
    }

    /// Deliver a command as the broker would.
    pub fn inject_command(&mut self, payload: &[u8]) {
        self.inbox
            .push_back(InboundMessage::new(COMMAND_TOPIC, payload).unwrap());
    }

    pub fn drop_session(&mut self) {
        self.session_up = false;
    }

    pub fn drop_network(&mut self) {
        self.joined = false;
        self.session_up = false;
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Every publish as `(topic, parsed JSON)`, in order.
    pub fn published(&self) -> Vec<(String, Value)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                BoardCall::Publish { topic, payload } => {
                    Some((topic.clone(), serde_json::from_str(payload).unwrap()))
                }
                _ => None,
            })
            .collect()
    }

    pub fn published_on(&self, topic: &str) -> Vec<Value> {
        self.published()
            .into_iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, v)| v)
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&BoardCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    pub fn restarts(&self) -> usize {
        self.count(|c| *c == BoardCall::Restart)
    }
}

impl Default for MockBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkPort for MockBoard {
    fn join(&mut self) -> Result<(), NetworkError> {
        self.calls.push(BoardCall::Join);
        if self.join_failures > 0 {
            if self.join_failures != u32::MAX {
                self.join_failures -= 1;
            }
            return Err(NetworkError::ConnectionFailed);
        }
        self.joined = true;
        Ok(())
    }

    fn is_joined(&self) -> bool {
        self.joined
    }

    fn local_ip(&self) -> Option<Ipv4Addr> {
        self.joined.then(|| Ipv4Addr::new(192, 168, 12, 77))
    }

    fn rssi(&self) -> Option<i8> {
        self.joined.then_some(-58)
    }
}

impl SessionPort for MockBoard {
    fn connect(&mut self, client_id: &str) -> Result<(), SessionError> {
        self.calls.push(BoardCall::Connect(client_id.into()));
        if self.lose_network_on_connect {
            self.lose_network_on_connect = false;
            self.joined = false;
        }
        if !self.joined {
            return Err(SessionError::ConnectFailed(-1));
        }
        if self.connect_failures > 0 {
            self.connect_failures -= 1;
            return Err(SessionError::ConnectFailed(-2));
        }
        self.session_up = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.session_up
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), SessionError> {
        self.calls.push(BoardCall::Subscribe(topic.into()));
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), SessionError> {
        if self.refuse_publish || !self.session_up {
            return Err(SessionError::PublishRejected);
        }
        self.calls.push(BoardCall::Publish {
            topic: topic.into(),
            payload: String::from_utf8(payload.to_vec()).unwrap(),
        });
        Ok(())
    }

    fn poll(&mut self) -> Option<InboundMessage> {
        self.inbox.pop_front()
    }
}

impl SystemPort for MockBoard {
    fn free_heap(&self) -> u32 {
        180_000
    }

    fn restart(&mut self) {
        self.calls.push(BoardCall::Restart);
    }
}

impl ClockPort for MockBoard {
    fn uptime_ms(&self) -> u64 {
        self.now_ms
    }
}

impl DelayNs for MockBoard {
    fn delay_ns(&mut self, ns: u32) {
        self.now_ms += u64::from(ns / 1_000_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.calls.push(BoardCall::Delay(ms));
        self.now_ms += u64::from(ms);
    }
}

// ── Fixtures ──────────────────────────────────────────────────

pub fn context(cfg: &DeviceConfig) -> DeviceContext {
    DeviceContext::new(cfg.identity("unused").unwrap(), cfg.debounce_ms)
}

/// Defaults with the identity pinned, so build-time overrides cannot
/// move the topics.
pub fn config() -> DeviceConfig {
    DeviceConfig {
        controller_id: "water_meter_controller_001".into(),
        meter_name: "Cold water".into(),
        ..DeviceConfig::default()
    }
}
