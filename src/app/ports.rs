//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ConnectivityManager / MessagePublisher / CommandHandler
//! ```
//!
//! The network join, the broker session client, the clock and the chip
//! services are external collaborators.  Driven adapters implement these
//! traits; the domain consumes them via generics, so nothing in `app`
//! touches the radio or the MQTT stack directly.

use core::fmt;
use core::net::Ipv4Addr;

use embedded_hal::delay::DelayNs;

// ───────────────────────────────────────────────────────────────
// Network port (WiFi join)
// ───────────────────────────────────────────────────────────────

/// The underlying network join (WiFi STA on the device).
pub trait NetworkPort {
    /// One join attempt.  Returns once the interface has an address or
    /// the attempt has failed.
    fn join(&mut self) -> Result<(), NetworkError>;

    /// Whether the interface is currently joined.
    fn is_joined(&self) -> bool;

    /// Address assigned to the station interface, if joined.
    fn local_ip(&self) -> Option<Ipv4Addr>;

    /// Signal strength of the current AP in dBm, if joined.
    fn rssi(&self) -> Option<i8>;
}

// ───────────────────────────────────────────────────────────────
// Session port (MQTT client)
// ───────────────────────────────────────────────────────────────

/// Maximum inbound topic length accepted from the transport.
pub const MAX_TOPIC_LEN: usize = 128;

/// Maximum inbound payload length accepted from the transport.
pub const MAX_INBOUND_PAYLOAD: usize = 256;

/// A message delivered by the broker on a subscribed topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: heapless::String<MAX_TOPIC_LEN>,
    pub payload: heapless::Vec<u8, MAX_INBOUND_PAYLOAD>,
}

impl InboundMessage {
    /// Build a message, rejecting topics or payloads that exceed the
    /// fixed buffers.
    pub fn new(topic: &str, payload: &[u8]) -> Option<Self> {
        let mut t = heapless::String::new();
        t.push_str(topic).ok()?;
        let p = heapless::Vec::from_slice(payload).ok()?;
        Some(Self {
            topic: t,
            payload: p,
        })
    }
}

/// The broker session client.
pub trait SessionPort {
    /// One session connect attempt using `client_id`.
    fn connect(&mut self, client_id: &str) -> Result<(), SessionError>;

    /// Whether the session is currently up.  Never blocks.
    fn is_connected(&self) -> bool;

    /// Subscribe to `topic` on the current session.
    fn subscribe(&mut self, topic: &str) -> Result<(), SessionError>;

    /// Publish `payload` on `topic` (fire-and-forget).
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), SessionError>;

    /// Service the transport and return the next pending inbound
    /// message, if any.
    fn poll(&mut self) -> Option<InboundMessage>;
}

// ───────────────────────────────────────────────────────────────
// System + clock ports
// ───────────────────────────────────────────────────────────────

/// Chip-level services.
pub trait SystemPort {
    /// Free heap in bytes.
    fn free_heap(&self) -> u32;

    /// Restart the device.  Does not return on real hardware; simulated
    /// boards record the request and return.
    fn restart(&mut self);
}

/// Monotonic milliseconds since boot.
pub trait ClockPort {
    fn uptime_ms(&self) -> u64;
}

/// Everything the scheduler loop needs from the board, bundled so a
/// single adapter can be handed to every component.
pub trait Platform: NetworkPort + SessionPort + SystemPort + ClockPort + DelayNs {}

impl<T> Platform for T where T: NetworkPort + SessionPort + SystemPort + ClockPort + DelayNs {}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`NetworkPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    AuthFailed,
    ConnectionFailed,
}

/// Errors from [`SessionPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    /// Broker unreachable or refused; carries the transport's reason code.
    ConnectFailed(i32),
    /// Operation requires a live session.
    NotConnected,
    /// The transport refused to accept the outbound message.
    PublishRejected,
    /// The subscribe request was refused.
    SubscribeFailed,
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)")
            }
            Self::AuthFailed => write!(f, "WiFi authentication failed"),
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectFailed(rc) => write!(f, "connect failed (rc={rc})"),
            Self::NotConnected => write!(f, "not connected"),
            Self::PublishRejected => write!(f, "publish rejected by transport"),
            Self::SubscribeFailed => write!(f, "subscribe failed"),
        }
    }
}
