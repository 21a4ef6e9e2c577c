//! Network and broker-session lifecycle.
//!
//! ```text
//!                  ensure_connected()
//!  ┌──────────────┐ ───────────────▶ ┌────────────┐  session up  ┌───────────┐
//!  │ Disconnected │                  │ Connecting │ ───────────▶ │ Connected │
//!  └──────────────┘ ◀─────────────── └────────────┘              └───────────┘
//!         ▲          join exhausted:                                   │
//!         │          device restart                                    │
//!         └─────────────────────── link lost (observe_link) ◀──────────┘
//! ```
//!
//! ## Retry policy
//!
//! - **Join**: bounded attempts with a fixed pause.  Exhaustion restarts
//!   the device, the only reliable way to clear a wedged WiFi stack.
//! - **Session**: unbounded attempts with a fixed pause (default 5 s)
//!   while the network stays joined.  If the network drops between
//!   attempts the manager falls back to the join phase and its budget.
//!
//! `ensure_connected` blocks the calling loop for its whole duration.
//! Pulses keep accumulating in the ISR-owned counter meanwhile.

use embedded_hal::delay::DelayNs;
use log::{error, info, warn};

use super::ports::{NetworkPort, Platform, SessionPort, SystemPort};
use super::publisher::MessagePublisher;
use crate::context::DeviceContext;
use crate::error::{Error, Result};
use crate::events::Event;

// ───────────────────────────────────────────────────────────────
// Connection state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

// ───────────────────────────────────────────────────────────────
// Retry policy
// ───────────────────────────────────────────────────────────────

/// Attempt budget and pause for the network join.  Running out of
/// attempts restarts the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Pause after each failed attempt (milliseconds).
    pub delay_ms: u32,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, delay_ms: u32) -> Self {
        Self {
            max_attempts,
            delay_ms,
        }
    }

    /// Whether attempt number `attempt` (1-based) is within budget.
    pub fn allows(&self, attempt: u32) -> bool {
        attempt <= self.max_attempts
    }
}

/// How a run of session attempts ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionOutcome {
    Up,
    NetworkLost,
}

// ───────────────────────────────────────────────────────────────
// Connectivity manager
// ───────────────────────────────────────────────────────────────

/// Sole owner of [`ConnectionState`].
pub struct ConnectivityManager {
    state: ConnectionState,
    join_policy: RetryPolicy,
    session_retry_ms: u32,
    command_topic: String,
    /// Completed Disconnected → Connected transitions since boot.
    sessions: u32,
}

impl ConnectivityManager {
    pub fn new(join_policy: RetryPolicy, session_retry_ms: u32, command_topic: String) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            join_policy,
            session_retry_ms,
            command_topic,
            sessions: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Pure state read; never touches the transport.
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Number of sessions established since boot.
    pub fn sessions(&self) -> u32 {
        self.sessions
    }

    /// Fold the transport's view of the link into the state machine.
    /// Call once per loop pass before deciding whether to reconnect.
    pub fn observe_link(&mut self, io: &(impl SessionPort + NetworkPort)) {
        if self.state == ConnectionState::Connected && !(io.is_connected() && io.is_joined()) {
            warn!("Link: session lost");
            self.state = ConnectionState::Disconnected;
        }
    }

    /// Block until the session is up.
    ///
    /// On success the command channel is (re)subscribed and one status
    /// heartbeat is published before anything else.  A heartbeat tick
    /// that arrived during the outage is absorbed by it.  Returns
    /// `Err(Error::Join)` only when the join budget is spent; on real
    /// hardware the restart issued just before means it never returns.
    pub fn ensure_connected(
        &mut self,
        io: &mut impl Platform,
        ctx: &DeviceContext,
        publisher: &MessagePublisher,
    ) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }
        self.state = ConnectionState::Connecting;

        loop {
            if !io.is_joined() {
                if let Err(e) = self.join_network(io) {
                    self.state = ConnectionState::Disconnected;
                    return Err(e);
                }
            }
            match self.connect_session(io, ctx) {
                SessionOutcome::Up => break,
                SessionOutcome::NetworkLost => warn!("Link: network lost, rejoining"),
            }
        }

        self.state = ConnectionState::Connected;
        self.sessions += 1;

        match io.subscribe(&self.command_topic) {
            Ok(()) => info!("Link: subscribed to {}", self.command_topic),
            Err(e) => warn!("Link: subscribe to {} failed: {}", self.command_topic, e),
        }

        ctx.events.clear(Event::HeartbeatDue);
        if let Err(e) = publisher.publish_status(io, ctx) {
            warn!("Link: post-connect status not sent: {}", e);
        }
        Ok(())
    }

    fn join_network(&self, io: &mut (impl NetworkPort + SystemPort + DelayNs)) -> Result<()> {
        let policy = self.join_policy;
        let mut attempt = 1;
        loop {
            info!("WiFi: join attempt {}", attempt);
            let err = match io.join() {
                Ok(()) => {
                    info!("WiFi: joined (ip={:?})", io.local_ip());
                    return Ok(());
                }
                Err(e) => e,
            };
            warn!("WiFi: join attempt {} failed: {}", attempt, err);

            attempt += 1;
            if !policy.allows(attempt) {
                error!("WiFi: join failed after {} attempts, restarting", attempt - 1);
                io.restart();
                return Err(Error::Join(err));
            }
            io.delay_ms(policy.delay_ms);
        }
    }

    fn connect_session(
        &self,
        io: &mut (impl SessionPort + NetworkPort + DelayNs),
        ctx: &DeviceContext,
    ) -> SessionOutcome {
        let client_id = ctx.identity.controller_id.as_str();
        let mut attempt: u32 = 1;
        loop {
            info!("MQTT: connecting as {} (attempt {})", client_id, attempt);
            let err = match io.connect(client_id) {
                Ok(()) => {
                    info!("MQTT: connected");
                    return SessionOutcome::Up;
                }
                Err(e) => e,
            };
            if !io.is_joined() {
                warn!("MQTT: {}, network is down", err);
                return SessionOutcome::NetworkLost;
            }
            warn!("MQTT: {}, try again in {} ms", err, self.session_retry_ms);

            attempt = attempt.wrapping_add(1);
            io.delay_ms(self.session_retry_ms);
        }
    }
}
