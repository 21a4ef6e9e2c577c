//! Inbound commands from the collector.
//!
//! Payloads arrive on the device's command topic as
//! `{"command": "reset" | "status" | "test"}`.  Anything that does not
//! decode comes back as [`crate::error::Error::Command`] for the caller to log; nothing
//! is ever sent back to the originator.

use core::fmt;

use log::info;

use super::messages::CommandPayload;
use super::ports::{ClockPort, NetworkPort, SessionPort, SystemPort};
use super::publisher::MessagePublisher;
use crate::context::DeviceContext;
use crate::error::Result;

/// Commands the controller understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Zero the pulse counters, then report status.
    Reset,
    /// Report status.
    Status,
    /// Liveness probe for the decode/dispatch path; no effect.
    Test,
    /// Well-formed payload naming a command this firmware does not know.
    Unknown,
}

/// Why an inbound payload was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// Not JSON, or `command` is not a string.
    Malformed,
    /// JSON object without a `command` field.
    MissingCommand,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "payload is not a command object"),
            Self::MissingCommand => write!(f, "payload has no command field"),
        }
    }
}

impl Command {
    /// Decode a raw payload.
    pub fn parse(raw: &[u8]) -> core::result::Result<Self, CommandError> {
        let payload: CommandPayload =
            serde_json::from_slice(raw).map_err(|_| CommandError::Malformed)?;
        let name = payload.command.ok_or(CommandError::MissingCommand)?;
        Ok(match name.as_str() {
            "reset" => Self::Reset,
            "status" => Self::Status,
            "test" => Self::Test,
            other => {
                info!("Command: unknown command {:?}", other);
                Self::Unknown
            }
        })
    }
}

/// Decodes command payloads and applies them.
pub struct CommandHandler;

impl CommandHandler {
    pub fn new() -> Self {
        Self
    }

    /// Handle one raw payload and return the command that was applied.
    pub fn handle(
        &mut self,
        raw: &[u8],
        io: &mut (impl SessionPort + NetworkPort + SystemPort + ClockPort),
        ctx: &DeviceContext,
        publisher: &MessagePublisher,
    ) -> Result<Command> {
        let cmd = Command::parse(raw)?;

        match cmd {
            Command::Reset => {
                ctx.pulses.reset();
                info!("Command: counter reset");
                // Publish failure is already logged by the publisher.
                let _ = publisher.publish_status(io, ctx);
            }
            Command::Status => {
                let _ = publisher.publish_status(io, ctx);
            }
            Command::Test => {
                info!("Command: test received");
            }
            Command::Unknown => {}
        }
        Ok(cmd)
    }
}

impl Default for CommandHandler {
    fn default() -> Self {
        Self::new()
    }
}
