//! Unified error types for the FlowMeter firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! scheduler loop's error handling uniform.  All variants are `Copy` so
//! they can be passed around and logged without allocation.

use core::fmt;

use crate::app::commands::CommandError;
use crate::app::ports::{NetworkError, SessionError};

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Configuration is invalid or could not be decoded.
    Config(&'static str),
    /// Network join failed after every allowed attempt.  Fatal: the
    /// device restarts.
    Join(NetworkError),
    /// Broker session could not be established.  Recoverable.
    Session(SessionError),
    /// The transport refused a single outbound message.  Recoverable;
    /// the message is gone.
    Publish(SessionError),
    /// An inbound command payload was malformed.  Recoverable; never
    /// reported back to the sender.
    Command(CommandError),
    /// An outbound payload could not be encoded.
    Codec(&'static str),
    /// Peripheral or timer bring-up failed.
    Init(&'static str),
}

impl Error {
    /// `true` for the categories the scheduler logs and carries on from.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Join(_) | Self::Init(_) | Self::Config(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Join(e) => write!(f, "network join: {e}"),
            Self::Session(e) => write!(f, "session: {e}"),
            Self::Publish(e) => write!(f, "publish: {e}"),
            Self::Command(e) => write!(f, "command: {e}"),
            Self::Codec(msg) => write!(f, "codec: {msg}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

impl From<NetworkError> for Error {
    fn from(e: NetworkError) -> Self {
        Self::Join(e)
    }
}

impl From<SessionError> for Error {
    fn from(e: SessionError) -> Self {
        Self::Session(e)
    }
}

impl From<CommandError> for Error {
    fn from(e: CommandError) -> Self {
        Self::Command(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
