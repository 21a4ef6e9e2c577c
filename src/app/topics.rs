//! MQTT topic layout.
//!
//! ```text
//! {root}/pulse/{controller_id}     device → collector   pulse events
//! {root}/status                    device → collector   heartbeats (shared)
//! {root}/command/{controller_id}   collector → device   commands
//! ```
//!
//! Topics are formatted from a validated [`ControllerId`], so a stray `/`,
//! `+` or `#` in provisioning data can never widen a subscription or land
//! a message on another device's channel.

use core::fmt;

/// Longest controller id accepted.
pub const MAX_CONTROLLER_ID_LEN: usize = 64;

/// Why a controller id or topic root was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicError {
    Empty,
    TooLong,
    InvalidChar(char),
}

impl fmt::Display for TopicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "identifier is empty"),
            Self::TooLong => write!(f, "identifier longer than {MAX_CONTROLLER_ID_LEN} bytes"),
            Self::InvalidChar(c) => write!(f, "identifier contains {c:?}"),
        }
    }
}

fn validate_segment(s: &str) -> Result<(), TopicError> {
    if s.is_empty() {
        return Err(TopicError::Empty);
    }
    if s.len() > MAX_CONTROLLER_ID_LEN {
        return Err(TopicError::TooLong);
    }
    match s
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
    {
        Some(c) => Err(TopicError::InvalidChar(c)),
        None => Ok(()),
    }
}

/// Stable unique identifier of one physical controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerId(heapless::String<MAX_CONTROLLER_ID_LEN>);

impl ControllerId {
    pub fn new(id: &str) -> Result<Self, TopicError> {
        validate_segment(id)?;
        let mut s = heapless::String::new();
        s.push_str(id).map_err(|()| TopicError::TooLong)?;
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully formatted topics for one controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub pulse: String,
    pub status: String,
    pub command: String,
}

impl Topics {
    pub fn new(root: &str, id: &ControllerId) -> Result<Self, TopicError> {
        validate_segment(root)?;
        Ok(Self {
            pulse: format!("{root}/pulse/{id}"),
            status: format!("{root}/status"),
            command: format!("{root}/command/{id}"),
        })
    }
}
