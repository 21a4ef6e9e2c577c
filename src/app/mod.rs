//! Application core — pure domain logic, no direct I/O.
//!
//! This module contains the business rules for the FlowMeter controller:
//! the connection lifecycle, the wire messages, and command dispatch.
//! All interaction with the radio, the broker and the chip happens through
//! **port traits** defined in [`ports`], keeping this layer fully testable
//! without real peripherals.

pub mod commands;
pub mod connectivity;
pub mod messages;
pub mod ports;
pub mod publisher;
pub mod topics;
