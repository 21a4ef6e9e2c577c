//! FlowMeter firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod scheduler;
pub mod sensors;

// Adapters and drivers carry simulation stubs on the host so the crate
// builds and tests everywhere; the real implementations are cfg-guarded.
pub mod adapters;
pub mod drivers;
