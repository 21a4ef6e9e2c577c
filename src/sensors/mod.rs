//! Sensor subsystem.
//!
//! The water meter exposes a single pulse output; [`flow::PulseCounter`]
//! turns its edges into a debounced tally shared between the GPIO ISR and
//! the scheduler loop.

pub mod flow;

pub use flow::{PulseCounter, PulseTally};
