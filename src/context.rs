//! Device context shared between the scheduler, the GPIO ISR and the
//! heartbeat timer.
//!
//! Built once at boot and then only ever borrowed immutably: identity is
//! fixed, and the two mutable pieces ([`PulseCounter`] and
//! [`EventFlags`]) carry their own interrupt-safe interior mutability.
//! On the device the context is leaked to `'static` so its address can be
//! handed to the ISR and timer callbacks as their argument pointer.

use crate::app::topics::ControllerId;
use crate::events::{Event, EventFlags};
use crate::sensors::flow::PulseCounter;

/// Who this controller is.  Immutable after boot.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceIdentity {
    pub controller_id: ControllerId,
    /// Display label of the meter, e.g. "Cold water".
    pub meter_name: String,
    pub firmware_version: String,
    /// Litres represented by one accepted pulse.
    pub liters_per_pulse: f64,
}

/// Everything the interrupt, timer and scheduler contexts share.
pub struct DeviceContext {
    pub identity: DeviceIdentity,
    pub pulses: PulseCounter,
    pub events: EventFlags,
}

impl DeviceContext {
    pub fn new(identity: DeviceIdentity, debounce_ms: u32) -> Self {
        Self {
            identity,
            pulses: PulseCounter::new(debounce_ms),
            events: EventFlags::new(),
        }
    }

    /// Edge handler body for the pulse ISR.
    pub fn on_edge(&self, now_ms: u64) {
        if self.pulses.on_edge(now_ms) {
            self.events.raise(Event::PulseDue);
        }
    }

    /// Timer handler body for the heartbeat interval.
    pub fn on_heartbeat_tick(&self) {
        self.events.raise(Event::HeartbeatDue);
    }
}
