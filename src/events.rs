//! Interrupt-driven event flags.
//!
//! Flags are raised by:
//! - the pulse GPIO ISR (an edge was accepted)
//! - the heartbeat timer callback (status interval elapsed)
//!
//! and consumed by the scheduler loop, which acts on them between
//! transport service calls.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ GPIO ISR    │────▶│  EventFlags  │────▶│  Scheduler   │
//! │ Timer cb    │────▶│  (AtomicU8)  │     │  (consumer)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! Producers only ever set bits; they never block, allocate, or perform
//! I/O.  Repeated raises before the consumer runs coalesce into one.

use core::sync::atomic::{AtomicU8, Ordering};

/// Work items the scheduler loop can be asked to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Event {
    /// At least one pulse was accepted since the last pulse publish.
    PulseDue = 0b0000_0001,
    /// The heartbeat interval elapsed.
    HeartbeatDue = 0b0000_0010,
}

impl Event {
    pub const fn mask(self) -> u8 {
        self as u8
    }
}

/// Lock-free set of pending [`Event`]s.
#[derive(Debug, Default)]
pub struct EventFlags {
    bits: AtomicU8,
}

impl EventFlags {
    pub const fn new() -> Self {
        Self {
            bits: AtomicU8::new(0),
        }
    }

    /// Mark `event` pending.  Safe from ISR and timer context.
    pub fn raise(&self, event: Event) {
        self.bits.fetch_or(event.mask(), Ordering::Release);
    }

    /// Whether `event` is pending.
    pub fn is_pending(&self, event: Event) -> bool {
        self.bits.load(Ordering::Acquire) & event.mask() != 0
    }

    /// Clear `event`.
    pub fn clear(&self, event: Event) {
        self.bits.fetch_and(!event.mask(), Ordering::AcqRel);
    }

    /// Clear `event`, returning whether it was pending.
    pub fn take(&self, event: Event) -> bool {
        self.bits.fetch_and(!event.mask(), Ordering::AcqRel) & event.mask() != 0
    }
}
