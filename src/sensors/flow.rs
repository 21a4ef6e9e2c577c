//! Debounced pulse counter for reed/hall-effect water meters.
//!
//! The meter closes a contact once per fixed volume of water.  The GPIO
//! ISR calls [`PulseCounter::on_edge`] on every falling edge; edges closer
//! than the debounce interval to the last *accepted* edge are contact
//! bounce and are ignored.
//!
//! The tally (`pending` + `total`) and the debounce timestamp are updated
//! together, so they live in one `critical_section::Mutex<Cell<_>>`.  The
//! scheduler's `drain`/`reset` briefly mask the ISR while they read and
//! write the pair, which guarantees neither side ever sees a half-applied
//! update.  Nothing inside the critical section blocks, allocates, or logs.

use core::cell::Cell;

use critical_section::Mutex;

/// Point-in-time view of the counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PulseTally {
    /// Accepted pulses not yet published.
    pub pending: u32,
    /// Accepted pulses since boot or the last reset.
    pub total: u32,
}

#[derive(Debug, Clone, Copy, Default)]
struct CounterState {
    tally: PulseTally,
    /// `None` until the first edge is accepted.
    last_accepted_ms: Option<u64>,
}

/// ISR-safe debounced edge counter.
pub struct PulseCounter {
    debounce_ms: u64,
    state: Mutex<Cell<CounterState>>,
}

impl PulseCounter {
    pub const fn new(debounce_ms: u32) -> Self {
        Self {
            debounce_ms: debounce_ms as u64,
            state: Mutex::new(Cell::new(CounterState {
                tally: PulseTally {
                    pending: 0,
                    total: 0,
                },
                last_accepted_ms: None,
            })),
        }
    }

    /// Called from the GPIO ISR.  Returns `true` if the edge was counted.
    ///
    /// An edge is accepted only if strictly more than `debounce_ms` has
    /// passed since the previous accepted edge.  A timestamp at or before
    /// the previous one (clock wrap) is rejected.
    pub fn on_edge(&self, now_ms: u64) -> bool {
        critical_section::with(|cs| {
            let cell = self.state.borrow(cs);
            let mut s = cell.get();

            if let Some(last) = s.last_accepted_ms {
                match now_ms.checked_sub(last) {
                    Some(elapsed) if elapsed > self.debounce_ms => {}
                    _ => return false,
                }
            }

            s.tally.pending = s.tally.pending.saturating_add(1);
            s.tally.total = s.tally.total.saturating_add(1);
            s.last_accepted_ms = Some(now_ms);
            cell.set(s);
            true
        })
    }

    /// Read and zero `pending` in one step.  Scheduler context only.
    pub fn drain(&self) -> u32 {
        critical_section::with(|cs| {
            let cell = self.state.borrow(cs);
            let mut s = cell.get();
            let pending = s.tally.pending;
            s.tally.pending = 0;
            cell.set(s);
            pending
        })
    }

    /// Zero both `pending` and `total`.  The debounce window is kept, so
    /// a bounce straddling the reset is still filtered.
    pub fn reset(&self) {
        critical_section::with(|cs| {
            let cell = self.state.borrow(cs);
            let mut s = cell.get();
            s.tally = PulseTally::default();
            cell.set(s);
        });
    }

    /// Put `count` drained-but-unpublished pulses back into `pending`.
    /// `total` already includes them and is left alone.
    pub fn requeue(&self, count: u32) {
        if count == 0 {
            return;
        }
        critical_section::with(|cs| {
            let cell = self.state.borrow(cs);
            let mut s = cell.get();
            s.tally.pending = s.tally.pending.saturating_add(count);
            cell.set(s);
        });
    }

    /// Consistent snapshot of both counters.
    pub fn tally(&self) -> PulseTally {
        critical_section::with(|cs| self.state.borrow(cs).get().tally)
    }

    /// Lifetime total (since boot or last reset).
    pub fn total(&self) -> u32 {
        self.tally().total
    }
}
