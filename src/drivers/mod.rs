//! Hardware bring-up: pulse input ISR wiring and the heartbeat timer.

pub mod hw_init;
pub mod hw_timer;
